//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! including identifier validation and mirror path construction.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid mirror path format or content
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Invalid content hash format (expected 32 hex digits)
    #[error("Invalid hash format: {0}")]
    InvalidHash(String),

    /// Invalid remote ID format
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// Invalid listing continuation token
    #[error("Invalid page token: {0}")]
    InvalidPageToken(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
