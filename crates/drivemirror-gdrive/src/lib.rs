//! drivemirror GDrive - Google Drive v3 API adapter
//!
//! Provides an async client for:
//! - Folder listings, batched and paginated
//! - Raw content downloads and native document exports, streamed
//! - Bearer token injection from an [`ITokenProvider`](drivemirror_core::ports::ITokenProvider)
//!
//! ## Modules
//!
//! - [`client`] - Authenticated HTTP client and error mapping
//! - [`listing`] - `files.list` queries and response parsing
//! - [`provider`] - [`IDriveService`](drivemirror_core::ports::IDriveService) implementation
//! - [`token`] - Static and environment-backed token providers

pub mod client;
pub mod listing;
pub mod provider;
pub mod token;

pub use client::DriveClient;
pub use provider::GoogleDriveService;
pub use token::{EnvTokenProvider, StaticTokenProvider};

use thiserror::Error;

/// Errors that can occur when communicating with the Google Drive API
#[derive(Debug, Error)]
pub enum GDriveError {
    /// Authentication credentials are invalid or expired (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Insufficient permissions, or a per-user quota was hit (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested file or folder does not exist (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded (429)
    #[error("Too many requests: {0}")]
    TooManyRequests(String),

    /// A server-side error occurred (5xx)
    #[error("Server error {status}: {message}")]
    ServerError {
        /// HTTP status code
        status: u16,
        /// Message from the error body
        message: String,
    },

    /// Any other non-success status
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Message from the error body
        message: String,
    },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// No access token could be obtained from the token provider
    #[error("Access token unavailable: {0}")]
    Token(String),
}

impl GDriveError {
    /// Classifies a non-success HTTP status
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => Self::Unauthorized(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            429 => Self::TooManyRequests(message),
            500..=599 => Self::ServerError { status, message },
            _ => Self::Status { status, message },
        }
    }

    /// The HTTP status behind this error, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized(_) => Some(401),
            Self::Forbidden(_) => Some(403),
            Self::NotFound(_) => Some(404),
            Self::TooManyRequests(_) => Some(429),
            Self::ServerError { status, .. } | Self::Status { status, .. } => Some(*status),
            Self::Network(_) | Self::InvalidResponse(_) | Self::Token(_) => None,
        }
    }

    /// Server-supplied message, or the error text for local failures
    pub fn message(&self) -> String {
        match self {
            Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::NotFound(m)
            | Self::TooManyRequests(m)
            | Self::InvalidResponse(m)
            | Self::Token(m) => m.clone(),
            Self::ServerError { message, .. } | Self::Status { message, .. } => message.clone(),
            Self::Network(e) => e.to_string(),
        }
    }

    /// Returns true for statuses that usually clear up on their own
    ///
    /// 401 and 403 are included: Drive answers 403 for per-user rate limits
    /// and 401 while a rotated token propagates.
    pub fn is_retryable(&self) -> bool {
        is_retryable_status(self.status().unwrap_or(0))
    }
}

/// Returns true for the statuses a listing is retried on
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 401 | 403 | 429 | 500 | 503)
}
