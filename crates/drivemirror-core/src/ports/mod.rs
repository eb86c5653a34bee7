//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IDriveService`] - Remote listing and content download (Google Drive)
//! - [`IRepositoryManager`] - Working copies for `.git.json` pointers
//! - [`ITokenProvider`] - OAuth bearer tokens for the drive adapter

pub mod drive_service;
pub mod repository;
pub mod token_provider;

pub use drive_service::{ContentStream, IDriveService, ListOutcome, ListPage, ListRequest};
pub use repository::{IRepositoryManager, RepoRemote};
pub use token_provider::ITokenProvider;
