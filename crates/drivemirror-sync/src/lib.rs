//! drivemirror Sync - Mirror pipeline
//!
//! Provides:
//! - A pull-based walker over the remote folder hierarchy
//! - Staleness decisions for every backup variant of a remote file
//! - A bounded pool of download workers draining the listing cache
//! - Reconciliation of the local tree against the paths that should exist
//!
//! ## Modules
//!
//! - [`walker`] - Batched, paginated, retrying remote tree traversal
//! - [`decision`] - Variant derivation and staleness checks
//! - [`scheduler`] - Concurrent download workers over a shared cache cursor
//! - [`materialize`] - Writes one variant to disk
//! - [`cleaner`] - Orphan detection and deletion
//! - [`engine`] - Orchestrates the sync, download and cleanup phases
//! - [`events`] - Progress events streamed to the caller
//! - [`filesystem`] - Hashing and atomic streamed writes
//! - [`redirect`] - Redirect marker pages
//! - [`repository`] - `git` command line adapter

pub mod cleaner;
pub mod decision;
pub mod engine;
pub mod events;
pub mod filesystem;
pub mod materialize;
pub mod redirect;
pub mod repository;
pub mod scheduler;
pub mod walker;

use std::path::PathBuf;

use thiserror::Error;

pub use cleaner::{Cleaner, CleanupReport};
pub use engine::{MirrorEngine, MirrorOptions, MirrorReport};
pub use events::{EventSender, MirrorEvent};
pub use materialize::Materializer;
pub use repository::GitCli;
pub use scheduler::{DownloadReport, DownloadScheduler, UsedPathSet};
pub use walker::{NameRegistry, RemoteWalker, WalkerOptions};

/// Errors that abort a remote tree walk
#[derive(Debug, Error)]
pub enum WalkError {
    /// The remote answered a listing with a non-retryable status
    #[error("Listing failed with status {status}: {message}")]
    Remote { status: u16, message: String },

    /// A listing kept failing with retryable statuses
    #[error("Listing of {path:?} still failing after {retries} retries")]
    RetriesExhausted { path: String, retries: u32 },

    /// The batch call itself failed
    #[error("Listing batch failed: {0:#}")]
    Transport(#[source] anyhow::Error),
}

/// Errors that can occur while mirroring
#[derive(Debug, Error)]
pub enum SyncError {
    /// A local file operation failed
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A remote content request failed
    #[error("Remote request failed: {0:#}")]
    Remote(#[source] anyhow::Error),

    /// The listing cache could not be read or written
    #[error(transparent)]
    Cache(#[from] drivemirror_cache::CacheError),

    /// The remote tree walk was aborted
    #[error(transparent)]
    Walk(#[from] WalkError),

    /// A repository working copy is not in the expected state
    #[error("Repository {path}: {message}")]
    RepositoryInvariant { path: PathBuf, message: String },

    /// A version-control command failed
    #[error("Repository command failed: {0:#}")]
    Repository(#[source] anyhow::Error),

    /// A `.git.json` pointer does not name a repository URL
    #[error("Invalid repository pointer {path}: {message}")]
    InvalidPointer { path: PathBuf, message: String },

    /// A download worker panicked or was cancelled
    #[error("Download worker failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl SyncError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
