//! Progress events
//!
//! Every phase of a mirror run reports what it is doing as a stream of
//! [`MirrorEvent`] values sent over an unbounded tokio channel. The CLI
//! renders them; tests collect them.

use serde::Serialize;
use tokio::sync::mpsc;

/// Sending half of the event stream
pub type EventSender = mpsc::UnboundedSender<MirrorEvent>;

/// Something that happened during a mirror run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MirrorEvent {
    // ------------------------------------------------------------------
    // Sync phase
    // ------------------------------------------------------------------
    /// The remote walk began
    SyncStarted,
    /// A remote file was discovered and cached
    FileFound { path: String, total: u64 },
    /// The remote walk completed
    SyncFinished { total: u64 },

    // ------------------------------------------------------------------
    // Download phase
    // ------------------------------------------------------------------
    /// Download workers started on a cache of `total` lines
    DownloadStarted { total: u64 },
    /// A worker picked up a record
    RecordStarted {
        path: String,
        processed: u64,
        total: u64,
    },
    /// The record's local variants are all up to date
    Skipped { path: String },
    /// Fraction (0 to 1) of one variant written
    Progress { path: String, fraction: f64 },
    /// One variant was written
    VariantSaved { record: String, path: String },
    /// One variant failed; the record's other variants still run
    VariantFailed {
        record: String,
        path: String,
        message: String,
    },
    /// A cache line could not be decoded
    RecordFailed { line: u64, message: String },
    /// A repository is stored in the drive file by file
    UnwantedRepository { path: String },
    /// Every worker exhausted the cache
    DownloadFinished { processed: u64, total: u64 },

    // ------------------------------------------------------------------
    // Cleanup phase
    // ------------------------------------------------------------------
    /// The local tree scan began
    CleanupScanStarted,
    /// A local path has no counterpart in the used-path set
    OrphanFound { path: String, count: u64 },
    /// The local tree scan completed
    CleanupScanFinished { orphans: u64 },
    /// Orphan deletion began
    DeleteStarted { total: u64 },
    /// An orphan (or an emptied ancestor) was removed
    Deleted {
        path: String,
        processed: u64,
        total: u64,
    },
    /// An orphan could not be removed
    DeleteFailed { path: String, message: String },
    /// Orphan deletion completed
    CleanupFinished { deleted: u64, total: u64 },
}

/// Sends an event, ignoring a receiver that has gone away
pub(crate) fn emit(events: &EventSender, event: MirrorEvent) {
    let _ = events.send(event);
}
