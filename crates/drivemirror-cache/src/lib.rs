//! drivemirror Cache - The listing cache stream
//!
//! The sync phase records every remote file it discovers as one JSON object
//! per line. The download phase replays that file without touching the
//! remote listing API again.
//!
//! ## Format
//!
//! UTF-8, one camelCase JSON object per line (a serialized
//! [`RemoteFile`](drivemirror_core::domain::RemoteFile)), every line newline
//! terminated. Readers skip blank lines. The number of newlines, counted
//! without parsing, is the authoritative record total.
//!
//! ## Key Components
//!
//! - [`CacheWriter`] - Appends records and publishes the file atomically
//! - [`CacheReader`] - Sequential line reader
//! - [`SharedCursor`] - A reader shared by concurrent download workers
//! - [`count_lines`] - Record total without decoding
//! - [`CacheError`] - Error types for cache operations
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use drivemirror_cache::{count_lines, SharedCursor};
//!
//! # async fn example() -> Result<(), drivemirror_cache::CacheError> {
//! let path = Path::new("/home/user/.cache/drivemirror/drive.cache.jsonl");
//! let total = count_lines(path).await?;
//! let cursor = SharedCursor::open(path).await?;
//! while let Some(line) = cursor.next_line().await? {
//!     let file = line.decode()?;
//!     println!("{}/{total}: {}", line.number, file.path());
//! }
//! # Ok(())
//! # }
//! ```

pub mod reader;
pub mod writer;

use std::path::PathBuf;

pub use reader::{count_lines, CacheLine, CacheReader, SharedCursor};
pub use writer::CacheWriter;

/// Errors that can occur during cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Reading or writing the cache file failed
    #[error("Cache I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record could not be serialized
    #[error("Failed to encode cache record: {0}")]
    Encode(#[source] serde_json::Error),

    /// A cache line is not a valid record
    #[error("Invalid cache record on line {line}: {source}")]
    Decode {
        line: u64,
        #[source]
        source: serde_json::Error,
    },
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
