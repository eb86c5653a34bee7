//! Cache stream readers

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use drivemirror_core::domain::RemoteFile;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::sync::Mutex;
use tracing::debug;

use crate::CacheError;

/// One non-blank line of the cache
///
/// Kept as raw bytes: a line that is not valid UTF-8 is still handed out,
/// and fails in [`decode`](Self::decode) like any other malformed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLine {
    /// 1-based line number in the file
    pub number: u64,
    /// The line without its terminator, trimmed
    pub bytes: Vec<u8>,
}

impl CacheLine {
    /// The line as text, with invalid sequences replaced
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// Parses the line as a remote file record
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Decode` carrying the line number, also for a
    /// line that is not valid UTF-8.
    pub fn decode(&self) -> Result<RemoteFile, CacheError> {
        serde_json::from_slice(&self.bytes).map_err(|source| CacheError::Decode {
            line: self.number,
            source,
        })
    }
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}

/// Sequential reader over a cache file
pub struct CacheReader {
    path: PathBuf,
    input: BufReader<File>,
    buf: Vec<u8>,
    line_number: u64,
}

impl CacheReader {
    /// Opens the cache at `path`
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Io` if the file cannot be opened.
    pub async fn open(path: &Path) -> Result<Self, CacheError> {
        let file = File::open(path).await.map_err(|e| CacheError::io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            input: BufReader::new(file),
            buf: Vec::new(),
            line_number: 0,
        })
    }

    /// Returns the next non-blank line, or `None` at end of file
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Io` on read failure.
    pub async fn next_line(&mut self) -> Result<Option<CacheLine>, CacheError> {
        loop {
            self.buf.clear();
            let n = self
                .input
                .read_until(b'\n', &mut self.buf)
                .await
                .map_err(|e| CacheError::io(&self.path, e))?;
            if n == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let line = trim_ascii(&self.buf);
            if line.is_empty() {
                continue;
            }
            return Ok(Some(CacheLine {
                number: self.line_number,
                bytes: line.to_vec(),
            }));
        }
    }
}

/// A cache reader shared by concurrent consumers
///
/// Each call to [`next_line`](Self::next_line) hands out a distinct line;
/// no line is ever seen by two consumers.
#[derive(Clone)]
pub struct SharedCursor {
    inner: Arc<Mutex<CacheReader>>,
}

impl SharedCursor {
    /// Opens the cache at `path` for shared reading
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Io` if the file cannot be opened.
    pub async fn open(path: &Path) -> Result<Self, CacheError> {
        Ok(Self::new(CacheReader::open(path).await?))
    }

    /// Shares an already opened reader
    pub fn new(reader: CacheReader) -> Self {
        Self {
            inner: Arc::new(Mutex::new(reader)),
        }
    }

    /// Takes the next unread non-blank line
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Io` on read failure.
    pub async fn next_line(&self) -> Result<Option<CacheLine>, CacheError> {
        self.inner.lock().await.next_line().await
    }
}

/// Counts newline bytes in the file at `path`
///
/// Nothing is decoded, so the count is available before the first record
/// is processed. Blank lines are counted too.
///
/// # Errors
///
/// Returns `CacheError::Io` if the file cannot be read.
pub async fn count_lines(path: &Path) -> Result<u64, CacheError> {
    let mut file = File::open(path).await.map_err(|e| CacheError::io(path, e))?;
    let mut buf = vec![0u8; 64 * 1024];
    let mut count = 0u64;
    loop {
        let n = file
            .read(&mut buf)
            .await
            .map_err(|e| CacheError::io(path, e))?;
        if n == 0 {
            break;
        }
        count += buf[..n].iter().filter(|&&b| b == b'\n').count() as u64;
    }
    debug!(path = %path.display(), lines = count, "Counted cache lines");
    Ok(count)
}
