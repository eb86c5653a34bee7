//! Local filesystem helpers
//!
//! ## Design Decisions
//!
//! - **Atomic writes**: content is streamed into a scratch file next to the
//!   target and renamed into place, so a reader never sees a half-written
//!   artifact and a failed transfer leaves the previous version untouched.
//! - **Scratch names**: the scratch file is created exclusively under a
//!   random hidden name (`.drivemirror-XXXXXX.part`). It never replaces a
//!   mirrored sibling, whatever that sibling is called.
//! - **md5**: local files are hashed with the same digest Drive reports in
//!   `md5Checksum`, read in fixed-size chunks so large files are never held
//!   in memory.

use std::path::Path;

use drivemirror_core::domain::Md5Hash;
use drivemirror_core::ports::ContentStream;
use futures_util::StreamExt;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, instrument};

use crate::SyncError;

const READ_CHUNK: usize = 64 * 1024;

/// Prefix of in-flight scratch files
pub const SCRATCH_PREFIX: &str = ".drivemirror-";

/// Suffix of in-flight scratch files
pub const SCRATCH_SUFFIX: &str = ".part";

/// Computes the md5 digest of the file at `path`
///
/// # Errors
///
/// Returns the I/O error if the file cannot be opened or read.
#[instrument(skip_all, fields(path = %path.display()))]
pub async fn file_md5(path: &Path) -> std::io::Result<Md5Hash> {
    let mut file = File::open(path).await?;
    let mut context = md5::Context::new();
    let mut buf = vec![0u8; READ_CHUNK];
    let mut total = 0u64;
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        context.consume(&buf[..n]);
        total += n as u64;
    }
    debug!(bytes = total, "hashed file");
    Ok(Md5Hash::from_digest(context.compute().0))
}

/// Returns true if something exists at `path`
pub async fn exists(path: &Path) -> bool {
    fs::symlink_metadata(path).await.is_ok()
}

/// Streams `content` into `target` atomically
///
/// `on_chunk` is called with the running byte count after every chunk.
/// On any failure the scratch file is removed and `target` is left as it
/// was. Returns the number of bytes written.
///
/// # Errors
///
/// - `SyncError::Remote` if the content stream yields an error
/// - `SyncError::Io` if the directory, scratch file, write or rename fails
#[instrument(skip_all, fields(path = %target.display()))]
pub async fn write_stream<F>(
    target: &Path,
    content: ContentStream,
    mut on_chunk: F,
) -> Result<u64, SyncError>
where
    F: FnMut(u64) + Send,
{
    let parent = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .await
        .map_err(|e| SyncError::io(parent, e))?;

    // removed on drop unless persisted
    let (file, scratch) = tempfile::Builder::new()
        .prefix(SCRATCH_PREFIX)
        .suffix(SCRATCH_SUFFIX)
        .tempfile_in(parent)
        .map_err(|e| SyncError::io(parent, e))?
        .into_parts();
    let mut file = File::from_std(file);

    let mut chunks = content.chunks;
    let mut written = 0u64;
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.map_err(SyncError::Remote)?;
        file.write_all(&chunk)
            .await
            .map_err(|e| SyncError::io(&*scratch, e))?;
        written += chunk.len() as u64;
        on_chunk(written);
    }
    file.flush()
        .await
        .map_err(|e| SyncError::io(&*scratch, e))?;
    drop(file);

    scratch
        .persist(target)
        .map_err(|e| SyncError::io(target, e.error))?;
    debug!(bytes = written, "file written");
    Ok(written)
}

/// Writes `data` to `target` atomically
///
/// # Errors
///
/// Returns `SyncError::Io` if any step fails.
pub async fn write_bytes(target: &Path, data: Vec<u8>) -> Result<(), SyncError> {
    write_stream(target, ContentStream::from_bytes(data), |_| {}).await?;
    Ok(())
}
