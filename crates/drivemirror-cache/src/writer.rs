//! Cache stream writer
//!
//! Records go to `<cache>.tmp` first; [`CacheWriter::finish`] renames the
//! file into place, so an interrupted sync never leaves a truncated cache
//! for a later `--cached` run to trust.

use std::path::{Path, PathBuf};

use drivemirror_core::domain::RemoteFile;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info};

use crate::CacheError;

/// Appends remote files to a new cache stream
pub struct CacheWriter {
    path: PathBuf,
    tmp_path: PathBuf,
    out: BufWriter<File>,
    records: u64,
}

impl CacheWriter {
    /// Starts a new cache at `path`
    ///
    /// Parent directories are created as needed. The previous cache, if any,
    /// stays readable until [`finish`](Self::finish) replaces it.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Io` if the directory or temporary file cannot
    /// be created.
    pub async fn create(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| CacheError::io(parent, e))?;
        }

        let tmp_path = tmp_path_for(path);
        let file = File::create(&tmp_path)
            .await
            .map_err(|e| CacheError::io(&tmp_path, e))?;

        debug!(path = %path.display(), "Cache writer opened");

        Ok(Self {
            path: path.to_path_buf(),
            tmp_path,
            out: BufWriter::new(file),
            records: 0,
        })
    }

    /// Appends one record as a single line
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Encode` if the record cannot be serialized or
    /// `CacheError::Io` if the write fails.
    pub async fn append(&mut self, file: &RemoteFile) -> Result<u64, CacheError> {
        let mut line = serde_json::to_vec(file).map_err(CacheError::Encode)?;
        line.push(b'\n');
        self.out
            .write_all(&line)
            .await
            .map_err(|e| CacheError::io(&self.tmp_path, e))?;
        self.records += 1;
        Ok(self.records)
    }

    /// Number of records appended so far
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Flushes and publishes the cache, returning the record count
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Io` if flushing or the final rename fails.
    pub async fn finish(mut self) -> Result<u64, CacheError> {
        self.out
            .flush()
            .await
            .map_err(|e| CacheError::io(&self.tmp_path, e))?;
        self.out
            .get_ref()
            .sync_all()
            .await
            .map_err(|e| CacheError::io(&self.tmp_path, e))?;

        fs::rename(&self.tmp_path, &self.path)
            .await
            .map_err(|e| CacheError::io(&self.path, e))?;

        info!(
            path = %self.path.display(),
            records = self.records,
            "Cache written"
        );
        Ok(self.records)
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}
