//! Mirror engine
//!
//! Orchestrates one mirror run:
//!
//! 1. **Sync** - walk the remote tree into the listing cache (skipped with
//!    `use_cache` when a cache file already exists)
//! 2. **Download** - drain the cache with the download workers
//! 3. **Cleanup** - delete local paths the download pass did not claim
//!    (only with `delete`)
//!
//! Sync errors abort the run. Download and cleanup failures are reported
//! per record, variant or path and the run goes on.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use drivemirror_cache::{count_lines, CacheWriter, SharedCursor};
use drivemirror_core::config::Config;
use drivemirror_core::domain::{ExportPolicy, UsedPath};
use drivemirror_core::ports::{IDriveService, IRepositoryManager};
use tracing::{info, instrument};

use crate::cleaner::{Cleaner, CleanupReport};
use crate::events::{emit, EventSender, MirrorEvent};
use crate::filesystem::exists;
use crate::materialize::Materializer;
use crate::scheduler::{DownloadReport, DownloadScheduler};
use crate::walker::{RemoteWalker, WalkerOptions};
use crate::SyncError;

/// Settings of one mirror run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorOptions {
    /// Local mirror root
    pub output_dir: PathBuf,
    /// Listing cache file
    pub cache_path: PathBuf,
    /// Concurrent download workers
    pub workers: usize,
    /// Remote walk tuning
    pub walker: WalkerOptions,
    /// Reuse an existing cache instead of walking the remote tree
    pub use_cache: bool,
    /// Delete local paths that are no longer mirrored
    pub delete: bool,
}

impl MirrorOptions {
    /// Options taken from a loaded configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            output_dir: config.mirror.output_dir.clone(),
            cache_path: config.mirror.cache_path.clone(),
            workers: config.mirror.workers,
            walker: WalkerOptions::from(&config.walker),
            use_cache: false,
            delete: false,
        }
    }
}

/// Summary of a mirror run
#[derive(Debug)]
pub struct MirrorReport {
    /// Files written to the cache, or `None` if an existing cache was used
    pub synced: Option<u64>,
    /// Download pass summary
    pub download: DownloadReport,
    /// Cleanup summary, if cleanup ran
    pub cleanup: Option<CleanupReport>,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

/// Runs the sync, download and cleanup phases
///
/// ## Dependencies
///
/// - `drive`: remote listings and content (Google Drive)
/// - `repos`: working copies for `.git.json` pointers
/// - `policy`: which native documents are exported to what
pub struct MirrorEngine {
    drive: Arc<dyn IDriveService>,
    repos: Arc<dyn IRepositoryManager>,
    policy: Arc<ExportPolicy>,
    options: MirrorOptions,
}

impl MirrorEngine {
    /// Creates a new `MirrorEngine`
    pub fn new(
        drive: Arc<dyn IDriveService>,
        repos: Arc<dyn IRepositoryManager>,
        policy: ExportPolicy,
        options: MirrorOptions,
    ) -> Self {
        Self {
            drive,
            repos,
            policy: Arc::new(policy),
            options,
        }
    }

    /// The run settings
    pub fn options(&self) -> &MirrorOptions {
        &self.options
    }

    /// Walks the remote tree and rewrites the listing cache
    ///
    /// The previous cache stays in place until the walk completes.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Walk` if the walk aborts or `SyncError::Cache`
    /// if the cache cannot be written.
    #[instrument(skip_all, fields(cache = %self.options.cache_path.display()))]
    pub async fn sync_cache(&self, events: &EventSender) -> Result<u64, SyncError> {
        emit(events, MirrorEvent::SyncStarted);
        info!("Walking remote tree");

        let mut writer = CacheWriter::create(&self.options.cache_path).await?;
        let mut walker = RemoteWalker::new(Arc::clone(&self.drive), self.options.walker.clone());

        while let Some(file) = walker.next().await? {
            let total = writer.append(&file).await?;
            emit(
                events,
                MirrorEvent::FileFound {
                    path: file.path().to_string(),
                    total,
                },
            );
        }

        let total = writer.finish().await?;
        emit(events, MirrorEvent::SyncFinished { total });
        info!(total, "Remote tree cached");
        Ok(total)
    }

    /// Downloads every stale variant listed in the cache
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Cache` if the cache cannot be read, or
    /// `SyncError::Join` if a worker panicked.
    pub async fn download(&self, events: &EventSender) -> Result<DownloadReport, SyncError> {
        let total = count_lines(&self.options.cache_path).await?;
        let cursor = SharedCursor::open(&self.options.cache_path).await?;
        let scheduler = DownloadScheduler::new(
            Materializer::new(Arc::clone(&self.drive), Arc::clone(&self.repos)),
            &self.options.output_dir,
            Arc::clone(&self.policy),
            self.options.workers,
        );
        scheduler.run(cursor, total, events).await
    }

    /// Deletes local paths not in `used`
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Io` if the output directory cannot be listed.
    pub async fn cleanup(
        &self,
        used: Vec<UsedPath>,
        events: &EventSender,
    ) -> Result<CleanupReport, SyncError> {
        Cleaner::new(used, &self.options.output_dir)
            .cleanup(events)
            .await
    }

    /// Runs all phases according to the options
    ///
    /// # Errors
    ///
    /// Any error of [`sync_cache`](Self::sync_cache),
    /// [`download`](Self::download) or [`cleanup`](Self::cleanup).
    pub async fn run(&self, events: &EventSender) -> Result<MirrorReport, SyncError> {
        let start = Instant::now();
        let output_dir = &self.options.output_dir;
        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|e| SyncError::io(output_dir, e))?;

        let synced = if self.options.use_cache && exists(&self.options.cache_path).await {
            info!(cache = %self.options.cache_path.display(), "Using existing cache");
            None
        } else {
            Some(self.sync_cache(events).await?)
        };

        let mut download = self.download(events).await?;

        let cleanup = if self.options.delete {
            let used = std::mem::take(&mut download.used).into_paths();
            Some(self.cleanup(used, events).await?)
        } else {
            None
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(duration_ms, "Mirror run complete");
        Ok(MirrorReport {
            synced,
            download,
            cleanup,
            duration_ms,
        })
    }
}
