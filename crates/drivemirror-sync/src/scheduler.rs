//! Download scheduler - drains the listing cache with concurrent workers
//!
//! A fixed number of workers share one [`SharedCursor`]. Each worker takes
//! the next line, decodes it, records the paths the file may occupy, asks
//! the decision engine whether anything is stale and materializes the
//! stale file's variants in order.
//!
//! ## Flow
//!
//! ```text
//! cache file ──→ SharedCursor ──→ worker 1..W ──→ decision ──→ Materializer
//!                                     │
//!                                 UsedPathSet ──→ Cleaner
//! ```
//!
//! Failures are isolated: an undecodable line or a failed variant is
//! reported as an event and the worker moves on. A record whose export
//! failed keeps its previous redirect marker, so it stays stale until a
//! later run completes every export.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use drivemirror_cache::SharedCursor;
use drivemirror_core::domain::{BackupVariant, ExportPolicy, UsedPath, VariantKind};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::decision::{needs_backup, variants_for};
use crate::events::{emit, EventSender, MirrorEvent};
use crate::materialize::Materializer;
use crate::SyncError;

// ============================================================================
// UsedPathSet
// ============================================================================

/// Paths the download pass determined should exist
///
/// Append-only and shared by all workers.
#[derive(Debug, Default)]
pub struct UsedPathSet {
    paths: Mutex<Vec<UsedPath>>,
}

impl UsedPathSet {
    /// Creates an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Records more used paths
    pub fn extend(&self, paths: impl IntoIterator<Item = UsedPath>) {
        self.paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(paths);
    }

    /// Number of recorded entries (duplicates included)
    pub fn len(&self) -> usize {
        self.paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Takes the recorded entries out of the set
    pub fn into_paths(self) -> Vec<UsedPath> {
        self.paths
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Copies the recorded entries
    pub fn to_paths(&self) -> Vec<UsedPath> {
        self.paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl From<Vec<UsedPath>> for UsedPathSet {
    fn from(paths: Vec<UsedPath>) -> Self {
        Self {
            paths: Mutex::new(paths),
        }
    }
}

// ============================================================================
// DownloadReport
// ============================================================================

/// Summary of a download pass
#[derive(Debug)]
pub struct DownloadReport {
    /// Lines in the cache file
    pub total: u64,
    /// Records decoded and handled
    pub processed: u64,
    /// Records whose variants were all fresh
    pub skipped: u64,
    /// Lines that could not be decoded
    pub failed_records: u64,
    /// Variants written
    pub saved_variants: u64,
    /// Variants that failed
    pub failed_variants: u64,
    /// Everything the cleaner must keep
    pub used: UsedPathSet,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

#[derive(Debug, Default)]
struct Counters {
    processed: AtomicU64,
    skipped: AtomicU64,
    failed_records: AtomicU64,
    saved_variants: AtomicU64,
    failed_variants: AtomicU64,
}

// ============================================================================
// DownloadScheduler
// ============================================================================

/// Runs download workers over a cache cursor
#[derive(Clone)]
pub struct DownloadScheduler {
    materializer: Materializer,
    root: PathBuf,
    policy: Arc<ExportPolicy>,
    workers: usize,
}

struct Worker {
    scheduler: DownloadScheduler,
    cursor: SharedCursor,
    used: Arc<UsedPathSet>,
    counters: Arc<Counters>,
    events: EventSender,
    total: u64,
}

impl DownloadScheduler {
    /// Creates a scheduler writing under `root`
    ///
    /// # Arguments
    /// * `materializer` - Writes variants to disk
    /// * `root` - Local mirror root
    /// * `policy` - Export policy for native documents
    /// * `workers` - Number of concurrent workers (at least one is used)
    pub fn new(
        materializer: Materializer,
        root: impl Into<PathBuf>,
        policy: Arc<ExportPolicy>,
        workers: usize,
    ) -> Self {
        Self {
            materializer,
            root: root.into(),
            policy,
            workers: workers.max(1),
        }
    }

    /// Number of workers spawned per run
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Drains `cursor` with the configured number of workers
    ///
    /// `total` is the cache's line count, used for progress events only.
    /// Resolves once every worker has exhausted the cursor.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Cache` if the cache cannot be read, or
    /// `SyncError::Join` if a worker panicked. The remaining workers are
    /// still awaited before the error is returned.
    pub async fn run(
        &self,
        cursor: SharedCursor,
        total: u64,
        events: &EventSender,
    ) -> Result<DownloadReport, SyncError> {
        let start = Instant::now();
        let used = Arc::new(UsedPathSet::new());
        let counters = Arc::new(Counters::default());

        info!(workers = self.workers, total, root = %self.root.display(), "Starting download workers");
        emit(events, MirrorEvent::DownloadStarted { total });

        let mut set = JoinSet::new();
        for index in 0..self.workers {
            let worker = Worker {
                scheduler: self.clone(),
                cursor: cursor.clone(),
                used: Arc::clone(&used),
                counters: Arc::clone(&counters),
                events: events.clone(),
                total,
            };
            set.spawn(async move { worker.run(index).await });
        }

        let mut first_error = None;
        while let Some(joined) = set.join_next().await {
            let outcome = joined.map_err(SyncError::from).and_then(|r| r);
            if let Err(e) = outcome {
                error!(error = %e, "Download worker failed");
                first_error.get_or_insert(e);
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        let processed = counters.processed.load(Ordering::Relaxed);
        emit(events, MirrorEvent::DownloadFinished { processed, total });

        let used = Arc::try_unwrap(used)
            .unwrap_or_else(|shared| UsedPathSet::from(shared.to_paths()));

        let report = DownloadReport {
            total,
            processed,
            skipped: counters.skipped.load(Ordering::Relaxed),
            failed_records: counters.failed_records.load(Ordering::Relaxed),
            saved_variants: counters.saved_variants.load(Ordering::Relaxed),
            failed_variants: counters.failed_variants.load(Ordering::Relaxed),
            used,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            processed = report.processed,
            skipped = report.skipped,
            saved = report.saved_variants,
            failed = report.failed_variants + report.failed_records,
            duration_ms = report.duration_ms,
            "Download pass complete"
        );
        Ok(report)
    }
}

impl Worker {
    async fn run(self, index: usize) -> Result<(), SyncError> {
        debug!(worker = index, "Worker started");
        let root = &self.scheduler.root;
        let policy = self.scheduler.policy.as_ref();

        while let Some(line) = self.cursor.next_line().await? {
            let file = match line.decode() {
                Ok(file) => file,
                Err(e) => {
                    warn!(line = line.number, error = %e, "Skipping undecodable cache line");
                    self.counters.failed_records.fetch_add(1, Ordering::Relaxed);
                    emit(
                        &self.events,
                        MirrorEvent::RecordFailed {
                            line: line.number,
                            message: e.to_string(),
                        },
                    );
                    continue;
                }
            };

            let record = file.path().to_string();
            let processed = self.counters.processed.fetch_add(1, Ordering::Relaxed) + 1;
            emit(
                &self.events,
                MirrorEvent::RecordStarted {
                    path: record.clone(),
                    processed,
                    total: self.total,
                },
            );

            let variants = variants_for(&file, root, policy);
            self.used
                .extend(variants.iter().flat_map(BackupVariant::used_paths));

            if file.is_unwanted_repository() {
                warn!(path = %record, "Repository stored file by file; use a .git.json pointer");
                emit(
                    &self.events,
                    MirrorEvent::UnwantedRepository {
                        path: record.clone(),
                    },
                );
            }

            if !needs_backup(&file, root, policy).await {
                self.counters.skipped.fetch_add(1, Ordering::Relaxed);
                emit(&self.events, MirrorEvent::Skipped { path: record });
                continue;
            }

            // the marker is the staleness oracle; it may only move forward
            // once every export of the record is in place
            let mut failed = false;
            for variant in &variants {
                if failed && variant.kind == VariantKind::Redirect {
                    warn!(
                        path = %record,
                        marker = %variant.relative_path,
                        "Keeping previous redirect marker; an export failed"
                    );
                    continue;
                }
                failed |= !self.save(&record, variant).await;
            }
        }

        debug!(worker = index, "Worker finished");
        Ok(())
    }

    /// Materializes one variant, returning false if it failed
    async fn save(&self, record: &str, variant: &BackupVariant) -> bool {
        let path = variant.relative_path.to_string();
        let events = &self.events;
        let result = self
            .scheduler
            .materializer
            .materialize(variant, |fraction| {
                emit(
                    events,
                    MirrorEvent::Progress {
                        path: path.clone(),
                        fraction,
                    },
                );
            })
            .await;

        match result {
            Ok(()) => {
                self.counters.saved_variants.fetch_add(1, Ordering::Relaxed);
                emit(
                    events,
                    MirrorEvent::VariantSaved {
                        record: record.to_string(),
                        path,
                    },
                );
                true
            }
            Err(e) => {
                warn!(record, variant = %path, error = %e, "Variant failed");
                self.counters.failed_variants.fetch_add(1, Ordering::Relaxed);
                emit(
                    events,
                    MirrorEvent::VariantFailed {
                        record: record.to_string(),
                        path,
                        message: e.to_string(),
                    },
                );
                false
            }
        }
    }
}
