//! Local tree reconciler
//!
//! Deletes everything under the mirror root that the download pass did not
//! claim, then removes directories left empty by those deletions.
//!
//! ## Algorithm
//!
//! Both sides are put in the same *tree order*: paths are compared segment
//! by segment, a path sorts before everything beneath it, and at the first
//! differing segment a directory sorts before a file, then names compare
//! bytewise. The used entries are sorted once; the physical tree is walked
//! lazily depth-first in that same order. A single linear merge then
//! classifies every physical leaf (file, symlink or empty directory) as
//! kept or orphaned, without rescanning either side.

use std::cmp::Ordering;
use std::collections::{HashSet, VecDeque};
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use drivemirror_core::domain::UsedPath;
use tracing::{debug, info, instrument, warn};

use crate::events::{emit, EventSender, MirrorEvent};
use crate::SyncError;

// ============================================================================
// Tree order
// ============================================================================

/// Compares two relative paths in tree order
///
/// `a_dir`/`b_dir` tell whether the final segment of each path is a
/// directory; every earlier segment is one by construction.
pub fn tree_order(a: &[OsString], a_dir: bool, b: &[OsString], b_dir: bool) -> Ordering {
    for (i, (sa, sb)) in a.iter().zip(b).enumerate() {
        if sa == sb {
            continue;
        }
        let a_is_dir = i + 1 < a.len() || a_dir;
        let b_is_dir = i + 1 < b.len() || b_dir;
        return match (a_is_dir, b_is_dir) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => sa.cmp(sb),
        };
    }
    a.len().cmp(&b.len())
}

fn is_prefix(prefix: &[OsString], path: &[OsString]) -> bool {
    prefix.len() <= path.len() && prefix.iter().zip(path).all(|(a, b)| a == b)
}

/// A used entry relative to the root
#[derive(Debug, Clone, PartialEq, Eq)]
struct UsedEntry {
    segments: Vec<OsString>,
    /// Kept with everything beneath it
    tree: bool,
}

impl UsedEntry {
    fn cmp_tree(&self, other: &Self) -> Ordering {
        tree_order(&self.segments, self.tree, &other.segments, other.tree)
            .then(self.tree.cmp(&other.tree))
    }
}

fn relative_segments(root: &Path, path: &Path) -> Option<Vec<OsString>> {
    let rel = path.strip_prefix(root).ok()?;
    let mut segments = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(s) => segments.push(s.to_os_string()),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(segments)
}

// ============================================================================
// Lazy physical tree walk
// ============================================================================

/// A leaf of the physical tree: file, symlink or empty directory
#[derive(Debug, Clone, PartialEq, Eq)]
struct Leaf {
    segments: Vec<OsString>,
    path: PathBuf,
    is_dir: bool,
}

struct Frame {
    dir: PathBuf,
    segments: Vec<OsString>,
    entries: VecDeque<(OsString, bool)>,
}

/// Depth-first walk yielding leaves in tree order
///
/// Holds one sorted listing per directory on the current path only.
struct TreeWalk {
    stack: Vec<Frame>,
}

impl TreeWalk {
    async fn open(root: &Path) -> Result<Self, SyncError> {
        let entries = match read_sorted(root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => VecDeque::new(),
            Err(e) => return Err(SyncError::io(root, e)),
        };
        Ok(Self {
            stack: vec![Frame {
                dir: root.to_path_buf(),
                segments: Vec::new(),
                entries,
            }],
        })
    }

    async fn next(&mut self) -> Option<Leaf> {
        loop {
            let frame = self.stack.last_mut()?;
            let Some((name, is_dir)) = frame.entries.pop_front() else {
                self.stack.pop();
                continue;
            };
            let path = frame.dir.join(&name);
            let mut segments = frame.segments.clone();
            segments.push(name);

            if !is_dir {
                return Some(Leaf {
                    segments,
                    path,
                    is_dir: false,
                });
            }

            match read_sorted(&path).await {
                Ok(entries) if entries.is_empty() => {
                    return Some(Leaf {
                        segments,
                        path,
                        is_dir: true,
                    })
                }
                Ok(entries) => self.stack.push(Frame {
                    dir: path,
                    segments,
                    entries,
                }),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable directory");
                }
            }
        }
    }
}

/// Lists a directory, directories first, then by name
///
/// Symlinks are never followed; a link to a directory is a leaf.
async fn read_sorted(dir: &Path) -> std::io::Result<VecDeque<(OsString, bool)>> {
    let mut read = tokio::fs::read_dir(dir).await?;
    let mut entries = Vec::new();
    while let Some(entry) = read.next_entry().await? {
        let is_dir = entry.file_type().await?.is_dir();
        entries.push((entry.file_name(), is_dir));
    }
    entries.sort_by(|(na, da), (nb, db)| db.cmp(da).then_with(|| na.cmp(nb)));
    Ok(entries.into())
}

// ============================================================================
// Cleaner
// ============================================================================

/// Summary of a cleanup pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Physical leaves examined
    pub scanned: u64,
    /// Leaves with no counterpart in the used set
    pub orphans: u64,
    /// Orphans removed
    pub deleted: u64,
    /// Orphans that could not be removed
    pub failed: u64,
    /// Directories removed because deletions left them empty
    pub pruned_dirs: u64,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

/// Deletes local paths outside the used-path set
pub struct Cleaner {
    root: PathBuf,
    used: Vec<UsedEntry>,
    /// Directories that hold (or will hold) used entries
    protected_dirs: HashSet<PathBuf>,
}

impl Cleaner {
    /// Prepares a cleanup of `root` keeping `used`
    ///
    /// Used paths outside `root` are ignored. The root itself is never
    /// deleted.
    pub fn new(used: impl IntoIterator<Item = UsedPath>, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let mut entries = Vec::new();
        let mut protected_dirs = HashSet::new();

        for used_path in used {
            let path = used_path.path();
            let Some(segments) = relative_segments(&root, path) else {
                warn!(path = %path.display(), "Ignoring used path outside the mirror root");
                continue;
            };
            let mut ancestor = path.parent();
            while let Some(dir) = ancestor {
                if !dir.starts_with(&root) || !protected_dirs.insert(dir.to_path_buf()) {
                    break;
                }
                ancestor = dir.parent();
            }
            entries.push(UsedEntry {
                segments,
                tree: matches!(used_path, UsedPath::Tree(_)),
            });
        }

        entries.sort_by(UsedEntry::cmp_tree);
        entries.dedup();
        debug!(entries = entries.len(), root = %root.display(), "Cleaner prepared");

        Self {
            root,
            used: entries,
            protected_dirs,
        }
    }

    /// Scans the tree, then deletes every orphan
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Io` if the root cannot be listed. Individual
    /// deletion failures are reported as events and counted instead.
    #[instrument(skip_all, fields(root = %self.root.display()))]
    pub async fn cleanup(&self, events: &EventSender) -> Result<CleanupReport, SyncError> {
        let start = Instant::now();
        let mut report = CleanupReport::default();

        emit(events, MirrorEvent::CleanupScanStarted);
        let orphans = self.scan(events, &mut report).await?;
        emit(
            events,
            MirrorEvent::CleanupScanFinished {
                orphans: report.orphans,
            },
        );

        if !orphans.is_empty() {
            self.delete(orphans, events, &mut report).await;
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            scanned = report.scanned,
            orphans = report.orphans,
            deleted = report.deleted,
            failed = report.failed,
            pruned_dirs = report.pruned_dirs,
            "Cleanup complete"
        );
        Ok(report)
    }

    /// Merges the physical tree against the used entries
    async fn scan(
        &self,
        events: &EventSender,
        report: &mut CleanupReport,
    ) -> Result<Vec<Leaf>, SyncError> {
        let mut walk = TreeWalk::open(&self.root).await?;
        let mut used: VecDeque<&UsedEntry> = self.used.iter().collect();
        let mut orphans = Vec::new();

        while let Some(leaf) = walk.next().await {
            report.scanned += 1;

            while let Some(head) = used.front() {
                if head.tree && is_prefix(&head.segments, &leaf.segments) {
                    break;
                }
                if tree_order(&head.segments, head.tree, &leaf.segments, leaf.is_dir)
                    == Ordering::Less
                {
                    used.pop_front();
                } else {
                    break;
                }
            }

            let kept = used.front().is_some_and(|head| {
                (head.tree && is_prefix(&head.segments, &leaf.segments))
                    || head.segments == leaf.segments
                    || (leaf.is_dir && is_prefix(&leaf.segments, &head.segments))
            });

            if !kept {
                report.orphans += 1;
                debug!(path = %leaf.path.display(), "Orphan found");
                emit(
                    events,
                    MirrorEvent::OrphanFound {
                        path: leaf.path.display().to_string(),
                        count: report.orphans,
                    },
                );
                orphans.push(leaf);
            }
        }
        Ok(orphans)
    }

    async fn delete(&self, orphans: Vec<Leaf>, events: &EventSender, report: &mut CleanupReport) {
        let total = orphans.len() as u64;
        emit(events, MirrorEvent::DeleteStarted { total });

        for (i, leaf) in orphans.into_iter().enumerate() {
            let result = if leaf.is_dir {
                tokio::fs::remove_dir(&leaf.path).await
            } else {
                tokio::fs::remove_file(&leaf.path).await
            };

            match result {
                Ok(()) => {
                    report.deleted += 1;
                    emit(
                        events,
                        MirrorEvent::Deleted {
                            path: leaf.path.display().to_string(),
                            processed: i as u64 + 1,
                            total,
                        },
                    );
                    self.prune_ancestors(&leaf.path, events, report).await;
                }
                Err(e) => {
                    warn!(path = %leaf.path.display(), error = %e, "Delete failed");
                    report.failed += 1;
                    emit(
                        events,
                        MirrorEvent::DeleteFailed {
                            path: leaf.path.display().to_string(),
                            message: e.to_string(),
                        },
                    );
                }
            }
        }

        emit(
            events,
            MirrorEvent::CleanupFinished {
                deleted: report.deleted,
                total,
            },
        );
    }

    /// Removes now-empty parents of `path`, stopping at the root, at a
    /// directory that holds used entries, or at the first non-empty one
    async fn prune_ancestors(&self, path: &Path, events: &EventSender, report: &mut CleanupReport) {
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir == self.root || !dir.starts_with(&self.root) || self.protected_dirs.contains(dir)
            {
                break;
            }
            if tokio::fs::remove_dir(dir).await.is_err() {
                break;
            }
            report.pruned_dirs += 1;
            debug!(path = %dir.display(), "Removed empty directory");
            emit(
                events,
                MirrorEvent::Deleted {
                    path: dir.display().to_string(),
                    processed: report.deleted,
                    total: report.orphans,
                },
            );
            current = dir.parent();
        }
    }
}
