//! Remote tree walker
//!
//! Traverses the remote folder hierarchy as a pull-based sequence of
//! [`RemoteFile`] values. Pending listing work is kept as a deque of
//! [`WalkItem`]s; each round takes up to `batch_size` of them from the front
//! and submits them in one [`IDriveService::list_children_batch`] call.
//!
//! ## Ordering
//!
//! Work discovered while processing a batch (continuation pages, child
//! folders, retries) is pushed back onto the *front* of the deque in
//! discovery order, giving the traversal a depth-first bias. Files are
//! yielded in the order the remote lists them (`folder,name,modifiedTime`).
//!
//! ## Retries
//!
//! A listing answered with 401, 403, 429, 500 or 503, or one whose request
//! was interrupted in transit, is re-queued with its retry count
//! incremented. Other items of the same batch are unaffected. A batch that contains a retry waits
//! `retry_delay` before it is issued. Past `max_retries` the walk aborts.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use drivemirror_core::config::WalkerConfig;
use drivemirror_core::domain::{local_name, MirrorPath, RemoteFile, RemoteItem, WalkItem};
use drivemirror_core::ports::{IDriveService, ListOutcome, ListRequest};
use tracing::{debug, info, warn};

use crate::WalkError;

/// Returns true for the statuses a listing is retried on
fn is_retryable(status: u16) -> bool {
    matches!(status, 401 | 403 | 429 | 500 | 503)
}

// ============================================================================
// NameRegistry
// ============================================================================

/// Assigns disambiguation indices to siblings that sanitize to one name
///
/// Keys are the path an item would get with index 0. The first item seen
/// for a key gets 0, later ones get the following integers. A candidate
/// path that is already taken (for example by a sibling literally named
/// `"Report, (1)"`) is skipped, so no two items ever share a local path.
#[derive(Debug, Default)]
pub struct NameRegistry {
    next_index: HashMap<String, u32>,
    claimed: HashSet<String>,
}

impl NameRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims a unique local name for `raw_name` under `parent`
    ///
    /// Returns the disambiguation index to store on the item.
    pub fn claim(&mut self, parent: &MirrorPath, raw_name: &str) -> u32 {
        let base = path_key(parent, &local_name(raw_name, 0));
        let next = self.next_index.entry(base).or_insert(0);
        loop {
            let index = *next;
            *next += 1;
            if self
                .claimed
                .insert(path_key(parent, &local_name(raw_name, index)))
            {
                return index;
            }
        }
    }

    /// Number of distinct local paths handed out
    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    /// Returns true if no name has been claimed yet
    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }
}

fn path_key(parent: &MirrorPath, segment: &str) -> String {
    if parent.is_root() {
        segment.to_string()
    } else {
        format!("{parent}/{segment}")
    }
}

// ============================================================================
// WalkerOptions
// ============================================================================

/// Tuning knobs for [`RemoteWalker`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkerOptions {
    /// Listing requests submitted per batch call
    pub batch_size: usize,
    /// Entries requested per listing page
    pub page_size: u32,
    /// Pause before a batch that contains retried listings
    pub retry_delay: Duration,
    /// Retries allowed per listing before the walk aborts
    pub max_retries: u32,
}

impl Default for WalkerOptions {
    fn default() -> Self {
        Self::from(&WalkerConfig::default())
    }
}

impl From<&WalkerConfig> for WalkerOptions {
    fn from(config: &WalkerConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            page_size: config.page_size,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            max_retries: config.max_retries,
        }
    }
}

// ============================================================================
// RemoteWalker
// ============================================================================

/// Pull-based traversal of the remote hierarchy
///
/// Single pass: once [`next`](Self::next) has returned `Ok(None)` the walk
/// is over. After an error the walker must not be polled again.
pub struct RemoteWalker {
    service: Arc<dyn IDriveService>,
    options: WalkerOptions,
    pending: VecDeque<WalkItem>,
    ready: VecDeque<RemoteFile>,
    names: NameRegistry,
    batches: u64,
}

impl RemoteWalker {
    /// Creates a walker starting at the drive root
    pub fn new(service: Arc<dyn IDriveService>, options: WalkerOptions) -> Self {
        Self {
            service,
            options,
            pending: VecDeque::from([WalkItem::root()]),
            ready: VecDeque::new(),
            names: NameRegistry::new(),
            batches: 0,
        }
    }

    /// Returns the next remote file, or `None` once the tree is exhausted
    ///
    /// # Errors
    ///
    /// - `WalkError::Remote` for a non-retryable listing status
    /// - `WalkError::RetriesExhausted` when a listing keeps failing
    /// - `WalkError::Transport` when the batch call itself fails
    #[allow(clippy::should_implement_trait)]
    pub async fn next(&mut self) -> Result<Option<RemoteFile>, WalkError> {
        loop {
            if let Some(file) = self.ready.pop_front() {
                return Ok(Some(file));
            }
            if self.pending.is_empty() {
                info!(batches = self.batches, names = self.names.len(), "Remote walk complete");
                return Ok(None);
            }
            self.process_batch().await?;
        }
    }

    /// Listing work not yet submitted
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    async fn process_batch(&mut self) -> Result<(), WalkError> {
        let take = self.options.batch_size.min(self.pending.len());
        let batch: Vec<WalkItem> = self.pending.drain(..take).collect();

        if batch.iter().any(WalkItem::is_retry) {
            debug!(
                delay_ms = self.options.retry_delay.as_millis() as u64,
                "Delaying batch with retried listings"
            );
            tokio::time::sleep(self.options.retry_delay).await;
        }

        let requests: Vec<ListRequest> = batch
            .iter()
            .map(|item| ListRequest {
                parent_id: item.parent_id(),
                page_token: item.page_token.clone(),
                page_size: self.options.page_size,
            })
            .collect();

        self.batches += 1;
        debug!(batch = self.batches, requests = requests.len(), "Submitting listing batch");

        let outcomes = self
            .service
            .list_children_batch(&requests)
            .await
            .map_err(WalkError::Transport)?;

        if outcomes.len() != batch.len() {
            return Err(WalkError::Transport(anyhow::anyhow!(
                "Expected {} listing outcomes, got {}",
                batch.len(),
                outcomes.len()
            )));
        }

        let mut discovered = Vec::new();
        for (item, outcome) in batch.into_iter().zip(outcomes) {
            match outcome {
                ListOutcome::Page(page) => {
                    if let Some(token) = page.next_page_token {
                        discovered.push(item.continuation(token));
                    }
                    let parent_path = item.parent_path();
                    for entry in page.entries {
                        let index = self.names.claim(&parent_path, &entry.name);
                        match RemoteItem::from_entry(entry, parent_path.clone(), index) {
                            RemoteItem::Dir(dir) => discovered.push(WalkItem::for_dir(dir)),
                            RemoteItem::File(file) => self.ready.push_back(file),
                        }
                    }
                }
                ListOutcome::Failed { status, message } if is_retryable(status) => {
                    discovered.push(self.retry(item, &format!("HTTP {status}: {message}"))?);
                }
                ListOutcome::Interrupted { message } => {
                    discovered.push(self.retry(item, &message)?);
                }
                ListOutcome::Failed { status, message } => {
                    return Err(WalkError::Remote { status, message });
                }
            }
        }

        for item in discovered.into_iter().rev() {
            self.pending.push_front(item);
        }
        Ok(())
    }

    /// The re-queued form of a failed listing, or the error ending the walk
    fn retry(&self, item: WalkItem, reason: &str) -> Result<WalkItem, WalkError> {
        let retried = item.retried();
        if retried.retry_count > self.options.max_retries {
            return Err(WalkError::RetriesExhausted {
                path: retried.parent_path().to_string(),
                retries: self.options.max_retries,
            });
        }
        warn!(
            reason,
            path = %retried.parent_path(),
            retry = retried.retry_count,
            "Listing failed, will retry"
        );
        Ok(retried)
    }
}
