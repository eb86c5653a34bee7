//! Shared test helpers for pipeline tests
//!
//! [`FakeDrive`] serves folder listings, file bytes and exports from
//! memory and records every call. [`FakeRepos`] keeps working copies as a
//! map of directory to remotes; cloning creates the directory on disk so
//! the decision engine sees it.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail};
use drivemirror_core::domain::{
    ExportPolicy, Md5Hash, PageToken, RemoteEntry, RemoteId, FOLDER_MIME_TYPE,
};
use drivemirror_core::ports::{
    ContentStream, IDriveService, IRepositoryManager, ListOutcome, ListPage, ListRequest,
    RepoRemote,
};
use drivemirror_sync::{EventSender, MirrorEngine, MirrorEvent, MirrorOptions, WalkerOptions};
use tempfile::TempDir;
use tokio::sync::mpsc;

pub const DOC_MIME: &str = "application/vnd.google-apps.document";

// ============================================================================
// Entries
// ============================================================================

pub fn remote_id(id: &str) -> RemoteId {
    RemoteId::new(id.to_string()).unwrap()
}

/// A folder entry
pub fn dir(id: &str, name: &str) -> RemoteEntry {
    RemoteEntry {
        id: remote_id(id),
        name: name.to_string(),
        mime_type: FOLDER_MIME_TYPE.to_string(),
        md5: None,
        link: None,
        size: None,
        modified_time: None,
    }
}

/// A raw file entry whose checksum and size match `content`
pub fn file(id: &str, name: &str, content: &[u8]) -> RemoteEntry {
    RemoteEntry {
        id: remote_id(id),
        name: name.to_string(),
        mime_type: "application/octet-stream".to_string(),
        md5: Some(Md5Hash::from_digest(md5::compute(content).0)),
        link: None,
        size: Some(content.len() as u64),
        modified_time: Some(1_700_000_000_000),
    }
}

/// A native document entry
pub fn doc(id: &str, name: &str, modified_time: i64) -> RemoteEntry {
    RemoteEntry {
        id: remote_id(id),
        name: name.to_string(),
        mime_type: DOC_MIME.to_string(),
        md5: None,
        link: Some(format!("https://docs.google.com/document/d/{id}/edit")),
        size: None,
        modified_time: Some(modified_time),
    }
}

/// Bytes [`FakeDrive`] returns when exporting `id` to `mime_type`
pub fn export_bytes(id: &str, mime_type: &str) -> Vec<u8> {
    format!("{id} exported as {mime_type}").into_bytes()
}

// ============================================================================
// FakeDrive
// ============================================================================

/// In-memory drive
///
/// Listings are paginated by offset, so a folder with more children than
/// the request's page size yields continuation tokens.
#[derive(Default)]
pub struct FakeDrive {
    folders: Mutex<HashMap<String, Vec<RemoteEntry>>>,
    listing_failures: Mutex<HashMap<String, VecDeque<u16>>>,
    interruptions: Mutex<HashMap<String, u32>>,
    contents: Mutex<HashMap<String, Vec<u8>>>,
    failing_exports: Mutex<HashSet<String>>,
    batches: Mutex<Vec<Vec<ListRequest>>>,
    downloads: Mutex<Vec<String>>,
    exports: Mutex<Vec<(String, String)>>,
}

impl FakeDrive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends children to `parent` (`"root"` for the top level)
    pub fn folder(self, parent: &str, entries: Vec<RemoteEntry>) -> Self {
        self.folders
            .lock()
            .unwrap()
            .entry(parent.to_string())
            .or_default()
            .extend(entries);
        self
    }

    /// Appends a raw file to `parent` and serves `bytes` for it
    pub fn raw(self, parent: &str, id: &str, name: &str, bytes: &[u8]) -> Self {
        self.folder(parent, vec![file(id, name, bytes)])
            .content(id, bytes)
    }

    /// Sets the bytes served for `id`
    pub fn content(self, id: &str, bytes: &[u8]) -> Self {
        self.contents
            .lock()
            .unwrap()
            .insert(id.to_string(), bytes.to_vec());
        self
    }

    /// The next listings of `parent` fail with `statuses`, in order
    pub fn fail_listing(self, parent: &str, statuses: &[u16]) -> Self {
        self.listing_failures
            .lock()
            .unwrap()
            .entry(parent.to_string())
            .or_default()
            .extend(statuses);
        self
    }

    /// The next `times` listings of `parent` get no answer
    pub fn interrupt_listing(self, parent: &str, times: u32) -> Self {
        *self
            .interruptions
            .lock()
            .unwrap()
            .entry(parent.to_string())
            .or_default() += times;
        self
    }

    /// Every export to `mime_type` fails
    pub fn fail_export(self, mime_type: &str) -> Self {
        self.failing_exports
            .lock()
            .unwrap()
            .insert(mime_type.to_string());
        self
    }

    /// Makes exports to `mime_type` fail from now on
    pub fn set_export_failing(&self, mime_type: &str) {
        self.failing_exports
            .lock()
            .unwrap()
            .insert(mime_type.to_string());
    }

    /// Lets every export succeed again
    pub fn clear_export_failures(&self) {
        self.failing_exports.lock().unwrap().clear();
    }

    /// Replaces the bytes served for `id` on an existing drive
    pub fn set_content(&self, id: &str, bytes: &[u8]) {
        self.contents
            .lock()
            .unwrap()
            .insert(id.to_string(), bytes.to_vec());
    }

    /// Replaces the children of `parent` on an existing drive
    pub fn set_folder(&self, parent: &str, entries: Vec<RemoteEntry>) {
        self.folders
            .lock()
            .unwrap()
            .insert(parent.to_string(), entries);
    }

    pub fn batches(&self) -> Vec<Vec<ListRequest>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn downloads(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }

    pub fn exports(&self) -> Vec<(String, String)> {
        self.exports.lock().unwrap().clone()
    }

    /// Downloads plus exports issued so far
    pub fn content_requests(&self) -> usize {
        self.downloads.lock().unwrap().len() + self.exports.lock().unwrap().len()
    }

    fn list(&self, request: &ListRequest) -> ListOutcome {
        let parent = request.parent_id.as_str();
        if let Some(left) = self
            .interruptions
            .lock()
            .unwrap()
            .get_mut(parent)
            .filter(|left| **left > 0)
        {
            *left -= 1;
            return ListOutcome::Interrupted {
                message: format!("connection reset while listing {parent}"),
            };
        }
        if let Some(status) = self
            .listing_failures
            .lock()
            .unwrap()
            .get_mut(parent)
            .and_then(VecDeque::pop_front)
        {
            return ListOutcome::Failed {
                status,
                message: format!("scripted failure for {parent}"),
            };
        }

        let folders = self.folders.lock().unwrap();
        let Some(children) = folders.get(parent) else {
            return ListOutcome::Failed {
                status: 404,
                message: format!("File not found: {parent}"),
            };
        };

        let offset: usize = request
            .page_token
            .as_ref()
            .map_or(0, |t| t.as_str().parse().unwrap());
        let end = (offset + request.page_size as usize).min(children.len());
        let next_page_token =
            (end < children.len()).then(|| PageToken::new(end.to_string()).unwrap());

        ListOutcome::Page(ListPage {
            entries: children[offset..end].to_vec(),
            next_page_token,
        })
    }
}

#[async_trait::async_trait]
impl IDriveService for FakeDrive {
    async fn list_children_batch(
        &self,
        requests: &[ListRequest],
    ) -> anyhow::Result<Vec<ListOutcome>> {
        self.batches.lock().unwrap().push(requests.to_vec());
        Ok(requests.iter().map(|r| self.list(r)).collect())
    }

    async fn download(&self, id: &RemoteId) -> anyhow::Result<ContentStream> {
        self.downloads.lock().unwrap().push(id.to_string());
        let bytes = self
            .contents
            .lock()
            .unwrap()
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| anyhow!("File not found: {id}"))?;
        Ok(ContentStream::from_bytes(bytes))
    }

    async fn export(&self, id: &RemoteId, mime_type: &str) -> anyhow::Result<ContentStream> {
        self.exports
            .lock()
            .unwrap()
            .push((id.to_string(), mime_type.to_string()));
        if self.failing_exports.lock().unwrap().contains(mime_type) {
            bail!("Export of {id} to {mime_type} failed");
        }
        Ok(ContentStream::from_bytes(export_bytes(id.as_str(), mime_type)))
    }
}

// ============================================================================
// FakeRepos
// ============================================================================

/// Working copies kept in memory
#[derive(Default)]
pub struct FakeRepos {
    remotes: Mutex<HashMap<PathBuf, Vec<RepoRemote>>>,
    clones: Mutex<Vec<(String, PathBuf)>>,
    pulls: Mutex<Vec<PathBuf>>,
}

impl FakeRepos {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an existing working copy at `dir` with `remotes`
    pub fn insert(&self, dir: &Path, remotes: &[(&str, &str)]) {
        let remotes = remotes
            .iter()
            .map(|(name, url)| RepoRemote {
                name: name.to_string(),
                fetch_url: Some(url.to_string()),
            })
            .collect();
        self.remotes
            .lock()
            .unwrap()
            .insert(dir.to_path_buf(), remotes);
    }

    pub fn remotes_of(&self, dir: &Path) -> Vec<RepoRemote> {
        self.remotes
            .lock()
            .unwrap()
            .get(dir)
            .cloned()
            .unwrap_or_default()
    }

    pub fn clones(&self) -> Vec<(String, PathBuf)> {
        self.clones.lock().unwrap().clone()
    }

    pub fn pulls(&self) -> Vec<PathBuf> {
        self.pulls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl IRepositoryManager for FakeRepos {
    async fn is_repo(&self, dir: &Path) -> anyhow::Result<bool> {
        Ok(self.remotes.lock().unwrap().contains_key(dir))
    }

    async fn get_remotes(&self, dir: &Path) -> anyhow::Result<Vec<RepoRemote>> {
        Ok(self.remotes_of(dir))
    }

    async fn clone_repo(
        &self,
        url: &str,
        dest_name: &str,
        parent_dir: &Path,
    ) -> anyhow::Result<()> {
        let dir = parent_dir.join(dest_name);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join("README"), url).await?;
        self.insert(&dir, &[("origin", url)]);
        self.clones.lock().unwrap().push((url.to_string(), dir));
        Ok(())
    }

    async fn add_remote(&self, dir: &Path, name: &str, url: &str) -> anyhow::Result<()> {
        self.remotes
            .lock()
            .unwrap()
            .entry(dir.to_path_buf())
            .or_default()
            .push(RepoRemote {
                name: name.to_string(),
                fetch_url: Some(url.to_string()),
            });
        Ok(())
    }

    async fn remove_remote(&self, dir: &Path, name: &str) -> anyhow::Result<()> {
        if let Some(remotes) = self.remotes.lock().unwrap().get_mut(dir) {
            remotes.retain(|r| r.name != name);
        }
        Ok(())
    }

    async fn pull(&self, dir: &Path) -> anyhow::Result<()> {
        self.pulls.lock().unwrap().push(dir.to_path_buf());
        Ok(())
    }
}

// ============================================================================
// Events
// ============================================================================

/// An event channel whose receiver collects into a `Vec` on demand
pub struct EventLog {
    pub sender: EventSender,
    receiver: mpsc::UnboundedReceiver<MirrorEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self { sender, receiver }
    }

    /// Every event sent so far
    pub fn drain(&mut self) -> Vec<MirrorEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Export policy with documents exported to the given formats only
pub fn doc_policy(formats: &[&str]) -> ExportPolicy {
    let mut overrides = BTreeMap::new();
    overrides.insert(
        DOC_MIME.to_string(),
        formats.iter().map(|f| (*f).to_string()).collect(),
    );
    ExportPolicy::with_overrides(&overrides)
}

/// A fake drive and repository manager mirrored into a temporary output
/// directory, with the listing cache kept in a separate one
pub struct Harness {
    pub drive: Arc<FakeDrive>,
    pub repos: Arc<FakeRepos>,
    pub policy: ExportPolicy,
    out: TempDir,
    state: TempDir,
}

impl Harness {
    pub fn new(drive: FakeDrive) -> Self {
        Self {
            drive: Arc::new(drive),
            repos: Arc::new(FakeRepos::new()),
            policy: doc_policy(&["application/pdf", "text/plain"]),
            out: TempDir::new().unwrap(),
            state: TempDir::new().unwrap(),
        }
    }

    pub fn with_policy(mut self, policy: ExportPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The mirror root
    pub fn root(&self) -> &Path {
        self.out.path()
    }

    pub fn cache_path(&self) -> PathBuf {
        self.state.path().join("drive.cache.jsonl")
    }

    /// Full run settings: fresh walk, no deletion
    pub fn options(&self, workers: usize) -> MirrorOptions {
        MirrorOptions {
            output_dir: self.root().to_path_buf(),
            cache_path: self.cache_path(),
            workers,
            walker: WalkerOptions {
                retry_delay: Duration::ZERO,
                ..WalkerOptions::default()
            },
            use_cache: false,
            delete: false,
        }
    }

    pub fn engine(&self, options: MirrorOptions) -> MirrorEngine {
        MirrorEngine::new(
            self.drive.clone(),
            self.repos.clone(),
            self.policy.clone(),
            options,
        )
    }

    /// Every regular file in the mirror
    pub fn files(&self) -> Vec<String> {
        list_files(self.root())
    }
}

/// Every regular file under `root`, relative and `/`-joined, sorted
pub fn list_files(root: &Path) -> Vec<String> {
    fn visit(root: &Path, dir: &Path, out: &mut Vec<String>) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries {
            let path = entry.unwrap().path();
            if path.is_dir() {
                visit(root, &path, out);
            } else {
                let rel = path.strip_prefix(root).unwrap();
                let parts: Vec<_> = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                out.push(parts.join("/"));
            }
        }
    }
    let mut out = Vec::new();
    visit(root, root, &mut out);
    out.sort();
    out
}
