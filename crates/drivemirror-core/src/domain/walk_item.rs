//! Pending listing work

use super::newtypes::{MirrorPath, PageToken, RemoteId};
use super::remote_item::RemoteDir;

/// One unit of pending listing work: a folder, where to resume listing it,
/// and how many times that listing has already failed transiently
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkItem {
    /// Folder being listed; `None` for the drive root
    pub parent: Option<RemoteDir>,
    pub page_token: Option<PageToken>,
    pub retry_count: u32,
}

impl WalkItem {
    /// The first listing of the drive root
    #[must_use]
    pub fn root() -> Self {
        Self {
            parent: None,
            page_token: None,
            retry_count: 0,
        }
    }

    /// The first listing of a newly discovered folder
    #[must_use]
    pub fn for_dir(dir: RemoteDir) -> Self {
        Self {
            parent: Some(dir),
            page_token: None,
            retry_count: 0,
        }
    }

    /// The next page of the same folder; the retry count starts over
    #[must_use]
    pub fn continuation(&self, token: PageToken) -> Self {
        Self {
            parent: self.parent.clone(),
            page_token: Some(token),
            retry_count: 0,
        }
    }

    /// The same listing again after a transient failure
    #[must_use]
    pub fn retried(self) -> Self {
        Self {
            retry_count: self.retry_count + 1,
            ..self
        }
    }

    /// Returns true if this item is being re-issued after a failure
    #[must_use]
    pub fn is_retry(&self) -> bool {
        self.retry_count > 0
    }

    /// Remote ID of the folder being listed
    #[must_use]
    pub fn parent_id(&self) -> RemoteId {
        self.parent
            .as_ref()
            .map_or_else(RemoteId::root, |dir| dir.id.clone())
    }

    /// Local path of the folder being listed
    #[must_use]
    pub fn parent_path(&self) -> MirrorPath {
        self.parent
            .as_ref()
            .map_or_else(MirrorPath::root, RemoteDir::path)
    }
}
