//! Repository manager port (driven/secondary port)
//!
//! `.git.json` pointer files name a repository whose working copy is
//! checked out next to the pointer. This port hides the version-control
//! tool behind the handful of operations the mirror needs.

use std::path::Path;

/// A configured remote of a working copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRemote {
    pub name: String,
    /// Fetch URL, if one is configured
    pub fetch_url: Option<String>,
}

/// Port trait for working copy management
#[async_trait::async_trait]
pub trait IRepositoryManager: Send + Sync {
    /// Returns true if `dir` is inside a working copy
    async fn is_repo(&self, dir: &Path) -> anyhow::Result<bool>;

    /// Lists the remotes configured for the working copy at `dir`
    async fn get_remotes(&self, dir: &Path) -> anyhow::Result<Vec<RepoRemote>>;

    /// Clones `url` into `parent_dir/dest_name`
    async fn clone_repo(&self, url: &str, dest_name: &str, parent_dir: &Path)
        -> anyhow::Result<()>;

    /// Adds a remote to the working copy at `dir`
    async fn add_remote(&self, dir: &Path, name: &str, url: &str) -> anyhow::Result<()>;

    /// Removes a remote from the working copy at `dir`
    async fn remove_remote(&self, dir: &Path, name: &str) -> anyhow::Result<()>;

    /// Pulls the current branch of the working copy at `dir`
    async fn pull(&self, dir: &Path) -> anyhow::Result<()>;
}
