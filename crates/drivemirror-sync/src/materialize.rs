//! Variant materialization
//!
//! Turns one [`BackupVariant`] into bytes on disk: downloads raw content,
//! exports native documents, renders redirect pages and keeps repository
//! working copies up to date.

use std::path::Path;
use std::sync::Arc;

use drivemirror_core::domain::{BackupVariant, VariantKind};
use drivemirror_core::ports::{IDriveService, IRepositoryManager};
use serde::Deserialize;
use tracing::{debug, info};

use crate::decision::content_is_stale;
use crate::filesystem::{exists, write_bytes, write_stream};
use crate::redirect;
use crate::SyncError;

/// Name of the only remote a mirrored working copy may have
pub const ORIGIN: &str = "origin";

/// Content of a `.git.json` pointer file
#[derive(Debug, Deserialize)]
struct RepositoryPointer {
    url: String,
}

/// Writes variants to disk
#[derive(Clone)]
pub struct Materializer {
    drive: Arc<dyn IDriveService>,
    repos: Arc<dyn IRepositoryManager>,
}

impl Materializer {
    /// Creates a materializer over the given drive and repository ports
    pub fn new(drive: Arc<dyn IDriveService>, repos: Arc<dyn IRepositoryManager>) -> Self {
        Self { drive, repos }
    }

    /// Materializes one variant
    ///
    /// `progress` receives `0.0` first and `1.0` once the variant is in
    /// place. Raw content with a known size also reports the fraction of
    /// bytes written in between.
    ///
    /// # Errors
    ///
    /// Any failure of this variant; the caller decides whether to go on
    /// with the record's remaining variants.
    pub async fn materialize<F>(&self, variant: &BackupVariant, mut progress: F) -> Result<(), SyncError>
    where
        F: FnMut(f64) + Send,
    {
        progress(0.0);
        match &variant.kind {
            VariantKind::Content => self.download(variant, &mut progress).await?,
            VariantKind::Export { mime_type } => {
                let content = self
                    .drive
                    .export(&variant.source.id, mime_type)
                    .await
                    .map_err(SyncError::Remote)?;
                write_stream(&variant.local_file_path, content, |_| {}).await?;
            }
            VariantKind::Redirect => {
                let html = redirect::render(&variant.source);
                write_bytes(&variant.local_file_path, html.into_bytes()).await?;
            }
            VariantKind::RepositoryLink { repo_dir } => {
                self.link_repository(variant, repo_dir, &mut progress).await?;
            }
        }
        progress(1.0);
        Ok(())
    }

    async fn download<F>(&self, variant: &BackupVariant, progress: &mut F) -> Result<(), SyncError>
    where
        F: FnMut(f64) + Send,
    {
        let content = self
            .drive
            .download(&variant.source.id)
            .await
            .map_err(SyncError::Remote)?;

        let size = variant.source.size.unwrap_or(0);
        let by_bytes = variant.reports_byte_progress();
        write_stream(&variant.local_file_path, content, |written| {
            if by_bytes {
                progress((written as f64 / size as f64).min(1.0));
            }
        })
        .await?;
        Ok(())
    }

    async fn link_repository<F>(
        &self,
        variant: &BackupVariant,
        repo_dir: &Path,
        progress: &mut F,
    ) -> Result<(), SyncError>
    where
        F: FnMut(f64) + Send,
    {
        let pointer_path = &variant.local_file_path;
        if content_is_stale(variant.source.md5.as_ref(), pointer_path).await {
            self.download(variant, progress).await?;
        }

        let raw = tokio::fs::read_to_string(pointer_path)
            .await
            .map_err(|e| SyncError::io(pointer_path, e))?;
        let url = parse_pointer(&raw).map_err(|message| SyncError::InvalidPointer {
            path: pointer_path.clone(),
            message,
        })?;

        let invariant = |message: String| SyncError::RepositoryInvariant {
            path: repo_dir.to_path_buf(),
            message,
        };

        if !exists(repo_dir).await {
            let dest_name = repo_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| invariant("working copy has no directory name".to_string()))?;
            info!(repo = %repo_dir.display(), url = %url, "Cloning repository");
            self.repos
                .clone_repo(&url, &dest_name, &variant.local_dir_path)
                .await
                .map_err(SyncError::Repository)?;
            return Ok(());
        }

        if !self.repos.is_repo(repo_dir).await.map_err(SyncError::Repository)? {
            return Err(invariant("does not seem to be a repository".to_string()));
        }

        let remotes = self
            .repos
            .get_remotes(repo_dir)
            .await
            .map_err(SyncError::Repository)?;
        let [remote] = remotes.as_slice() else {
            return Err(invariant(format!(
                "expected exactly one remote, found {}",
                remotes.len()
            )));
        };
        if remote.name != ORIGIN {
            return Err(invariant(format!(
                "the only remote is {:?}, not {ORIGIN:?}",
                remote.name
            )));
        }
        let Some(fetch_url) = &remote.fetch_url else {
            return Err(invariant(format!("remote {ORIGIN:?} has no fetch URL")));
        };

        if *fetch_url != url {
            debug!(repo = %repo_dir.display(), old = %fetch_url, new = %url, "Replacing origin");
            self.repos
                .remove_remote(repo_dir, ORIGIN)
                .await
                .map_err(SyncError::Repository)?;
            self.repos
                .add_remote(repo_dir, ORIGIN, &url)
                .await
                .map_err(SyncError::Repository)?;
        }

        self.repos
            .pull(repo_dir)
            .await
            .map_err(SyncError::Repository)?;
        Ok(())
    }
}

/// Extracts the repository URL from a pointer file
fn parse_pointer(raw: &str) -> Result<String, String> {
    let pointer: RepositoryPointer = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    if pointer.url.trim().is_empty() {
        return Err("empty url".to_string());
    }
    Ok(pointer.url)
}
