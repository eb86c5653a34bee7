//! Backup variants
//!
//! A [`BackupVariant`] is one concrete local artifact derived from a remote
//! file: the raw bytes, one export per format, the redirect page, or a
//! repository pointer with its working copy.

use std::path::PathBuf;

use super::newtypes::{Md5Hash, MirrorPath, RemoteId};

/// The remote file a variant was derived from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantSource {
    pub id: RemoteId,
    pub md5: Option<Md5Hash>,
    pub link: Option<String>,
    pub size: Option<u64>,
    /// Epoch milliseconds
    pub modified_time: Option<i64>,
    /// Sanitized name of the remote file
    pub name: String,
}

/// What a variant materializes and how
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantKind {
    /// Raw copy of the file bytes
    Content,
    /// Export of a native document to `mime_type`
    Export { mime_type: String },
    /// HTML page pointing at the document's web view
    Redirect,
    /// Raw pointer file plus a working copy checked out at `repo_dir`
    RepositoryLink { repo_dir: PathBuf },
}

/// One local artifact to materialize
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupVariant {
    pub source: VariantSource,
    pub kind: VariantKind,
    /// Path of the artifact relative to the mirror root
    pub relative_path: MirrorPath,
    /// Absolute directory the artifact lives in
    pub local_dir_path: PathBuf,
    /// Absolute path of the artifact
    pub local_file_path: PathBuf,
}

impl BackupVariant {
    /// Export format, if this variant is an export
    #[must_use]
    pub fn export_format(&self) -> Option<&str> {
        match &self.kind {
            VariantKind::Export { mime_type } => Some(mime_type),
            _ => None,
        }
    }

    /// Returns true if progress can be reported as a fraction of the size
    ///
    /// Only raw content with a known size qualifies; exports have no
    /// advertised length.
    #[must_use]
    pub fn reports_byte_progress(&self) -> bool {
        matches!(
            self.kind,
            VariantKind::Content | VariantKind::RepositoryLink { .. }
        ) && self.source.size.is_some_and(|s| s > 0)
    }

    /// Every local path this variant may legitimately occupy
    ///
    /// The artifact itself, plus the working copy directory for repository
    /// links.
    #[must_use]
    pub fn used_paths(&self) -> Vec<UsedPath> {
        let mut paths = vec![UsedPath::File(self.local_file_path.clone())];
        if let VariantKind::RepositoryLink { repo_dir } = &self.kind {
            paths.push(UsedPath::Tree(repo_dir.clone()));
        }
        paths
    }
}

/// A path the download pass determined should exist
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UsedPath {
    /// A single file
    File(PathBuf),
    /// A directory kept with everything beneath it
    Tree(PathBuf),
}

impl UsedPath {
    /// The underlying path
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::File(p) | Self::Tree(p) => p,
        }
    }
}
