//! Remote hierarchy nodes
//!
//! A listing page yields [`RemoteEntry`] values: raw metadata with no notion
//! of where they live locally. Once the walker has assigned a parent path and
//! a disambiguation index, an entry becomes a [`RemoteItem`], either a
//! [`RemoteDir`] or a [`RemoteFile`]. Remote files are what the cache stores,
//! one per line.

use serde::{Deserialize, Serialize};

use super::export_policy::{ExportPolicy, FOLDER_MIME_TYPE};
use super::naming::local_name;
use super::newtypes::{Md5Hash, MirrorPath, RemoteId};

/// Suffix marking a raw file as a pointer to a version-control repository
pub const REPOSITORY_POINTER_SUFFIX: &str = ".git.json";

/// Metadata of one child as returned by a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub id: RemoteId,
    /// Raw display name (not sanitized)
    pub name: String,
    pub mime_type: String,
    /// Content checksum, absent for native Google documents
    pub md5: Option<Md5Hash>,
    /// Web view URL
    pub link: Option<String>,
    /// Size in bytes
    pub size: Option<u64>,
    /// Last modification, epoch milliseconds
    pub modified_time: Option<i64>,
}

impl RemoteEntry {
    /// Returns true if this entry is a folder
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }
}

/// A placed node of the remote hierarchy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteItem {
    Dir(RemoteDir),
    File(RemoteFile),
}

impl RemoteItem {
    /// Place an entry under `parent_path` with the given disambiguation index
    #[must_use]
    pub fn from_entry(entry: RemoteEntry, parent_path: MirrorPath, unique_name_index: u32) -> Self {
        if entry.is_dir() {
            Self::Dir(RemoteDir {
                id: entry.id,
                name: entry.name,
                parent_path,
                unique_name_index,
            })
        } else {
            Self::File(RemoteFile {
                id: entry.id,
                name: entry.name,
                mime_type: entry.mime_type,
                md5: entry.md5,
                link: entry.link,
                size: entry.size,
                modified_time: entry.modified_time,
                parent_path,
                unique_name_index,
            })
        }
    }

    /// Local path of this item relative to the mirror root
    #[must_use]
    pub fn path(&self) -> MirrorPath {
        match self {
            Self::Dir(dir) => dir.path(),
            Self::File(file) => file.path(),
        }
    }
}

/// A remote folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDir {
    pub id: RemoteId,
    pub name: String,
    /// Local path of the containing directory (root for top-level items)
    pub parent_path: MirrorPath,
    pub unique_name_index: u32,
}

impl RemoteDir {
    /// The drive root, mirrored at the output directory itself
    #[must_use]
    pub fn root() -> Self {
        Self {
            id: RemoteId::root(),
            name: String::new(),
            parent_path: MirrorPath::root(),
            unique_name_index: 0,
        }
    }

    /// Returns true for the drive root
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.name.is_empty() && self.parent_path.is_root()
    }

    /// Sanitized on-disk name including the disambiguation suffix
    #[must_use]
    pub fn local_name(&self) -> String {
        local_name(&self.name, self.unique_name_index)
    }

    /// Local path relative to the mirror root
    #[must_use]
    pub fn path(&self) -> MirrorPath {
        if self.is_root() {
            MirrorPath::root()
        } else {
            self.parent_path.join_sanitized(&self.local_name())
        }
    }
}

/// How a remote file is backed up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind<'a> {
    /// Opaque bytes, downloaded as-is and verified by checksum
    Raw,
    /// Raw pointer file whose content names a repository to check out
    RepositoryPointer,
    /// Native document exported to each of `formats`
    Exportable { formats: &'a [String] },
    /// Denylisted document type, never backed up
    Unsupported,
}

/// A remote file as stored in the listing cache
///
/// Serialized with camelCase keys, one JSON object per cache line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub id: RemoteId,
    /// Raw display name (not sanitized)
    pub name: String,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5: Option<Md5Hash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Last modification, epoch milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<i64>,
    #[serde(default)]
    pub parent_path: MirrorPath,
    #[serde(default)]
    pub unique_name_index: u32,
}

impl RemoteFile {
    /// Sanitized on-disk name including the disambiguation suffix
    #[must_use]
    pub fn local_name(&self) -> String {
        local_name(&self.name, self.unique_name_index)
    }

    /// Local path relative to the mirror root
    #[must_use]
    pub fn path(&self) -> MirrorPath {
        self.parent_path.join_sanitized(&self.local_name())
    }

    /// Classify this file under an export policy
    #[must_use]
    pub fn kind<'a>(&self, policy: &'a ExportPolicy) -> FileKind<'a> {
        if policy.is_denied(&self.mime_type) {
            return FileKind::Unsupported;
        }
        if let Some(formats) = policy.formats_for(&self.mime_type) {
            return FileKind::Exportable { formats };
        }
        if self.local_name().ends_with(REPOSITORY_POINTER_SUFFIX)
            && self.local_name().len() > REPOSITORY_POINTER_SUFFIX.len()
        {
            return FileKind::RepositoryPointer;
        }
        FileKind::Raw
    }

    /// Returns true for the `config` file of a repository stored directly in
    /// the drive (a `.git` directory somewhere above it)
    ///
    /// Such repositories are mirrored file by file and should be replaced by
    /// a `.git.json` pointer.
    #[must_use]
    pub fn is_unwanted_repository(&self) -> bool {
        self.name == "config" && self.parent_path.segments().any(|s| s == ".git")
    }
}
