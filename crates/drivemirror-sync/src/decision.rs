//! Backup decision engine
//!
//! Derives the local artifacts ([`BackupVariant`]s) of a remote file and
//! decides whether any of them is stale. Nothing here writes to disk.
//!
//! | kind | variants | stale when |
//! |---|---|---|
//! | raw | content | no remote md5, local file missing or md5 differs |
//! | repository pointer | pointer + working copy | pointer stale as raw, or working copy missing |
//! | exportable | one export per format, then the redirect page | no modification time, any artifact missing, or the page records another time |
//! | unsupported | none | never |

use std::path::Path;

use drivemirror_core::domain::{
    BackupVariant, ExportPolicy, FileKind, Md5Hash, MirrorPath, RemoteFile, VariantKind,
    VariantSource, REPOSITORY_POINTER_SUFFIX,
};
use tracing::debug;

use crate::filesystem::{exists, file_md5};
use crate::redirect::recorded_modified_time;

/// Extension of the redirect page appended to the document's local path
pub const REDIRECT_EXTENSION: &str = ".html";

/// Infix between a document's local name and its export extension
pub const EXPORT_INFIX: &str = ".bak";

/// Every local artifact of `file`, in materialization order
///
/// Exports come before the redirect page so the page, which marks the
/// document as fresh, is only written once all exports are in place.
#[must_use]
pub fn variants_for(file: &RemoteFile, root: &Path, policy: &ExportPolicy) -> Vec<BackupVariant> {
    let local_dir_path = file.parent_path.to_local(root);
    let source = VariantSource {
        id: file.id.clone(),
        md5: file.md5.clone(),
        link: file.link.clone(),
        size: file.size,
        modified_time: file.modified_time,
        name: file.local_name(),
    };

    let variant = |kind: VariantKind, relative_path: MirrorPath| BackupVariant {
        source: source.clone(),
        kind,
        local_file_path: relative_path.to_local(root),
        local_dir_path: local_dir_path.clone(),
        relative_path,
    };

    match file.kind(policy) {
        FileKind::Unsupported => Vec::new(),
        FileKind::Raw => vec![variant(VariantKind::Content, file.path())],
        FileKind::RepositoryPointer => {
            let name = file.local_name();
            let repo_name = name
                .strip_suffix(REPOSITORY_POINTER_SUFFIX)
                .unwrap_or(name.as_str());
            let repo_dir = local_dir_path.join(repo_name);
            vec![variant(VariantKind::RepositoryLink { repo_dir }, file.path())]
        }
        FileKind::Exportable { formats } => {
            let path = file.path();
            let mut variants: Vec<BackupVariant> = formats
                .iter()
                .map(|format| {
                    let suffix = format!("{EXPORT_INFIX}{}", policy.extension_for(format));
                    variant(
                        VariantKind::Export {
                            mime_type: format.clone(),
                        },
                        path.with_suffix(&suffix),
                    )
                })
                .collect();
            variants.push(variant(
                VariantKind::Redirect,
                path.with_suffix(REDIRECT_EXTENSION),
            ));
            variants
        }
    }
}

/// Returns true if any local artifact of `file` must be (re)materialized
pub async fn needs_backup(file: &RemoteFile, root: &Path, policy: &ExportPolicy) -> bool {
    let stale = match file.kind(policy) {
        FileKind::Unsupported => false,
        FileKind::Raw => content_is_stale(file.md5.as_ref(), &file.path().to_local(root)).await,
        FileKind::RepositoryPointer => {
            let variants = variants_for(file, root, policy);
            let mut stale = content_is_stale(file.md5.as_ref(), &file.path().to_local(root)).await;
            for v in &variants {
                if let VariantKind::RepositoryLink { repo_dir } = &v.kind {
                    stale = stale || !exists(repo_dir).await;
                }
            }
            stale
        }
        FileKind::Exportable { .. } => export_is_stale(file, root, policy).await,
    };
    debug!(path = %file.path(), stale, "Backup decision");
    stale
}

/// Raw content is stale unless a local copy with the remote md5 exists
///
/// Read errors count as stale.
pub async fn content_is_stale(remote_md5: Option<&Md5Hash>, local: &Path) -> bool {
    let Some(remote_md5) = remote_md5 else {
        return true;
    };
    match file_md5(local).await {
        Ok(local_md5) => !remote_md5.matches(local_md5.as_str()),
        Err(_) => true,
    }
}

async fn export_is_stale(file: &RemoteFile, root: &Path, policy: &ExportPolicy) -> bool {
    let Some(remote_time) = file.modified_time else {
        return true;
    };

    let mut marker = None;
    for variant in variants_for(file, root, policy) {
        if !exists(&variant.local_file_path).await {
            return true;
        }
        if variant.kind == VariantKind::Redirect {
            marker = Some(variant.local_file_path);
        }
    }
    let Some(marker) = marker else {
        return true;
    };

    match tokio::fs::read_to_string(&marker).await {
        Ok(html) => recorded_modified_time(&html) != Some(remote_time),
        Err(_) => true,
    }
}
