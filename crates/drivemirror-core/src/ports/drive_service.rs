//! Drive service port (driven/secondary port)
//!
//! This module defines the interface the mirror uses to read the remote
//! hierarchy and fetch file content. The production implementation targets
//! the Google Drive v3 REST API.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are adapter-specific
//!   and don't need domain-level classification.
//! - Listing is batched: one call carries many folder listings and reports
//!   an outcome per listing, so one throttled folder does not fail the rest.
//! - Content is streamed as chunks; callers decide where the bytes go.

use std::fmt;

use futures_util::stream::BoxStream;

use crate::domain::newtypes::{PageToken, RemoteId};
use crate::domain::remote_item::RemoteEntry;

// ============================================================================
// Listing
// ============================================================================

/// One folder listing request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    /// Folder whose direct, non-trashed children are listed
    pub parent_id: RemoteId,
    /// Continuation token from a previous page of the same folder
    pub page_token: Option<PageToken>,
    /// Maximum number of children to return
    pub page_size: u32,
}

/// One page of children
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    /// Children in remote sort order (folders first, then by name)
    pub entries: Vec<RemoteEntry>,
    /// Present when more children remain
    pub next_page_token: Option<PageToken>,
}

/// Result of one listing request within a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListOutcome {
    /// The page was returned
    Page(ListPage),
    /// The service answered with a non-success status
    Failed { status: u16, message: String },
    /// The request got no answer (connection dropped, reset or timed out)
    ///
    /// Always worth retrying; only this request is affected.
    Interrupted { message: String },
}

// ============================================================================
// Content
// ============================================================================

/// A stream of file bytes with an optional advertised length
pub struct ContentStream {
    /// Total length if the service announced one
    pub content_length: Option<u64>,
    /// Byte chunks in order
    pub chunks: BoxStream<'static, anyhow::Result<Vec<u8>>>,
}

impl fmt::Debug for ContentStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentStream")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

impl ContentStream {
    /// A stream over an in-memory buffer, emitted as a single chunk
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let len = bytes.len() as u64;
        Self {
            content_length: Some(len),
            chunks: Box::pin(futures_util::stream::once(async move { Ok(bytes) })),
        }
    }
}

// ============================================================================
// IDriveService trait
// ============================================================================

/// Port trait for remote drive operations
///
/// ## Implementation Notes
///
/// - `list_children_batch` must return exactly one outcome per request, in
///   request order. Per-request HTTP failures are reported as
///   [`ListOutcome::Failed`], per-request transport failures as
///   [`ListOutcome::Interrupted`]; an `Err` means the batch as a whole could
///   not be submitted.
/// - Implementations do not retry; the walker owns retry policy.
#[async_trait::async_trait]
pub trait IDriveService: Send + Sync {
    /// Lists the children of several folders at once
    ///
    /// # Arguments
    /// * `requests` - One entry per folder page to fetch
    ///
    /// # Returns
    /// One outcome per request, in the same order
    async fn list_children_batch(&self, requests: &[ListRequest])
        -> anyhow::Result<Vec<ListOutcome>>;

    /// Downloads the raw bytes of a file
    ///
    /// # Arguments
    /// * `id` - The file to download
    async fn download(&self, id: &RemoteId) -> anyhow::Result<ContentStream>;

    /// Exports a native document to the given format
    ///
    /// # Arguments
    /// * `id` - The document to export
    /// * `mime_type` - Target export format
    async fn export(&self, id: &RemoteId, mime_type: &str) -> anyhow::Result<ContentStream>;
}
