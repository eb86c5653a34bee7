//! Drive `files.list` queries
//!
//! Lists the direct, non-trashed children of one folder, one page at a
//! time. The walker in `drivemirror-sync` drives pagination; this module
//! only fetches and parses single pages, and submits a batch of them
//! concurrently.
//!
//! ## Request
//!
//! ```text
//! GET {base}/files?q='<parent>' in parents and trashed = false
//!     &fields=nextPageToken,files(id,name,mimeType,md5Checksum,webViewLink,size,modifiedTime)
//!     &orderBy=folder,name,modifiedTime
//!     &pageSize=<n>[&pageToken=<token>]
//! ```

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Deserialize;
use tracing::{debug, warn};

use drivemirror_core::domain::{Md5Hash, PageToken, RemoteEntry, RemoteId};
use drivemirror_core::ports::{ListOutcome, ListPage, ListRequest};

use crate::client::DriveClient;
use crate::GDriveError;

/// Path of the files collection relative to the API base URL
const FILES_PATH: &str = "/files";

/// Partial response fields requested for every listing
pub const LIST_FIELDS: &str =
    "nextPageToken,files(id,name,mimeType,md5Checksum,webViewLink,size,modifiedTime)";

/// Sort order: folders first, then by name, then by modification time
pub const LIST_ORDER_BY: &str = "folder,name,modifiedTime";

// ============================================================================
// Drive API response types (JSON deserialization)
// ============================================================================

/// Raw response of `files.list`
///
/// See: <https://developers.google.com/drive/api/reference/rest/v3/files/list>
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFileList {
    /// Present when more results remain
    next_page_token: Option<String>,

    /// Children on this page
    #[serde(default)]
    files: Vec<DriveFileResource>,
}

/// A file resource restricted to [`LIST_FIELDS`]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFileResource {
    id: String,

    #[serde(default)]
    name: String,

    #[serde(default)]
    mime_type: String,

    /// Hex MD5 of the content (binary files only)
    md5_checksum: Option<String>,

    web_view_link: Option<String>,

    /// Size in bytes, encoded by Drive as a decimal string
    size: Option<String>,

    modified_time: Option<DateTime<Utc>>,
}

// ============================================================================
// ListingParser - converts Drive API responses to port-level types
// ============================================================================

/// Parser for converting `files.list` responses into [`ListPage`] values
pub struct ListingParser;

impl ListingParser {
    /// Parse a single file resource into a port-level [`RemoteEntry`]
    fn parse_file(file: DriveFileResource) -> Result<RemoteEntry, GDriveError> {
        let id = RemoteId::new(file.id)
            .map_err(|e| GDriveError::InvalidResponse(e.to_string()))?;

        // Drive reports an empty checksum for some shortcuts; treat as absent
        let md5 = file
            .md5_checksum
            .filter(|m| !m.is_empty())
            .map(Md5Hash::new)
            .transpose()
            .map_err(|e| GDriveError::InvalidResponse(e.to_string()))?;

        let size = file
            .size
            .map(|s| {
                s.parse::<u64>()
                    .map_err(|_| GDriveError::InvalidResponse(format!("Invalid size: {s}")))
            })
            .transpose()?;

        Ok(RemoteEntry {
            id,
            name: file.name,
            mime_type: file.mime_type,
            md5,
            link: file.web_view_link,
            size,
            modified_time: file.modified_time.map(|t| t.timestamp_millis()),
        })
    }

    /// Parse a raw JSON body into a [`ListPage`]
    ///
    /// # Errors
    /// Returns `GDriveError::InvalidResponse` if the body is not a file list
    /// or an entry is malformed
    pub fn parse_page(body: &str) -> Result<ListPage, GDriveError> {
        let raw: DriveFileList = serde_json::from_str(body)
            .map_err(|e| GDriveError::InvalidResponse(format!("files.list: {e}")))?;

        let entries = raw
            .files
            .into_iter()
            .map(Self::parse_file)
            .collect::<Result<Vec<_>, _>>()?;

        let next_page_token = raw.next_page_token.and_then(|t| PageToken::new(t).ok());

        Ok(ListPage {
            entries,
            next_page_token,
        })
    }

    /// The `q` expression selecting the non-trashed children of `parent`
    pub fn children_query(parent: &RemoteId) -> String {
        format!("'{}' in parents and trashed = false", parent.as_str())
    }
}

// ============================================================================
// Listing functions
// ============================================================================

/// Fetches one page of children
///
/// # Errors
///
/// Returns the classified status error, `GDriveError::Network` if the
/// request could not be sent, or `GDriveError::InvalidResponse` if the body
/// cannot be parsed.
pub async fn list_children(
    client: &DriveClient,
    request: &ListRequest,
) -> Result<ListPage, GDriveError> {
    let q = ListingParser::children_query(&request.parent_id);
    let page_size = request.page_size.to_string();

    let mut query: Vec<(&str, &str)> = vec![
        ("q", q.as_str()),
        ("fields", LIST_FIELDS),
        ("orderBy", LIST_ORDER_BY),
        ("pageSize", page_size.as_str()),
    ];
    if let Some(token) = &request.page_token {
        query.push(("pageToken", token.as_str()));
    }

    let body = client
        .get_within(FILES_PATH, &query, client.list_timeout())
        .await?
        .text()
        .await?;
    let page = ListingParser::parse_page(&body)?;

    debug!(
        parent = %request.parent_id,
        entries = page.entries.len(),
        has_next = page.next_page_token.is_some(),
        "Listed folder page"
    );
    Ok(page)
}

/// Fetches several pages concurrently
///
/// Status failures are reported per request as [`ListOutcome::Failed`] and
/// network failures as [`ListOutcome::Interrupted`], so one dropped
/// connection only affects its own request. A missing token or an
/// unparsable body fails the whole batch.
///
/// # Errors
///
/// Returns the first such error encountered, in request order.
pub async fn list_children_batch(
    client: &DriveClient,
    requests: &[ListRequest],
) -> Result<Vec<ListOutcome>, GDriveError> {
    let results = join_all(requests.iter().map(|r| list_children(client, r))).await;

    let mut outcomes = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Ok(page) => outcomes.push(ListOutcome::Page(page)),
            Err(GDriveError::Network(e)) => {
                warn!(error = %e, "Listing request interrupted");
                outcomes.push(ListOutcome::Interrupted {
                    message: e.to_string(),
                });
            }
            Err(e) => match e.status() {
                Some(status) => outcomes.push(ListOutcome::Failed {
                    status,
                    message: e.message(),
                }),
                None => return Err(e),
            },
        }
    }
    Ok(outcomes)
}
