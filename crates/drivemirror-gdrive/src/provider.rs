//! GoogleDriveService - IDriveService implementation for the Drive v3 API
//!
//! Wraps the [`DriveClient`] and delegates to the listing module to fulfil
//! the [`IDriveService`] port contract.

use anyhow::{Context, Result};
use tracing::debug;

use drivemirror_core::domain::RemoteId;
use drivemirror_core::ports::{ContentStream, IDriveService, ListOutcome, ListRequest};

use crate::client::DriveClient;
use crate::listing;

/// Drive service implementation backed by the Google Drive REST API
#[derive(Clone)]
pub struct GoogleDriveService {
    client: DriveClient,
}

impl GoogleDriveService {
    /// Creates a new `GoogleDriveService` wrapping the given [`DriveClient`]
    pub fn new(client: DriveClient) -> Self {
        Self { client }
    }

    /// Returns the underlying client
    pub fn client(&self) -> &DriveClient {
        &self.client
    }
}

#[async_trait::async_trait]
impl IDriveService for GoogleDriveService {
    async fn list_children_batch(&self, requests: &[ListRequest]) -> Result<Vec<ListOutcome>> {
        debug!(requests = requests.len(), "Submitting listing batch");
        listing::list_children_batch(&self.client, requests)
            .await
            .context("Listing batch failed")
    }

    /// `GET /files/{id}?alt=media`
    async fn download(&self, id: &RemoteId) -> Result<ContentStream> {
        let path = format!("/files/{}", id.as_str());
        self.client
            .stream(&path, &[("alt", "media")])
            .await
            .with_context(|| format!("Download of {id} failed"))
    }

    /// `GET /files/{id}/export?mimeType=<mime>`
    async fn export(&self, id: &RemoteId, mime_type: &str) -> Result<ContentStream> {
        let path = format!("/files/{}/export", id.as_str());
        self.client
            .stream(&path, &[("mimeType", mime_type)])
            .await
            .with_context(|| format!("Export of {id} to {mime_type} failed"))
    }
}
