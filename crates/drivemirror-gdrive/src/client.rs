//! Google Drive API client
//!
//! Provides a typed HTTP client for the Drive v3 REST API. Handles
//! authentication headers, error body parsing and streamed content.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use drivemirror_gdrive::{DriveClient, StaticTokenProvider};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = DriveClient::new(Arc::new(StaticTokenProvider::new("ya29.token")));
//! let content = client.stream("/files/1A2b3C/export", &[("mimeType", "application/pdf")]).await?;
//! println!("{:?} bytes", content.content_length);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use drivemirror_core::ports::{ContentStream, ITokenProvider};
use futures_util::TryStreamExt;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::GDriveError;

/// Base URL for the Google Drive API v3
pub const DRIVE_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

// ============================================================================
// Error body
// ============================================================================

/// Error envelope returned by Google APIs
///
/// `{"error": {"code": 403, "message": "Rate Limit Exceeded", ...}}`
#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[allow(dead_code)]
    code: Option<u16>,
    message: Option<String>,
}

/// Extracts a human-readable message from an error response body
///
/// Falls back to the raw body, then to the canonical reason phrase.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ApiErrorEnvelope>(body) {
        if let Some(message) = envelope.error.message.filter(|m| !m.is_empty()) {
            return message;
        }
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("unknown error")
        .to_string()
}

// ============================================================================
// DriveClient
// ============================================================================

/// HTTP client for Google Drive API calls
///
/// Wraps `reqwest::Client` with a token provider and base URL construction.
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone)]
pub struct DriveClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for API requests
    base_url: String,
    /// Source of bearer tokens
    tokens: Arc<dyn ITokenProvider>,
    /// Upper bound for one listing request, body included
    list_timeout: Option<Duration>,
}

impl DriveClient {
    /// Creates a client for the public Drive endpoint
    ///
    /// # Arguments
    /// * `tokens` - Provider consulted for a bearer token on every request
    pub fn new(tokens: Arc<dyn ITokenProvider>) -> Self {
        Self::with_base_url(tokens, DRIVE_BASE_URL)
    }

    /// Creates a client with a custom base URL (useful for testing)
    ///
    /// # Arguments
    /// * `tokens` - Provider consulted for a bearer token on every request
    /// * `base_url` - Custom base URL for API requests
    pub fn with_base_url(tokens: Arc<dyn ITokenProvider>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
            tokens,
            list_timeout: None,
        }
    }

    /// Bounds how long a single listing request may take
    ///
    /// A listing that exceeds it fails like a dropped connection. Content
    /// downloads are not bounded.
    pub fn with_list_timeout(mut self, timeout: Duration) -> Self {
        self.list_timeout = Some(timeout);
        self
    }

    /// The listing timeout, if any
    pub fn list_timeout(&self) -> Option<Duration> {
        self.list_timeout
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Creates an authenticated request builder for the given method and path
    ///
    /// Automatically prepends the base URL and adds the Authorization header.
    ///
    /// # Arguments
    /// * `method` - HTTP method
    /// * `path` - API path relative to base URL (e.g., "/files")
    ///
    /// # Errors
    /// Returns `GDriveError::Token` if no access token is available
    pub async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, GDriveError> {
        let token = self
            .tokens
            .access_token()
            .await
            .map_err(|e| GDriveError::Token(format!("{e:#}")))?;
        let url = format!("{}{}", self.base_url, path);
        Ok(self.client.request(method, url).bearer_auth(token))
    }

    /// Sends a GET request and returns the response if it succeeded
    ///
    /// # Errors
    /// Returns the classified [`GDriveError`] for a non-success status, or
    /// `GDriveError::Network` if the request could not be sent
    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Response, GDriveError> {
        self.get_within(path, query, None).await
    }

    /// Like [`get`](Self::get), giving up after `timeout` when one is set
    ///
    /// The timeout also covers reading the response body.
    ///
    /// # Errors
    /// Same as [`get`](Self::get); an elapsed timeout is a
    /// `GDriveError::Network`
    pub async fn get_within(
        &self,
        path: &str,
        query: &[(&str, &str)],
        timeout: Option<Duration>,
    ) -> Result<Response, GDriveError> {
        let mut request = self.request(Method::GET, path).await?.query(query);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await?;
        check_status(response).await
    }

    /// Issues a GET for file content and returns it as a chunk stream
    ///
    /// # Arguments
    /// * `path` - API path, e.g. `/files/{id}` or `/files/{id}/export`
    /// * `query` - Query parameters, e.g. `alt=media`
    pub async fn stream(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<ContentStream, GDriveError> {
        let response = self.get(path, query).await?;
        let content_length = response.content_length();
        debug!(path, ?content_length, "Content stream opened");

        let chunks = response
            .bytes_stream()
            .map_ok(|bytes| bytes.to_vec())
            .map_err(anyhow::Error::from);

        Ok(ContentStream {
            content_length,
            chunks: Box::pin(chunks),
        })
    }
}

/// Maps a non-success response to a [`GDriveError`], consuming the body
async fn check_status(response: Response) -> Result<Response, GDriveError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().path().to_string();
    let body = response.text().await.unwrap_or_default();
    let message = error_message(status, &body);
    warn!(status = status.as_u16(), path = %url, message = %message, "Drive API error");
    Err(GDriveError::from_status(status.as_u16(), message))
}
