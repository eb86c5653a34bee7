//! Access token port (driven/secondary port)
//!
//! Interactive OAuth and credential storage live outside drivemirror. The
//! Drive adapter only needs a bearer token per request, which it asks for
//! through [`ITokenProvider`] so an external refresher can rotate it.

/// Port trait supplying OAuth bearer tokens
#[async_trait::async_trait]
pub trait ITokenProvider: Send + Sync {
    /// Returns a currently valid access token
    async fn access_token(&self) -> anyhow::Result<String>;
}
