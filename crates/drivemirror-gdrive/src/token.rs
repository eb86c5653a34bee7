//! Access token providers
//!
//! drivemirror does not run the OAuth consent flow itself. A token is
//! either handed over directly ([`StaticTokenProvider`]) or read from an
//! environment variable on every request ([`EnvTokenProvider`]), which lets
//! an external helper keep it fresh.

use anyhow::{bail, Result};
use drivemirror_core::ports::ITokenProvider;

/// A fixed token, e.g. from the command line or a test
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    /// Wraps the given token
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("token", &"<redacted>")
            .finish()
    }
}

#[async_trait::async_trait]
impl ITokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

/// Reads the token from an environment variable on each call
#[derive(Debug, Clone)]
pub struct EnvTokenProvider {
    var: String,
}

impl EnvTokenProvider {
    /// Reads from the variable named `var`
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    /// Name of the variable consulted
    pub fn var(&self) -> &str {
        &self.var
    }
}

#[async_trait::async_trait]
impl ITokenProvider for EnvTokenProvider {
    async fn access_token(&self) -> Result<String> {
        match std::env::var(&self.var) {
            Ok(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
            Ok(_) => bail!("Environment variable {} is empty", self.var),
            Err(_) => bail!(
                "No access token: set {} to a Google OAuth access token",
                self.var
            ),
        }
    }
}
