//! Subcommands of the `drivemirror` binary

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use drivemirror_core::config::Config;
use drivemirror_core::domain::ExportPolicy;
use drivemirror_gdrive::{DriveClient, EnvTokenProvider, GoogleDriveService};
use drivemirror_sync::{GitCli, MirrorEngine, MirrorOptions};
use tracing::info;

use crate::output::OutputFormat;

pub mod config;
pub mod mirror;
pub mod sync;

/// Settings shared by every subcommand
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub format: OutputFormat,
    pub quiet: bool,
    /// Configuration file in use
    pub config_path: PathBuf,
    /// True if the path was given with `--config`
    pub explicit_config: bool,
}

impl CommandContext {
    /// Loads the configuration for a run
    ///
    /// A missing default file means defaults; a file named with `--config`
    /// must exist and parse.
    pub fn load_config(&self) -> Result<Config> {
        let config = if self.explicit_config || self.config_path.exists() {
            Config::load(&self.config_path).with_context(|| {
                format!("Failed to load configuration from {}", self.config_path.display())
            })?
        } else {
            Config::default()
        };
        info!(config_path = %self.config_path.display(), "Loaded configuration");
        Ok(config)
    }
}

/// Rejects a configuration with validation errors
pub fn ensure_valid(config: &Config) -> Result<()> {
    let errors = config.validate();
    if errors.is_empty() {
        return Ok(());
    }
    let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
    bail!("Invalid configuration: {}", messages.join("; "))
}

/// Wires the Google Drive adapter, the git adapter and the export policy
/// into an engine
pub fn build_engine(config: &Config, options: MirrorOptions) -> MirrorEngine {
    let tokens = Arc::new(EnvTokenProvider::new(&config.drive.token_env));
    let client = DriveClient::with_base_url(tokens, &config.drive.base_url)
        .with_list_timeout(Duration::from_secs(config.drive.list_timeout_secs));
    let drive = Arc::new(GoogleDriveService::new(client));
    let policy = ExportPolicy::with_overrides(&config.export.formats);
    MirrorEngine::new(drive, Arc::new(GitCli::new()), policy, options)
}

/// `1.2s` or `350ms`
pub fn format_duration(duration_ms: u64) -> String {
    if duration_ms >= 1000 {
        format!("{:.1}s", duration_ms as f64 / 1000.0)
    } else {
        format!("{duration_ms}ms")
    }
}

/// `""` for one, `"s"` otherwise
pub fn plural(n: u64) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
