//! Configuration module for drivemirror.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for drivemirror.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mirror: MirrorConfig,
    pub walker: WalkerConfig,
    pub drive: DriveConfig,
    pub export: ExportConfig,
    pub logging: LoggingConfig,
}

/// Local mirror settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Root directory of the local mirror.
    pub output_dir: PathBuf,
    /// Location of the line-delimited listing cache.
    pub cache_path: PathBuf,
    /// Number of concurrent download workers.
    pub workers: usize,
}

/// Remote tree walker settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkerConfig {
    /// Listing requests submitted together in one batch.
    pub batch_size: usize,
    /// Entries requested per listing page.
    pub page_size: u32,
    /// Delay before a batch that contains retried items, in milliseconds.
    pub retry_delay_ms: u64,
    /// Retries allowed per listing item before the walk is aborted.
    pub max_retries: u32,
}

/// Google Drive API settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Base URL of the Drive v3 API.
    pub base_url: String,
    /// Environment variable holding the OAuth access token.
    pub token_env: String,
    /// Seconds a single listing request may take before it is retried.
    pub list_timeout_secs: u64,
}

/// Export format overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Document MIME type to the export MIME types to produce for it.
    ///
    /// An entry replaces the built-in list for that document type; an empty
    /// list disables exports for it (only the redirect page is kept).
    pub formats: BTreeMap<String, Vec<String>>,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/drivemirror/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("drivemirror")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Default Drive v3 endpoint.
pub const DEFAULT_DRIVE_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

/// Default environment variable carrying the access token.
pub const DEFAULT_TOKEN_ENV: &str = "DRIVEMIRROR_ACCESS_TOKEN";

impl Default for MirrorConfig {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("~/.cache"))
            .join("drivemirror");
        Self {
            output_dir: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("~"))
                .join("GoogleDriveBackup"),
            cache_path: cache_dir.join("drive.cache.jsonl"),
            workers: 3,
        }
    }
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            page_size: 1000,
            retry_delay_ms: 1000,
            max_retries: 20,
        }
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_DRIVE_BASE_URL.to_string(),
            token_env: DEFAULT_TOKEN_ENV.to_string(),
            list_timeout_secs: 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"walker.batch_size"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Upper bound for `walker.batch_size`.
const MAX_BATCH_SIZE: usize = 1000;

/// Upper bound for `walker.page_size` (Drive caps `pageSize` at 1000).
const MAX_PAGE_SIZE: u32 = 1000;

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- mirror ---
        if self.mirror.workers == 0 {
            errors.push(ValidationError {
                field: "mirror.workers".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.mirror.cache_path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "mirror.cache_path".into(),
                message: "must not be empty".into(),
            });
        }

        // --- walker ---
        if self.walker.batch_size == 0 || self.walker.batch_size > MAX_BATCH_SIZE {
            errors.push(ValidationError {
                field: "walker.batch_size".into(),
                message: format!("must be in range 1..={MAX_BATCH_SIZE}"),
            });
        }
        if self.walker.page_size == 0 || self.walker.page_size > MAX_PAGE_SIZE {
            errors.push(ValidationError {
                field: "walker.page_size".into(),
                message: format!("must be in range 1..={MAX_PAGE_SIZE}"),
            });
        }

        // --- drive ---
        if url::Url::parse(&self.drive.base_url).is_err() {
            errors.push(ValidationError {
                field: "drive.base_url".into(),
                message: format!("not a valid URL: '{}'", self.drive.base_url),
            });
        }
        if self.drive.token_env.trim().is_empty() {
            errors.push(ValidationError {
                field: "drive.token_env".into(),
                message: "must not be empty".into(),
            });
        }
        if self.drive.list_timeout_secs == 0 {
            errors.push(ValidationError {
                field: "drive.list_timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- export ---
        for (doc_mime, formats) in &self.export.formats {
            if !doc_mime.starts_with("application/vnd.google-apps.") {
                errors.push(ValidationError {
                    field: format!("export.formats.{doc_mime}"),
                    message: "only Google document types can be exported".into(),
                });
            }
            if let Some(bad) = formats.iter().find(|f| !f.contains('/')) {
                errors.push(ValidationError {
                    field: format!("export.formats.{doc_mime}"),
                    message: format!("invalid export MIME type '{bad}'"),
                });
            }
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use drivemirror_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .output_dir(PathBuf::from("/srv/backup/drive"))
///     .workers(6)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- mirror ---

    pub fn output_dir(mut self, dir: PathBuf) -> Self {
        self.config.mirror.output_dir = dir;
        self
    }

    pub fn cache_path(mut self, path: PathBuf) -> Self {
        self.config.mirror.cache_path = path;
        self
    }

    pub fn workers(mut self, n: usize) -> Self {
        self.config.mirror.workers = n;
        self
    }

    // --- walker ---

    pub fn batch_size(mut self, n: usize) -> Self {
        self.config.walker.batch_size = n;
        self
    }

    pub fn page_size(mut self, n: u32) -> Self {
        self.config.walker.page_size = n;
        self
    }

    pub fn retry_delay_ms(mut self, ms: u64) -> Self {
        self.config.walker.retry_delay_ms = ms;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.walker.max_retries = n;
        self
    }

    // --- drive ---

    pub fn drive_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.drive.base_url = url.into();
        self
    }

    pub fn drive_token_env(mut self, var: impl Into<String>) -> Self {
        self.config.drive.token_env = var.into();
        self
    }

    pub fn list_timeout_secs(mut self, secs: u64) -> Self {
        self.config.drive.list_timeout_secs = secs;
        self
    }

    // --- export ---

    pub fn export_formats(mut self, doc_mime: impl Into<String>, formats: Vec<String>) -> Self {
        self.config.export.formats.insert(doc_mime.into(), formats);
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
