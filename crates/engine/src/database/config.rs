//! Engine configuration via `linkage.toml`
//!
//! Every key is optional; a missing file section falls back to its default.
//! To change settings, edit the file and restart.

use serde::{Deserialize, Serialize};
use std::path::Path;

use linkage_core::{LinkageError, LinkageResult};

use super::transactions::RetryConfig;

/// Config file name looked up by the command line.
pub const CONFIG_FILE_NAME: &str = "linkage.toml";

/// Engine configuration loaded from `linkage.toml`.
///
/// # Example
///
/// ```toml
/// log_filter = "warn"
///
/// [retry]
/// max_retries = 3
/// base_delay_ms = 10
/// max_delay_ms = 100
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkageConfig {
    /// Default tracing filter when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Conflict retry policy for identify requests.
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl Default for LinkageConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            retry: RetryConfig::default(),
        }
    }
}

impl LinkageConfig {
    /// Retry policy for the identify pipeline
    pub fn retry_config(&self) -> RetryConfig {
        self.retry.clone()
    }

    /// Check value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the backoff cap is below the base delay or the
    /// log filter is blank.
    pub fn validate(&self) -> LinkageResult<()> {
        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            return Err(LinkageError::config(format!(
                "retry.max_delay_ms ({}) must not be below retry.base_delay_ms ({})",
                self.retry.max_delay_ms, self.retry.base_delay_ms
            )));
        }
        if self.log_filter.trim().is_empty() {
            return Err(LinkageError::config("log_filter must not be empty"));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Linkage configuration
#
# Tracing filter used when RUST_LOG is not set, e.g. "info" or
# "linkage::txn=debug,warn"
log_filter = "warn"

# Retry policy for requests that lose a commit race.
# Delay doubles per attempt from base_delay_ms, capped at max_delay_ms.
[retry]
max_retries = 3
base_delay_ms = 10
max_delay_ms = 100
"#
    }

    /// Parse and validate config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the text does not parse or fails validation.
    pub fn from_toml_str(content: &str) -> LinkageResult<Self> {
        let config: LinkageConfig = toml::from_str(content)
            .map_err(|e| LinkageError::config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> LinkageResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LinkageError::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: LinkageConfig = toml::from_str(&content).map_err(|e| {
            LinkageError::config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> LinkageResult<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                LinkageError::config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> LinkageResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| LinkageError::internal(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            LinkageError::config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
