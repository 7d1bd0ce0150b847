//! TOML-based configuration for the bridge.
//!
//! The whole configuration is two keys:
//!
//! ```toml
//! check_interval = 30
//! log_level = "info"
//! ```
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return
//! value of `some_fn()` when the key is absent from the TOML file, so the
//! bridge works on first run (before a config file exists) and with partial
//! files that only override one key.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Bridge configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Seconds between poll ticks. Floored to 1 at use so a zero value
    /// cannot spin the timer.
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,

    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`,
    /// `"trace"`. Overridden by `RUST_LOG` when set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_check_interval() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            check_interval: default_check_interval(),
            log_level: default_log_level(),
        }
    }
}

/// Default config file location, relative to the working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("proxycount.toml")
}

/// Loads [`BridgeConfig`] from `path`, returning `BridgeConfig::default()`
/// if the file does not yet exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not
/// found", and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<BridgeConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let cfg: BridgeConfig = toml::from_str(&content)?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BridgeConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
