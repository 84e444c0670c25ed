// src/utils/config.rs
//! Trace configuration
//!
//! Sources are layered: built-in defaults, then an optional `dbtrace.{toml,yaml,json}`
//! in the working directory, then `DBTRACE__*` environment variables
//! (e.g. `DBTRACE__SINK__DIRECTORY=/var/log/app`).

use crate::utils::errors::{Result, TraceError};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Setting names copied out of a call context when none are configured
pub const DEFAULT_KNOWN_SETTINGS: &[&str] = &[
    "insert_option",
    "query_option",
    "delete_option",
    "started_transaction",
    "table_options",
];

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Output log settings
    pub sink: SinkConfig,

    /// Setting names captured into each record's `settings` map
    pub known_settings: Vec<String>,

    /// Diagnostic logging for the tracer itself
    pub logging: LoggingConfig,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            sink: SinkConfig::default(),
            known_settings: DEFAULT_KNOWN_SETTINGS.iter().map(|s| s.to_string()).collect(),
            logging: LoggingConfig::default(),
        }
    }
}

impl TraceConfig {
    /// Load from the default file (if present) and environment
    pub fn load() -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name("dbtrace").required(false))
            .add_source(Self::environment())
            .build()?;

        let loaded: TraceConfig = config.try_deserialize()?;
        debug!("Loaded trace configuration: {:?}", loaded);
        Ok(loaded)
    }

    /// Load from an explicit file, still honoring environment overrides
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(TraceError::ConfigError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let config = Config::builder()
            .add_source(File::from(path))
            .add_source(Self::environment())
            .build()?;

        Ok(config.try_deserialize()?)
    }

    fn environment() -> Environment {
        Environment::with_prefix("DBTRACE")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("known_settings")
            .try_parsing(true)
    }
}

/// Output log configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Directory the log file is created in
    pub directory: PathBuf,

    /// File name prefix; the full name is `<prefix>.<unix_nanos>.log`
    pub file_prefix: String,

    /// How hard each record is pushed towards disk
    pub durability: Durability,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            file_prefix: "dbtrace".to_string(),
            durability: Durability::Flush,
        }
    }
}

/// Per-record durability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Durability {
    /// Hand every record to the OS before `write` returns
    Flush,

    /// Also `sync_data` after every record
    Sync,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,

    /// Emit JSON formatted diagnostics
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
