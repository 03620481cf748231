use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use schemaport_core::DEFAULT_SRID;
use schemaport_import::{ConnectOptions, DEFAULT_BATCH_SIZE};

pub const DEFAULT_META_SCHEMA_URL: &str = "https://ams-schema.glitch.me/schema";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Import settings. Precedence: CLI flag, then environment, then the
/// config file, then these defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub database_url: Option<String>,
    pub batch_size: usize,
    pub default_srid: i32,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub meta_schema_url: String,
    pub validate: bool,
    pub render_url: Option<String>,
    pub render_dir: PathBuf,
    pub run_dir: PathBuf,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            batch_size: DEFAULT_BATCH_SIZE,
            default_srid: DEFAULT_SRID,
            max_connections: 5,
            acquire_timeout_secs: 10,
            meta_schema_url: DEFAULT_META_SCHEMA_URL.to_string(),
            validate: true,
            render_url: None,
            render_dir: PathBuf::from("mapserver"),
            run_dir: PathBuf::from("runs"),
        }
    }
}

impl ImportConfig {
    /// Read a TOML config file; a missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            tracing::debug!(event = "config_missing", path = %path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.display().to_string(),
            source,
        })
    }

    /// Apply `DATABASE_URL` over the file value.
    pub fn with_env(mut self) -> Self {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.trim().is_empty() {
                self.database_url = Some(url);
            }
        }
        self
    }

    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            max_connections: self.max_connections.max(1),
            acquire_timeout: Duration::from_secs(self.acquire_timeout_secs),
        }
    }
}
