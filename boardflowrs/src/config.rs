//! Configuration system for Boardflow.
//!
//! TOML-based configuration with built-in defaults for query limits,
//! display caps, and the aggregation backend endpoint.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BoardflowError, Result};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BoardflowConfig {
    pub query: QueryConfig,
    pub display: DisplayConfig,
    pub backend: BackendConfig,
}

/// Query request defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Row cap applied to aggregate requests without an explicit limit.
    pub default_aggregate_limit: u32,
    /// Row cap applied to raw-row requests without an explicit limit.
    pub default_raw_limit: u32,
    /// Hard ceiling on any requested limit (0 = unlimited).
    pub max_row_limit: u32,
    /// Row cap for distinct-value lookups (filter dropdowns).
    pub distinct_limit: u32,
}

/// Client-side display caps.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Rows shown for table widgets.
    pub table_row_limit: usize,
}

/// Aggregation backend endpoint settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL the dashboard endpoints hang off of.
    pub base_url: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_aggregate_limit: 100,
            default_raw_limit: 500,
            max_row_limit: 5000,
            distinct_limit: 100,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            table_row_limit: 100,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout_ms: 30_000,
        }
    }
}

impl BoardflowConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| BoardflowError::Config(format!("failed to read config file: {e}")))?;
        Self::from_toml(&contents)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| BoardflowError::Config(format!("failed to parse config: {e}")))
    }

    /// Load from default locations (env var, cwd, user config dir, or defaults).
    ///
    /// Search order:
    /// 1. `BOARDFLOW_CONFIG` environment variable
    /// 2. `./boardflow.toml` (current directory)
    /// 3. `~/.config/boardflow/config.toml` (user config dir)
    /// 4. Built-in defaults
    pub fn load_default() -> Self {
        if let Ok(path) = std::env::var("BOARDFLOW_CONFIG") {
            if let Ok(cfg) = Self::from_file(&path) {
                tracing::info!(path = %path, "loaded config from BOARDFLOW_CONFIG");
                return cfg;
            }
        }

        if let Ok(cfg) = Self::from_file("boardflow.toml") {
            tracing::info!("loaded config from ./boardflow.toml");
            return cfg;
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("boardflow").join("config.toml");
            if let Ok(cfg) = Self::from_file(&user_config) {
                tracing::info!(path = %user_config.display(), "loaded config from user config dir");
                return cfg;
            }
        }

        tracing::debug!("no config file found, using defaults");
        Self::default()
    }
}

impl QueryConfig {
    /// Clamp a requested limit to the configured ceiling.
    pub fn clamp_limit(&self, limit: u32) -> u32 {
        if self.max_row_limit > 0 && limit > self.max_row_limit {
            self.max_row_limit
        } else {
            limit
        }
    }
}
