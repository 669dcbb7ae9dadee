//! # Engine Configuration
//!
//! Report defaults for the sales engine.
//!
//! ## Load Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  1. Built-in defaults         threshold 10, limit 5                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  2. TOML file (if given and present)                                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  3. Environment overrides                                               │
//! │     STOCKROOM_LOW_STOCK_THRESHOLD, STOCKROOM_TOP_PRODUCTS_LIMIT         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  4. validate()                                                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example File
//! ```toml
//! # stockroom.toml
//! [reports]
//! low_stock_threshold = 5
//! top_products_limit = 10
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Environment variable overriding the low-stock threshold.
pub const ENV_LOW_STOCK_THRESHOLD: &str = "STOCKROOM_LOW_STOCK_THRESHOLD";

/// Environment variable overriding the top-products limit.
pub const ENV_TOP_PRODUCTS_LIMIT: &str = "STOCKROOM_TOP_PRODUCTS_LIMIT";

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// =============================================================================
// Settings
// =============================================================================

/// Defaults used by the report operations when the caller passes none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSettings {
    /// Products at or below this quantity are "low stock".
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i64,

    /// Rows returned by top-products and low-stock reports.
    #[serde(default = "default_top_products_limit")]
    pub top_products_limit: u32,
}

fn default_low_stock_threshold() -> i64 {
    10
}

fn default_top_products_limit() -> u32 {
    5
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            low_stock_threshold: default_low_stock_threshold(),
            top_products_limit: default_top_products_limit(),
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub reports: ReportSettings,
}

impl EngineConfig {
    /// Defaults plus environment overrides.
    pub fn from_env() -> Self {
        let mut config = EngineConfig::default();
        config.apply_env_overrides();
        config
    }

    /// Parses a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads from an optional file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = EngineConfig::default();

        if let Some(path) = path {
            if path.exists() {
                info!(?path, "Loading engine config from file");
                let contents = std::fs::read_to_string(path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Applies `STOCKROOM_*` environment overrides. Unparseable values are
    /// ignored with a warning.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(raw) = std::env::var(ENV_LOW_STOCK_THRESHOLD) {
            match raw.parse::<i64>() {
                Ok(threshold) => self.reports.low_stock_threshold = threshold,
                Err(_) => warn!(value = %raw, "Ignoring invalid {}", ENV_LOW_STOCK_THRESHOLD),
            }
        }

        if let Ok(raw) = std::env::var(ENV_TOP_PRODUCTS_LIMIT) {
            match raw.parse::<u32>() {
                Ok(limit) => self.reports.top_products_limit = limit,
                Err(_) => warn!(value = %raw, "Ignoring invalid {}", ENV_TOP_PRODUCTS_LIMIT),
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reports.low_stock_threshold < 0 {
            return Err(ConfigError::Invalid(
                "reports.low_stock_threshold must not be negative".to_string(),
            ));
        }
        if self.reports.top_products_limit == 0 {
            return Err(ConfigError::Invalid(
                "reports.top_products_limit must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Serializes to TOML (for writing a starter config file).
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
