//! Config files: strategies and sweep grids, in TOML or JSON.
//!
//! The format is chosen by file extension (`.toml` or `.json`). Files are
//! only parsed here; strategy validation belongs to
//! [`calllab_core::plan::compile`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use calllab_core::plan::{StrategyConfig, TargetConfig, TrailingConfig};

/// Errors from reading or parsing a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid TOML in {}: {source}", .path.display())]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("unsupported config format for {} (expected .toml or .json)", .path.display())]
    UnsupportedFormat { path: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parameter grid for a sweep.
///
/// Each axis lists alternative values for one exit parameter of the base
/// strategy. An empty axis keeps the base value. Variants are the cross
/// product of all axes, in a fixed order.
///
/// ```toml
/// stop_loss_pct = [15.0, 25.0]
/// max_candles_in_trade = [24, 48]
///
/// [[trailing]]
/// trail_pct = 20.0
/// activate_profit_pct = 50.0
///
/// ladders = [
///     [{ size_pct = 100.0, profit_pct = 100.0 }],
///     [{ size_pct = 50.0, profit_pct = 100.0 }, { size_pct = 50.0, profit_pct = 300.0 }],
/// ]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamGrid {
    pub stop_loss_pct: Vec<f64>,
    pub trailing: Vec<TrailingConfig>,
    pub max_candles_in_trade: Vec<i64>,
    pub ladders: Vec<Vec<TargetConfig>>,
}

impl ParamGrid {
    /// Number of variants this grid expands to.
    pub fn size(&self) -> usize {
        [
            self.stop_loss_pct.len(),
            self.trailing.len(),
            self.max_candles_in_trade.len(),
            self.ladders.len(),
        ]
        .iter()
        .map(|&n| n.max(1))
        .product()
    }
}

/// Parse a config from a string in the given format.
pub fn parse_str<T: DeserializeOwned>(
    content: &str,
    format: ConfigFormat,
    path: &Path,
) -> Result<T, ConfigError> {
    match format {
        ConfigFormat::Toml => toml::from_str(content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        }),
        ConfigFormat::Json => serde_json::from_str(content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Read and parse a TOML or JSON file.
pub fn load_file<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let format = ConfigFormat::from_path(path).ok_or_else(|| ConfigError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_str(&content, format, path)
}

pub fn load_strategy(path: &Path) -> Result<StrategyConfig, ConfigError> {
    load_file(path)
}

pub fn load_grid(path: &Path) -> Result<ParamGrid, ConfigError> {
    load_file(path)
}
