//! Generator Configuration

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorConfig {
    /// Sales tax folded into quoted prices.
    #[serde(default = "default_tax_rate")]
    pub tax_rate: f64,
    /// Subtracted from the Gregorian year for `roc_year` / `roc_date`.
    #[serde(default = "default_calendar_offset")]
    pub calendar_offset: i32,
    #[serde(default = "default_templates_dir")]
    pub templates_dir: PathBuf,
}

fn default_tax_rate() -> f64 { 0.05 }
fn default_calendar_offset() -> i32 { 1911 }
fn default_templates_dir() -> PathBuf { PathBuf::from("templates") }

impl GeneratorConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            tax_rate: default_tax_rate(),
            calendar_offset: default_calendar_offset(),
            templates_dir: default_templates_dir(),
        }
    }
}
