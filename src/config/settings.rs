//! Application settings loaded from settings.toml.
//!
//! Tunables for the catalog core: the SKU retry budget, the low-stock
//! threshold used by read-side stock views, and the root directory for the
//! local blob store. Missing file falls back to defaults; a present but
//! malformed file is a configuration error.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Runtime settings for the catalog core
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Settings {
    /// Maximum SKU generation attempts before surfacing a Conflict
    pub sku_max_attempts: u32,
    /// Active variants at or below this quantity count as low stock
    pub low_stock_threshold: i32,
    /// Root directory for the local blob store backend
    pub blob_root: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sku_max_attempts: 5,
            low_stock_threshold: 5,
            blob_root: "data/media".to_string(),
        }
    }
}

/// Loads settings from a TOML file.
///
/// # Errors
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::debug!("No settings file at {}, using defaults", path.display());
        return Ok(Settings::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read settings file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse settings.toml: {e}"),
    })
}

/// Loads settings from the default location (./settings.toml)
pub fn load_default_settings() -> Result<Settings> {
    load_settings("settings.toml")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_settings() {
        let toml_str = r#"
            sku_max_attempts = 8
            low_stock_threshold = 10
            blob_root = "/var/media"
        "#;

        let settings: Settings = toml::from_str(toml_str).unwrap();
        assert_eq!(settings.sku_max_attempts, 8);
        assert_eq!(settings.low_stock_threshold, 10);
        assert_eq!(settings.blob_root, "/var/media");
    }

    #[test]
    fn test_partial_settings_fall_back_to_defaults() {
        let settings: Settings = toml::from_str("low_stock_threshold = 3").unwrap();
        assert_eq!(settings.low_stock_threshold, 3);
        assert_eq!(settings.sku_max_attempts, Settings::default().sku_max_attempts);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let settings = load_settings("does-not-exist.toml").unwrap();
        assert_eq!(settings.sku_max_attempts, 5);
    }
}
