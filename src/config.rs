// SPDX-License-Identifier: GPL-3.0-only
//! Engine configuration
//!
//! Read-only: the engine loads `~/.config/candela/config.toml` (or a path
//! given on the command line) and never writes it back.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BrightnessError, Result};

pub const APP_NAME: &str = "candela";

/// Level reported by read operations when the device cannot be queried
pub const DEFAULT_FALLBACK_LEVEL: i32 = 50;

/// VCP (Virtual Control Panel) code for brightness
pub const DEFAULT_VCP_BRIGHTNESS_CODE: u8 = 0x10;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Config {
    /// Value returned by `get` when the backend cannot be read, clamped into
    /// the backend's valid range
    pub fallback_level: i32,
    /// VCP feature code written by the hardware backend
    pub vcp_brightness_code: u8,
    /// Default tracing filter when RUST_LOG is not set
    pub log_filter: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fallback_level: DEFAULT_FALLBACK_LEVEL,
            vcp_brightness_code: DEFAULT_VCP_BRIGHTNESS_CODE,
            log_filter: None,
        }
    }
}

/// Returns the path to the config file: ~/.config/candela/config.toml
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(APP_NAME).join("config.toml"))
}

impl Config {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(contents).map_err(|e| BrightnessError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, or from the default location when `path` is `None`.
    ///
    /// A missing file is not an error and yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match config_path() {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            BrightnessError::Config(msg) => {
                BrightnessError::Config(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    fn validate(&self) -> Result<()> {
        if !(0..=100).contains(&self.fallback_level) {
            return Err(BrightnessError::Config(format!(
                "fallback_level must be within 0..=100, got {}",
                self.fallback_level
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::from_toml_str("").expect("parse");
        assert_eq!(config, Config::default());
        assert_eq!(config.fallback_level, 50);
        assert_eq!(config.vcp_brightness_code, 0x10);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = Config::from_toml_str("fallback_level = 70\n").expect("parse");
        assert_eq!(config.fallback_level, 70);
        assert_eq!(config.vcp_brightness_code, 0x10);
        assert!(config.log_filter.is_none());
    }

    #[test]
    fn full_file() {
        let toml = r#"
fallback_level = 40
vcp_brightness_code = 16
log_filter = "debug"
"#;
        let config = Config::from_toml_str(toml).expect("parse");
        assert_eq!(config.fallback_level, 40);
        assert_eq!(config.vcp_brightness_code, 16);
        assert_eq!(config.log_filter.as_deref(), Some("debug"));
    }

    #[test]
    fn out_of_range_fallback_is_rejected() {
        let result = Config::from_toml_str("fallback_level = 150\n");
        assert!(matches!(result, Err(BrightnessError::Config(_))));
    }

    #[test]
    fn invalid_toml_produces_error() {
        let result = Config::from_toml_str("fallback_level = [");
        assert!(matches!(result, Err(BrightnessError::Config(_))));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("candela-config-that-does-not-exist.toml");
        let config = Config::load(Some(&path)).expect("load");
        assert_eq!(config, Config::default());
    }
}
