//! Configuration file support for RehabX.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/rehabx/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub validation: ValidationConfig,
}

/// Playback timing configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Delay between completion and the final pose reset
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Divides every wait and commanded duration; 1.0 is real time
    #[serde(default = "default_time_scale")]
    pub time_scale: f64,

    /// Render loop period used by hosts that sample the rig
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,

    /// Delay between accepting a program and starting it
    #[serde(default = "default_start_delay_ms")]
    pub start_delay_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            time_scale: default_time_scale(),
            frame_interval_ms: default_frame_interval_ms(),
            start_delay_ms: default_start_delay_ms(),
        }
    }
}

impl PlaybackConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }
}

/// Program validation configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct ValidationConfig {
    /// Reject unknown exercise codes and require pressure/cadence values
    #[serde(default)]
    pub strict: bool,
}

// Default value functions
fn default_settle_delay_ms() -> u64 {
    2000
}

fn default_time_scale() -> f64 {
    1.0
}

fn default_frame_interval_ms() -> u64 {
    16
}

fn default_start_delay_ms() -> u64 {
    500
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        let base = match dirs::config_dir() {
            Some(dir) => dir,
            None => {
                let home = std::env::var("HOME").map_err(|_| {
                    Error::Config("HOME environment variable not set".into())
                })?;
                PathBuf::from(home).join(".config")
            }
        };
        Ok(base.join("rehabx").join("config.toml"))
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if !(self.playback.time_scale.is_finite() && self.playback.time_scale > 0.0) {
            return Err(Error::Config(format!(
                "playback.time_scale must be a positive number, got {}",
                self.playback.time_scale
            )));
        }
        if self.playback.frame_interval_ms == 0 {
            return Err(Error::Config(
                "playback.frame_interval_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.playback.settle_delay_ms, 2000);
        assert_eq!(config.playback.time_scale, 1.0);
        assert!(!config.validation.strict);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[playback]
time_scale = 4.0
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.playback.time_scale, 4.0);
        assert_eq!(config.playback.settle_delay_ms, 2000); // default
        assert_eq!(config.playback.frame_interval_ms, 16); // default
    }

    #[test]
    fn test_rejects_non_positive_time_scale() {
        let mut config = Config::default();
        config.playback.time_scale = 0.0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        config.playback.time_scale = -2.0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_save_and_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.validation.strict = true;
        config.playback.settle_delay_ms = 250;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert!(loaded.validation.strict);
        assert_eq!(loaded.playback.settle_delay_ms, 250);
    }

    #[test]
    fn test_load_from_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[playback]\nframe_interval_ms = 0\n").unwrap();

        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }
}
