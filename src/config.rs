//! Application configuration management.
//!
//! This module handles the persistent configuration for wavetrace: envelope
//! resolution, progress tick timing, timeline spacing, how MP3 files are
//! played, and logging. Configuration is stored in the user's config directory
//! (typically ~/.config/wavetrace/config.toml). Every key has a default, so a
//! missing or partial file is fine.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_ENVELOPE_POINTS, END_OF_CONTENT_TOLERANCE, MIN_TICK_SPACING_PX, PROGRESS_TICK_INTERVAL,
};
use crate::pipeline::{LoadOptions, Mp3Playback};

/// Keys accepted by `set_value`.
pub const CONFIG_KEYS: &[&str] = &[
    "envelope_points",
    "progress_interval_ms",
    "end_tolerance_ms",
    "min_tick_spacing_px",
    "mp3_playback",
    "log_level",
    "log_file",
];

const LOG_LEVELS: &[&str] = &["off", "error", "warn", "info", "debug", "trace"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_envelope_points")]
    pub envelope_points: usize,
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,
    #[serde(default = "default_end_tolerance_ms")]
    pub end_tolerance_ms: u64,
    #[serde(default = "default_min_tick_spacing_px")]
    pub min_tick_spacing_px: u32,
    #[serde(default)]
    pub mp3_playback: Mp3Playback,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

fn default_envelope_points() -> usize {
    DEFAULT_ENVELOPE_POINTS
}

fn default_progress_interval_ms() -> u64 {
    PROGRESS_TICK_INTERVAL.as_millis() as u64
}

fn default_end_tolerance_ms() -> u64 {
    END_OF_CONTENT_TOLERANCE.as_millis() as u64
}

fn default_min_tick_spacing_px() -> u32 {
    MIN_TICK_SPACING_PX
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            envelope_points: default_envelope_points(),
            progress_interval_ms: default_progress_interval_ms(),
            end_tolerance_ms: default_end_tolerance_ms(),
            min_tick_spacing_px: default_min_tick_spacing_px(),
            mp3_playback: Mp3Playback::default(),
            log_level: default_log_level(),
            log_file: None,
        }
    }

    pub fn config_dir() -> Result<PathBuf, Box<dyn Error>> {
        // Check for XDG_CONFIG_HOME first (useful for testing)
        let config_dir = if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(xdg_config).join("wavetrace")
        } else {
            dirs::config_dir()
                .ok_or("Unable to find config directory")?
                .join("wavetrace")
        };
        Ok(config_dir)
    }

    pub fn config_path() -> Result<PathBuf, Box<dyn Error>> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn load() -> Result<Self, Box<dyn Error>> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            // Return default config instead of error
            return Ok(Default::default());
        }

        let contents = fs::read_to_string(&config_path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<(), Box<dyn Error>> {
        let config_dir = Self::config_dir()?;

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)?;
        }

        let config_path = Self::config_path()?;
        let toml_string = toml::to_string_pretty(self)?;
        fs::write(&config_path, toml_string)?;

        Ok(())
    }

    pub fn exists() -> Result<bool, Box<dyn Error>> {
        Ok(Self::config_path()?.exists())
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        match key {
            "envelope_points" => {
                let points = value
                    .parse::<usize>()
                    .map_err(|_| "Value must be a positive whole number")?;
                if points == 0 {
                    return Err("envelope_points must be at least 1".into());
                }
                self.envelope_points = points;
            }
            "progress_interval_ms" => {
                let ms = value
                    .parse::<u64>()
                    .map_err(|_| "Value must be a whole number of milliseconds")?;
                if ms == 0 {
                    return Err("progress_interval_ms must be at least 1".into());
                }
                self.progress_interval_ms = ms;
            }
            "end_tolerance_ms" => {
                self.end_tolerance_ms = value
                    .parse::<u64>()
                    .map_err(|_| "Value must be a whole number of milliseconds")?;
            }
            "min_tick_spacing_px" => {
                self.min_tick_spacing_px = value
                    .parse::<u32>()
                    .map_err(|_| "Value must be a whole number of pixels")?;
            }
            "mp3_playback" => self.mp3_playback = value.parse::<Mp3Playback>()?,
            "log_level" => {
                let level = value.to_lowercase();
                if !LOG_LEVELS.contains(&level.as_str()) {
                    return Err(format!(
                        "Unknown log level '{value}'. Use one of: {}",
                        LOG_LEVELS.join(", ")
                    )
                    .into());
                }
                self.log_level = level;
            }
            "log_file" => {
                self.log_file = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                };
            }
            _ => return Err(format!("Unknown configuration key: {key}").into()),
        }
        Ok(())
    }

    /// Level filter for the file logger.
    pub fn log_level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            envelope_points: self.envelope_points.max(1),
            progress_interval: Duration::from_millis(self.progress_interval_ms),
            end_tolerance: Duration::from_millis(self.end_tolerance_ms),
            mp3_playback: self.mp3_playback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Use a mutex to ensure tests that modify environment variables don't run concurrently
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_config_new() {
        let config = Config::new();
        assert_eq!(config.envelope_points, 1000);
        assert_eq!(config.progress_interval_ms, 100);
        assert_eq!(config.end_tolerance_ms, 1000);
        assert_eq!(config.min_tick_spacing_px, 50);
        assert_eq!(config.mp3_playback, Mp3Playback::Stream);
        assert_eq!(config.log_level, "info");
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("envelope_points = 250\nmp3_playback = \"clip\"\n").unwrap();
        assert_eq!(config.envelope_points, 250);
        assert_eq!(config.mp3_playback, Mp3Playback::Clip);
        assert_eq!(config.progress_interval_ms, 100);

        let empty: Config = toml::from_str("").unwrap();
        assert_eq!(empty, Config::new());
    }

    #[test]
    fn test_set_value() {
        let mut config = Config::new();

        config.set_value("envelope_points", "2000").unwrap();
        assert_eq!(config.envelope_points, 2000);
        assert!(config.set_value("envelope_points", "0").is_err());
        assert!(config.set_value("envelope_points", "lots").is_err());

        config.set_value("mp3_playback", "clip").unwrap();
        assert_eq!(config.mp3_playback, Mp3Playback::Clip);
        assert!(config.set_value("mp3_playback", "tape").is_err());

        config.set_value("log_level", "DEBUG").unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_level_filter(), log::LevelFilter::Debug);
        assert!(config.set_value("log_level", "loud").is_err());

        config.set_value("log_file", "/tmp/wt.log").unwrap();
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/wt.log")));
        config.set_value("log_file", "").unwrap();
        assert!(config.log_file.is_none());

        // Test unknown key
        let result = config.set_value("unknown_key", "value");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_options() {
        let mut config = Config::new();
        config.set_value("progress_interval_ms", "250").unwrap();
        config.set_value("end_tolerance_ms", "500").unwrap();

        let options = config.load_options();
        assert_eq!(options.envelope_points, 1000);
        assert_eq!(options.progress_interval, Duration::from_millis(250));
        assert_eq!(options.end_tolerance, Duration::from_millis(500));
        assert_eq!(options.mp3_playback, Mp3Playback::Stream);
    }

    #[test]
    fn test_config_save_and_load() {
        let _guard = ENV_MUTEX.lock().unwrap();

        let temp_dir = TempDir::new().unwrap();
        let original_xdg = std::env::var("XDG_CONFIG_HOME").ok();
        unsafe {
            std::env::set_var("XDG_CONFIG_HOME", temp_dir.path());
        }

        let mut config = Config::new();
        config.envelope_points = 640;
        config.mp3_playback = Mp3Playback::Clip;
        config.save().unwrap();

        // Verify the config file was created in the temp directory
        let config_path = Config::config_path().unwrap();
        assert!(config_path.exists());
        assert!(config_path.starts_with(temp_dir.path().join("wavetrace")));

        let loaded = Config::load().unwrap();
        assert_eq!(loaded, config);

        // Clean up - restore original value if it existed
        unsafe {
            if let Some(original) = original_xdg {
                std::env::set_var("XDG_CONFIG_HOME", original);
            } else {
                std::env::remove_var("XDG_CONFIG_HOME");
            }
        }
    }

    #[test]
    fn test_config_exists() {
        let _guard = ENV_MUTEX.lock().unwrap();

        let temp_dir = TempDir::new().unwrap();
        let original_xdg = std::env::var("XDG_CONFIG_HOME").ok();
        unsafe {
            std::env::set_var("XDG_CONFIG_HOME", temp_dir.path());
        }

        let expected_path = temp_dir.path().join("wavetrace").join("config.toml");
        assert!(!Config::exists().unwrap());
        assert_eq!(Config::load().unwrap(), Config::new());

        Config::new().save().unwrap();
        assert!(expected_path.exists());
        assert!(Config::exists().unwrap());

        unsafe {
            if let Some(original) = original_xdg {
                std::env::set_var("XDG_CONFIG_HOME", original);
            } else {
                std::env::remove_var("XDG_CONFIG_HOME");
            }
        }
    }
}
