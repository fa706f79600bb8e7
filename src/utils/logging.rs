//! Logger setup for the binary.
//!
//! Everything goes to a log file. Non-interactive commands also echo warnings
//! to stderr; the interactive player does not, since stray lines would tear
//! through its status display.

use simplelog::{
    ColorChoice, CombinedLogger, Config as LogConfig, LevelFilter, SharedLogger, TermLogger,
    TerminalMode, WriteLogger,
};
use std::error::Error;
use std::fs::{self, File};
use std::path::PathBuf;

use crate::config::Config;

const DEFAULT_LOG_FILE: &str = "wavetrace.log";

/// Where the file logger writes for this config.
pub fn log_path(config: &Config) -> PathBuf {
    config
        .log_file
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_LOG_FILE))
}

/// Install the global logger. Returns the log file path.
pub fn init_logging(config: &Config, interactive: bool) -> Result<PathBuf, Box<dyn Error>> {
    let path = log_path(config);
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![WriteLogger::new(
        config.log_level_filter(),
        LogConfig::default(),
        File::create(&path)?,
    )];
    if !interactive {
        loggers.push(TermLogger::new(
            LevelFilter::Warn,
            LogConfig::default(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ));
    }

    CombinedLogger::init(loggers)?;
    log::debug!("Logging to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_path_defaults_to_temp_dir() {
        let config = Config::new();
        assert_eq!(log_path(&config), std::env::temp_dir().join("wavetrace.log"));

        let mut config = Config::new();
        config.log_file = Some(PathBuf::from("/var/tmp/custom.log"));
        assert_eq!(log_path(&config), PathBuf::from("/var/tmp/custom.log"));
    }
}
