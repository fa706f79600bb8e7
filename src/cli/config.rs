use std::error::Error;
use std::process::Command;

use wavetrace::config::Config;
use wavetrace::utils::logging::log_path;

pub fn handle_config_view() -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let source = if Config::exists()? {
        Config::config_path()?.display().to_string()
    } else {
        "defaults".to_string()
    };

    println!("Current wavetrace configuration ({source}):");
    println!("  envelope_points: {}", config.envelope_points);
    println!("  progress_interval_ms: {}", config.progress_interval_ms);
    println!("  end_tolerance_ms: {}", config.end_tolerance_ms);
    println!("  min_tick_spacing_px: {}", config.min_tick_spacing_px);
    println!(
        "  mp3_playback: {}",
        format!("{:?}", config.mp3_playback).to_lowercase()
    );
    println!("  log_level: {}", config.log_level);
    println!("  log_file: {}", log_path(&config).display());

    Ok(())
}

pub fn handle_config_set(key: &str, value: &str) -> Result<(), Box<dyn Error>> {
    let mut config = Config::load()?;

    config.set_value(key, value)?;
    config.save()?;

    println!("Configuration updated: {key} = {value}");

    Ok(())
}

pub fn handle_config_edit() -> Result<(), Box<dyn Error>> {
    // Write defaults so there is something to edit
    if !Config::exists()? {
        Config::new().save()?;
    }

    let config_path = Config::config_path()?;
    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    println!("Opening {} in {}", config_path.display(), editor);

    let status = Command::new(&editor)
        .arg(&config_path)
        .status()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                format!("Editor '{editor}' not found. Set $EDITOR to a valid editor path.")
            } else {
                format!("Failed to launch editor '{editor}': {e}")
            }
        })?;

    if !status.success() {
        return Err(format!("Editor '{editor}' exited with error").into());
    }

    // Validate the config after editing
    match Config::load() {
        Ok(_) => println!("Configuration saved successfully"),
        Err(e) => {
            return Err(format!("Configuration validation failed: {e}").into());
        }
    }

    Ok(())
}
