use tempfile::TempDir;
use wavetrace::config::Config;
use wavetrace::pipeline::Mp3Playback;

#[test]
fn test_config_lifecycle() {
    // Create a temporary directory for test config
    let temp_dir = TempDir::new().unwrap();

    // Override the config path for testing
    unsafe {
        std::env::set_var("XDG_CONFIG_HOME", temp_dir.path());
    }

    // Nothing on disk yet, but loading still yields defaults
    assert!(!Config::exists().unwrap());
    assert_eq!(Config::load().unwrap(), Config::new());

    Config::new().save().unwrap();
    assert!(Config::exists().unwrap());

    let loaded = Config::load().unwrap();
    assert_eq!(loaded.envelope_points, 1000);
    assert_eq!(loaded.mp3_playback, Mp3Playback::Stream);

    // Test config mutation
    let mut config = Config::load().unwrap();
    config.set_value("envelope_points", "400").unwrap();
    config.set_value("mp3_playback", "clip").unwrap();
    config.save().unwrap();

    // Verify mutations persisted
    let reloaded = Config::load().unwrap();
    assert_eq!(reloaded.envelope_points, 400);
    assert_eq!(reloaded.mp3_playback, Mp3Playback::Clip);
    assert_eq!(reloaded.load_options().envelope_points, 400);

    // Test invalid key and value
    let mut config = Config::load().unwrap();
    assert!(config.set_value("invalid_key", "value").is_err());
    assert!(config.set_value("progress_interval_ms", "soon").is_err());

    // A hand-edited file that fails to parse is reported, not replaced
    std::fs::write(Config::config_path().unwrap(), "envelope_points = \"many\"").unwrap();
    assert!(Config::load().is_err());
}
