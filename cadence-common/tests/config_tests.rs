//! Configuration resolution and graceful degradation tests
//!
//! Tests that touch CADENCE_* environment variables are marked #[serial]
//! so they never run in parallel with each other.

use cadence_common::config::{
    resolve_config_path, TomlConfig, ANALYSIS_KEY_ENV_VAR, CONFIG_ENV_VAR,
    GENERATION_KEY_ENV_VAR,
};
use serial_test::serial;
use std::env;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn clear_env() {
    env::remove_var(CONFIG_ENV_VAR);
    env::remove_var(ANALYSIS_KEY_ENV_VAR);
    env::remove_var(GENERATION_KEY_ENV_VAR);
}

#[test]
#[serial]
fn test_cli_path_wins_over_environment() {
    clear_env();
    env::set_var(CONFIG_ENV_VAR, "/tmp/from-env.toml");

    let cli = PathBuf::from("/tmp/from-cli.toml");
    let resolved = resolve_config_path(Some(&cli));
    assert_eq!(resolved, Some(cli));

    clear_env();
}

#[test]
#[serial]
fn test_environment_path_used_without_cli() {
    clear_env();
    env::set_var(CONFIG_ENV_VAR, "/tmp/from-env.toml");

    let resolved = resolve_config_path(None);
    assert_eq!(resolved, Some(PathBuf::from("/tmp/from-env.toml")));

    clear_env();
}

#[test]
#[serial]
fn test_missing_file_degrades_to_defaults() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("nope.toml");

    let config = TomlConfig::load(Some(&missing)).unwrap();
    assert_eq!(config.generation.max_poll_attempts, 60);
    assert_eq!(config.debounce.quiet_period_ms, 1500);
}

#[test]
#[serial]
fn test_file_values_are_loaded() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
[logging]
level = "debug"

[celebration]
cooldown_secs = 10
acceptance_ratio = 0.75

[playback]
command = "mpv"
args = ["--no-video"]
"#,
    )
    .unwrap();

    let config = TomlConfig::load(Some(&path)).unwrap();
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.celebration.cooldown_secs, 10);
    assert!((config.celebration.acceptance_ratio - 0.75).abs() < 1e-9);
    assert_eq!(config.playback.command, "mpv");
    assert_eq!(config.playback.args, vec!["--no-video".to_string()]);
}

#[test]
#[serial]
fn test_malformed_file_is_an_error() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    fs::write(&path, "[celebration\ncooldown_secs = ").unwrap();

    assert!(TomlConfig::load(Some(&path)).is_err());
}

#[test]
#[serial]
fn test_env_api_keys_override_file() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
[generation]
api_key = "from-file"
"#,
    )
    .unwrap();

    env::set_var(GENERATION_KEY_ENV_VAR, "from-env");
    env::set_var(ANALYSIS_KEY_ENV_VAR, "   ");

    let config = TomlConfig::load(Some(&path)).unwrap();
    assert_eq!(config.generation.api_key.as_deref(), Some("from-env"));
    // Whitespace-only values are ignored
    assert_eq!(config.analysis.api_key, None);

    clear_env();
}
