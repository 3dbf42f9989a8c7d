//! Configuration loading for Cadence
//!
//! Bootstrap configuration comes from a single TOML file. Every section and
//! every key is optional; anything missing falls back to a built-in default.
//!
//! # Config file resolution
//!
//! 1. Command-line argument (highest priority)
//! 2. `CADENCE_CONFIG` environment variable
//! 3. `<config dir>/cadence/config.toml`
//! 4. Built-in defaults (no file)
//!
//! A missing file is not an error: a warning is logged and defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "CADENCE_CONFIG";
/// Environment override for the analysis service key
pub const ANALYSIS_KEY_ENV_VAR: &str = "CADENCE_ANALYSIS_API_KEY";
/// Environment override for the generation service key
pub const GENERATION_KEY_ENV_VAR: &str = "CADENCE_GENERATION_API_KEY";

/// Top-level configuration loaded from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub logging: LoggingConfig,
    pub analysis: AnalysisConfig,
    pub generation: GenerationConfig,
    pub celebration: CelebrationConfig,
    pub diagnostics: DiagnosticsConfig,
    pub debounce: DebounceConfig,
    pub playback: PlaybackConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); RUST_LOG wins when set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Remote code-analysis service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Chat-completions endpoint
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Source text longer than this is truncated before upload
    pub max_source_chars: usize,
    pub timeout_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            max_source_chars: 4000,
            timeout_secs: 30,
        }
    }
}

/// Remote generation service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub instrumental: bool,
    pub poll_interval_secs: u64,
    pub max_poll_attempts: u32,
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            api_key: None,
            instrumental: true,
            poll_interval_secs: 5,
            max_poll_attempts: 60,
            timeout_secs: 30,
        }
    }
}

impl GenerationConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Success classifier settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CelebrationConfig {
    pub enabled: bool,
    pub cooldown_secs: u64,
    /// A pattern is accepted when its score reaches this share of its declared confidence
    pub acceptance_ratio: f64,
}

impl Default for CelebrationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cooldown_secs: 5,
            acceptance_ratio: 0.8,
        }
    }
}

impl CelebrationConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

/// Diagnostic feedback settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub enabled: bool,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Document-change debounce settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebounceConfig {
    pub quiet_period_ms: u64,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            quiet_period_ms: 1500,
        }
    }
}

impl DebounceConfig {
    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }
}

/// Local audio playback settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Player executable; the audio URL is appended to `args`
    pub command: String,
    pub args: Vec<String>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            command: "ffplay".to_string(),
            args: vec![
                "-nodisp".to_string(),
                "-autoexit".to_string(),
                "-loglevel".to_string(),
                "quiet".to_string(),
            ],
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the poll loop cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.generation.poll_interval_secs == 0 {
            return Err(Error::Config(
                "generation.poll_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.generation.max_poll_attempts == 0 {
            return Err(Error::Config(
                "generation.max_poll_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Resolve and load configuration, degrading to defaults when no file exists
    ///
    /// A file that exists but fails to parse is an error; a file that does not
    /// exist only produces a warning.
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let mut config = match resolve_config_path(cli_path) {
            Some(path) if path.exists() => {
                info!("Loading configuration from {}", path.display());
                Self::load_from(&path)?
            }
            Some(path) => {
                warn!(
                    "Config file {} not found, using built-in defaults",
                    path.display()
                );
                Self::default()
            }
            None => {
                warn!("No config directory available, using built-in defaults");
                Self::default()
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply API key overrides from the environment
    pub fn apply_env_overrides(&mut self) {
        if let Some(key) = non_empty_env(ANALYSIS_KEY_ENV_VAR) {
            info!("Analysis API key loaded from environment variable");
            self.analysis.api_key = Some(key);
        }
        if let Some(key) = non_empty_env(GENERATION_KEY_ENV_VAR) {
            info!("Generation API key loaded from environment variable");
            self.generation.api_key = Some(key);
        }
    }
}

/// Resolve the config file path by priority: CLI, environment, platform default
pub fn resolve_config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    if let Some(path) = non_empty_env(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }

    default_config_path()
}

/// `<config dir>/cadence/config.toml` for the current platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cadence").join("config.toml"))
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.generation.poll_interval_secs, 5);
        assert_eq!(config.generation.max_poll_attempts, 60);
        assert_eq!(config.celebration.cooldown_secs, 5);
        assert!((config.celebration.acceptance_ratio - 0.8).abs() < f64::EPSILON);
        assert_eq!(config.analysis.max_source_chars, 4000);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = TomlConfig::from_toml_str(
            r#"
            [generation]
            poll_interval_secs = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.generation.poll_interval_secs, 2);
        assert_eq!(config.generation.max_poll_attempts, 60);
        assert!(config.generation.instrumental);
    }

    #[test]
    fn test_zero_poll_settings_are_rejected() {
        for toml in [
            "[generation]\npoll_interval_secs = 0",
            "[generation]\nmax_poll_attempts = 0",
        ] {
            let err = TomlConfig::from_toml_str(toml).unwrap_err();
            assert!(matches!(err, Error::Config(ref msg) if msg.contains("generation.")), "{}", toml);
        }
        assert!(TomlConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = TomlConfig::from_toml_str("[generation\nfoo = ").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
