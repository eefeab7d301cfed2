//! TOML Configuration File Support
//!
//! Configuration for the output conductor, loaded from a TOML file at
//! `$XDG_CONFIG_HOME/output-conductor/conductor.toml`.
//!
//! # Configuration Priority
//!
//! Values are loaded with the following priority (highest first):
//! 1. CLI arguments ([`ConfigOverrides`])
//! 2. Environment variables (`OUTPUT_*`)
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [timing]
//! slide_cache_clear_ms = 50
//! stage_mirror_delay_ms = 100
//! video_data_delay_ms = 600
//! refresh_reset_ms = 100
//!
//! [audio]
//! mute_audio_when_video_plays = true
//!
//! [outputs]
//! default_name = "Output"
//! primary_name = "Primary"
//! key_name = "Key"
//! default_color = "#F0008C"
//! stage_color = "#555555"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Output;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Timing section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingToml {
    /// Delay before the slide content cache is cleared, in milliseconds
    pub slide_cache_clear_ms: Option<u64>,

    /// Delay before stage mirror and preview notifications, in milliseconds
    pub stage_mirror_delay_ms: Option<u64>,

    /// Delay before video playback data is pushed, in milliseconds
    pub video_data_delay_ms: Option<u64>,

    /// How long the refresh flag stays set, in milliseconds
    pub refresh_reset_ms: Option<u64>,
}

/// Audio section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioToml {
    /// Fade other audio out while an unmuted video background plays
    pub mute_audio_when_video_plays: Option<bool>,
}

/// Outputs section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputsToml {
    /// Name of outputs added by the user
    pub default_name: Option<String>,

    /// Name of the output created when none exists
    pub primary_name: Option<String>,

    /// Name of key outputs
    pub key_name: Option<String>,

    /// Highlight color of new outputs
    pub default_color: Option<String>,

    /// Highlight color of new stage outputs
    pub stage_color: Option<String>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConductorToml {
    /// Timing section
    pub timing: TimingToml,

    /// Audio section
    pub audio: AudioToml,

    /// Outputs section
    pub outputs: OutputsToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Configuration of the output conductor
///
/// Use [`load_config`] to load it with proper priority handling.
#[derive(Clone, Debug)]
pub struct OutputConfig {
    /// Delay before the slide content cache is cleared after a slide change
    pub slide_cache_clear_delay: Duration,

    /// Delay before stage mirror and preview notifications
    pub stage_mirror_delay: Duration,

    /// Delay before video playback data is pushed
    pub video_data_delay: Duration,

    /// How long the refresh flag stays set
    pub refresh_reset_delay: Duration,

    /// Fade other audio out while an unmuted video background plays
    pub mute_audio_when_video_plays: bool,

    /// Name of outputs added by the user
    pub default_output_name: String,

    /// Name of the output created when none exists
    pub primary_output_name: String,

    /// Name of key outputs
    pub key_output_name: String,

    /// Highlight color of new outputs
    pub default_color: String,

    /// Highlight color of new stage outputs
    pub stage_color: String,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            slide_cache_clear_delay: Duration::from_millis(50),
            stage_mirror_delay: Duration::from_millis(100),
            video_data_delay: Duration::from_millis(600),
            refresh_reset_delay: Duration::from_millis(100),
            mute_audio_when_video_plays: true,
            default_output_name: "Output".to_string(),
            primary_output_name: "Primary".to_string(),
            key_output_name: "Key".to_string(),
            default_color: "#F0008C".to_string(),
            stage_color: "#555555".to_string(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl OutputConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Template for outputs added by the user
    #[must_use]
    pub fn default_output(&self) -> Output {
        Output {
            color: self.default_color.clone(),
            ..Output::named(&self.default_output_name)
        }
    }

    /// Template for the output created when the registry is empty
    #[must_use]
    pub fn primary_output(&self) -> Output {
        Output {
            name: self.primary_output_name.clone(),
            ..self.default_output()
        }
    }

    /// Template for key outputs
    #[must_use]
    pub fn key_output(&self) -> Output {
        Output {
            name: self.key_output_name.clone(),
            is_key_output: true,
            ..self.default_output()
        }
    }

    /// Check values that would break output creation
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for empty output names and
    /// colors that are not `#` hex colors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let names = [
            ("outputs.default_name", &self.default_output_name),
            ("outputs.primary_name", &self.primary_output_name),
            ("outputs.key_name", &self.key_output_name),
        ];
        for (key, name) in names {
            if name.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!("{key} must not be empty")));
            }
        }

        let colors = [
            ("outputs.default_color", &self.default_color),
            ("outputs.stage_color", &self.stage_color),
        ];
        for (key, color) in colors {
            if !is_hex_color(color) {
                return Err(ConfigError::ValidationError(format!(
                    "{key} must be a hex color like #F0008C, got '{color}'"
                )));
            }
        }
        Ok(())
    }
}

fn is_hex_color(value: &str) -> bool {
    value
        .strip_prefix('#')
        .is_some_and(|hex| matches!(hex.len(), 3 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/output-conductor/conductor.toml` or
/// `~/.config/output-conductor/conductor.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("output-conductor").join("conductor.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed or holds
/// invalid values. A missing config file is not an error.
pub fn load_config() -> Result<OutputConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// If `path` is `None`, only defaults and environment variables are used.
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read, parsed or
/// validated.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<OutputConfig, ConfigError> {
    let mut config = OutputConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: OutputConductorToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, |key| std::env::var(key).ok());
    config.validate()?;

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut OutputConfig, toml: &OutputConductorToml) {
    // Timing
    if let Some(ms) = toml.timing.slide_cache_clear_ms {
        config.slide_cache_clear_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = toml.timing.stage_mirror_delay_ms {
        config.stage_mirror_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = toml.timing.video_data_delay_ms {
        config.video_data_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = toml.timing.refresh_reset_ms {
        config.refresh_reset_delay = Duration::from_millis(ms);
    }

    // Audio
    if let Some(mute) = toml.audio.mute_audio_when_video_plays {
        config.mute_audio_when_video_plays = mute;
    }

    // Outputs
    if let Some(ref name) = toml.outputs.default_name {
        config.default_output_name = name.clone();
    }
    if let Some(ref name) = toml.outputs.primary_name {
        config.primary_output_name = name.clone();
    }
    if let Some(ref name) = toml.outputs.key_name {
        config.key_output_name = name.clone();
    }
    if let Some(ref color) = toml.outputs.default_color {
        config.default_color = color.clone();
    }
    if let Some(ref color) = toml.outputs.stage_color {
        config.stage_color = color.clone();
    }
}

/// Apply environment variable overrides to the config
fn apply_env_config(config: &mut OutputConfig, var: impl Fn(&str) -> Option<String>) {
    let millis = |key: &str| var(key).and_then(|v| v.parse::<u64>().ok()).map(Duration::from_millis);

    if let Some(delay) = millis("OUTPUT_SLIDE_CACHE_CLEAR_MS") {
        config.slide_cache_clear_delay = delay;
        config.source = ConfigSource::Env;
    }
    if let Some(delay) = millis("OUTPUT_STAGE_MIRROR_DELAY_MS") {
        config.stage_mirror_delay = delay;
        config.source = ConfigSource::Env;
    }
    if let Some(delay) = millis("OUTPUT_VIDEO_DATA_DELAY_MS") {
        config.video_data_delay = delay;
        config.source = ConfigSource::Env;
    }
    if let Some(mute) = var("OUTPUT_MUTE_AUDIO_WHEN_VIDEO_PLAYS") {
        config.mute_audio_when_video_plays = mute != "0" && mute.to_lowercase() != "false";
        config.source = ConfigSource::Env;
    }
    if let Some(name) = var("OUTPUT_PRIMARY_NAME") {
        config.primary_output_name = name;
        config.source = ConfigSource::Env;
    }
    if let Some(color) = var("OUTPUT_DEFAULT_COLOR") {
        config.default_color = color;
        config.source = ConfigSource::Env;
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Mute-on-video override
    pub mute_audio_when_video_plays: Option<bool>,

    /// Primary output name override
    pub primary_output_name: Option<String>,

    /// Video data delay override (milliseconds)
    pub video_data_delay_ms: Option<u64>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set mute-on-video override
    #[must_use]
    pub fn with_mute_audio_when_video_plays(mut self, mute: bool) -> Self {
        self.mute_audio_when_video_plays = Some(mute);
        self
    }

    /// Set primary output name override
    #[must_use]
    pub fn with_primary_output_name(mut self, name: String) -> Self {
        self.primary_output_name = Some(name);
        self
    }

    /// Set video data delay override
    #[must_use]
    pub fn with_video_data_delay_ms(mut self, ms: u64) -> Self {
        self.video_data_delay_ms = Some(ms);
        self
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut OutputConfig) {
        if self.mute_audio_when_video_plays.is_some()
            || self.primary_output_name.is_some()
            || self.video_data_delay_ms.is_some()
        {
            config.source = ConfigSource::Cli;
        }

        if let Some(mute) = self.mute_audio_when_video_plays {
            config.mute_audio_when_video_plays = mute;
        }
        if let Some(ref name) = self.primary_output_name {
            config.primary_output_name = name.clone();
        }
        if let Some(ms) = self.video_data_delay_ms {
            config.video_data_delay = Duration::from_millis(ms);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn write_toml(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = OutputConfig::default();

        assert_eq!(config.slide_cache_clear_delay, Duration::from_millis(50));
        assert_eq!(config.stage_mirror_delay, Duration::from_millis(100));
        assert_eq!(config.video_data_delay, Duration::from_millis(600));
        assert!(config.mute_audio_when_video_plays);
        assert_eq!(config.primary_output().name, "Primary");
        assert!(config.key_output().is_key_output);
        assert_eq!(config.source(), ConfigSource::Default);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_path() {
        if let Some(p) = default_config_path() {
            assert!(p.to_string_lossy().contains("output-conductor"));
            assert!(p.to_string_lossy().ends_with("conductor.toml"));
        }
    }

    #[test]
    fn test_parse_valid_toml() {
        let file = write_toml(
            r##"
[timing]
slide_cache_clear_ms = 20
video_data_delay_ms = 250

[audio]
mute_audio_when_video_plays = false

[outputs]
primary_name = "Main Screen"
stage_color = "#123456"
"##,
        );

        let config = load_config_from_path(Some(file.path().to_path_buf())).unwrap();

        assert_eq!(config.slide_cache_clear_delay, Duration::from_millis(20));
        assert_eq!(config.video_data_delay, Duration::from_millis(250));
        assert_eq!(config.stage_mirror_delay, Duration::from_millis(100));
        assert!(!config.mute_audio_when_video_plays);
        assert_eq!(config.primary_output_name, "Main Screen");
        assert_eq!(config.stage_color, "#123456");
        assert_eq!(config.config_file_path.as_deref(), Some(file.path()));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config =
            load_config_from_path(Some(PathBuf::from("/nonexistent/output-conductor.toml")))
                .unwrap();
        assert!(config.config_file_path.is_none());
        assert_eq!(config.default_output_name, "Output");
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let file = write_toml("[timing\nslide_cache_clear_ms = ");
        let result = load_config_from_path(Some(file.path().to_path_buf()));
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_invalid_color_is_validation_error() {
        let file = write_toml("[outputs]\ndefault_color = \"pink\"\n");
        let result = load_config_from_path(Some(file.path().to_path_buf()));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            ("OUTPUT_VIDEO_DATA_DELAY_MS", "900"),
            ("OUTPUT_MUTE_AUDIO_WHEN_VIDEO_PLAYS", "false"),
            ("OUTPUT_SLIDE_CACHE_CLEAR_MS", "not a number"),
        ]
        .into_iter()
        .collect();

        let mut config = OutputConfig::default();
        apply_env_config(&mut config, |key| env.get(key).map(|v| (*v).to_string()));

        assert_eq!(config.video_data_delay, Duration::from_millis(900));
        assert!(!config.mute_audio_when_video_plays);
        assert_eq!(config.slide_cache_clear_delay, Duration::from_millis(50));
        assert_eq!(config.source(), ConfigSource::Env);
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = OutputConfig::default();
        ConfigOverrides::new()
            .with_primary_output_name("Projector".to_string())
            .with_video_data_delay_ms(0)
            .apply(&mut config);

        assert_eq!(config.primary_output_name, "Projector");
        assert_eq!(config.video_data_delay, Duration::ZERO);
        assert_eq!(config.source(), ConfigSource::Cli);

        let mut untouched = OutputConfig::default();
        ConfigOverrides::new().apply(&mut untouched);
        assert_eq!(untouched.source(), ConfigSource::Default);
    }
}
