//! Configuration loading, validation, and management for LookOut.
//!
//! Loads configuration from `~/.lookout/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Greeting the assistant speaks when a session starts.
pub const DEFAULT_GREETING: &str = "Hi, my name is LookOut. I'm here to look out for you. \
     Where would you like to go today?";

/// The root configuration structure.
///
/// Maps directly to `~/.lookout/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Google Maps API key for the directions tool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_maps_api_key: Option<String>,

    /// Session wiring and ingestion limits
    #[serde(default)]
    pub session: SessionConfig,

    /// Directions provider settings
    #[serde(default)]
    pub directions: DirectionsConfig,

    /// Output cadence policy
    #[serde(default)]
    pub output: OutputConfig,
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("google_maps_api_key", &redact(&self.google_maps_api_key))
            .field("session", &self.session)
            .field("directions", &self.directions)
            .field("output", &self.output)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Byte-stream topic camera frames arrive on
    #[serde(default = "default_frame_topic")]
    pub frame_topic: String,

    /// Data topic location updates arrive on
    #[serde(default = "default_location_topic")]
    pub location_topic: String,

    /// What the assistant says first
    #[serde(default = "default_greeting")]
    pub greeting: String,

    /// Upper bound on concurrently ingesting frame streams
    #[serde(default = "default_max_active_streams")]
    pub max_active_streams: usize,

    /// Frames larger than this are dropped
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,

    /// How long teardown waits for cancelled ingestion tasks
    #[serde(default = "default_teardown_timeout")]
    pub teardown_timeout_secs: u64,
}

fn default_frame_topic() -> String {
    "camera-frame".into()
}
fn default_location_topic() -> String {
    "user-location".into()
}
fn default_greeting() -> String {
    DEFAULT_GREETING.into()
}
fn default_max_active_streams() -> usize {
    8
}
fn default_max_frame_bytes() -> usize {
    8 * 1024 * 1024
}
fn default_teardown_timeout() -> u64 {
    5
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            frame_topic: default_frame_topic(),
            location_topic: default_location_topic(),
            greeting: default_greeting(),
            max_active_streams: default_max_active_streams(),
            max_frame_bytes: default_max_frame_bytes(),
            teardown_timeout_secs: default_teardown_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectionsConfig {
    /// Base URL of the Google Maps web services
    #[serde(default = "default_directions_base_url")]
    pub base_url: String,

    #[serde(default = "default_directions_timeout")]
    pub timeout_secs: u64,
}

fn default_directions_base_url() -> String {
    "https://maps.googleapis.com".into()
}
fn default_directions_timeout() -> u64 {
    10
}

impl Default for DirectionsConfig {
    fn default() -> Self {
        Self {
            base_url: default_directions_base_url(),
            timeout_secs: default_directions_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Word cap for heartbeat updates
    #[serde(default = "default_heartbeat_max_words")]
    pub heartbeat_max_words: usize,

    /// Suppress an utterance identical to the previous one
    #[serde(default = "default_true")]
    pub suppress_repeats: bool,
}

fn default_heartbeat_max_words() -> usize {
    9
}
fn default_true() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            heartbeat_max_words: default_heartbeat_max_words(),
            suppress_repeats: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.lookout/config.toml).
    ///
    /// Environment overrides:
    /// - `LOOKOUT_GOOGLE_MAPS_API_KEY` (highest priority), then `GOOGLE_MAPS_API`
    /// - `LOOKOUT_FRAME_TOPIC`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with_env(&config_path, |name| std::env::var(name).ok())
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::read_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, apply overrides looked up through `env`, then validate.
    pub fn load_with_env(
        path: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::read_file(path)?;

        if config.google_maps_api_key.is_none() {
            config.google_maps_api_key = env("LOOKOUT_GOOGLE_MAPS_API_KEY")
                .or_else(|| env("GOOGLE_MAPS_API"))
                .filter(|k| !k.trim().is_empty());
        }

        if let Some(topic) = env("LOOKOUT_FRAME_TOPIC") {
            config.session.frame_topic = topic;
        }

        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".lookout")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.frame_topic.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "session.frame_topic must not be empty".into(),
            ));
        }

        if self.session.frame_topic == self.session.location_topic {
            return Err(ConfigError::ValidationError(
                "session.frame_topic and session.location_topic must differ".into(),
            ));
        }

        if self.session.max_active_streams == 0 {
            return Err(ConfigError::ValidationError(
                "session.max_active_streams must be > 0".into(),
            ));
        }

        if self.session.max_frame_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "session.max_frame_bytes must be > 0".into(),
            ));
        }

        if self.output.heartbeat_max_words == 0 {
            return Err(ConfigError::ValidationError(
                "output.heartbeat_max_words must be > 0".into(),
            ));
        }

        if !self.directions.base_url.starts_with("http://")
            && !self.directions.base_url.starts_with("https://")
        {
            return Err(ConfigError::ValidationError(
                "directions.base_url must start with http:// or https://".into(),
            ));
        }

        Ok(())
    }

    /// Check if a Maps key is available (from config or environment).
    pub fn has_maps_key(&self) -> bool {
        self.google_maps_api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            google_maps_api_key: None,
            session: SessionConfig::default(),
            directions: DirectionsConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
