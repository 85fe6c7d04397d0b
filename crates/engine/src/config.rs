//! Configuration management for HopShell.
//!
//! This module provides TOML-based configuration file loading and saving.
//! The default configuration path is `~/.config/hopshell/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fs::MAX_READ_LINES;
use crate::session::MAX_HOPS;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("max_hops must be between 1 and {max}, got {0}", max = MAX_HOPS)]
    InvalidMaxHops(usize),

    #[error("max_auth_attempts must be between 1 and {max}, got {0}", max = AUTH_ATTEMPTS_LIMIT)]
    InvalidMaxAuthAttempts(u32),

    #[error("max_input_length must be between 1 and {max}, got {0}", max = INPUT_LENGTH_LIMIT)]
    InvalidMaxInputLength(usize),

    #[error("max_read_lines must be greater than 0, got {0}")]
    InvalidMaxReadLines(usize),

    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),
}

/// Largest accepted `max_auth_attempts`.
pub const AUTH_ATTEMPTS_LIMIT: u32 = 10;

/// Largest accepted `max_input_length`, in characters.
pub const INPUT_LENGTH_LIMIT: usize = 65536;

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Main configuration structure for HopShell.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// General engine configuration.
    pub engine: EngineConfig,

    /// Login and hop limits.
    pub session: SessionConfig,

    /// Virtual filesystem limits.
    pub filesystem: FilesystemConfig,
}

/// General engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Logging level (trace, debug, info, warn, error).
    pub log_level: String,

    /// World file describing devices and filesystems. The built-in world is
    /// used when this file does not exist.
    pub world_file: PathBuf,

    /// Start with debug output enabled.
    pub debug: bool,
}

/// Login and hop limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum depth of the SSH hop chain.
    pub max_hops: usize,

    /// Wrong passwords allowed per SSH login before the attempt is dropped.
    pub max_auth_attempts: u32,

    /// Longest accepted input line, in characters.
    pub max_input_length: usize,
}

/// Virtual filesystem limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FilesystemConfig {
    /// Longest file, in lines, that `cat` and `read` will display.
    pub max_read_lines: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            world_file: default_world_path(),
            debug: false,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_hops: MAX_HOPS,
            max_auth_attempts: 3,
            max_input_length: 4096,
        }
    }
}

impl Default for FilesystemConfig {
    fn default() -> Self {
        Self {
            max_read_lines: MAX_READ_LINES,
        }
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Returns the default world file path.
pub fn default_world_path() -> PathBuf {
    config_dir().join("world.json")
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hopshell")
}

/// Range checks for the session and filesystem limits.
pub(crate) fn check_limits(
    max_hops: usize,
    max_auth_attempts: u32,
    max_input_length: usize,
    max_read_lines: usize,
) -> Result<(), ConfigError> {
    if !(1..=MAX_HOPS).contains(&max_hops) {
        return Err(ConfigError::InvalidMaxHops(max_hops));
    }
    if !(1..=AUTH_ATTEMPTS_LIMIT).contains(&max_auth_attempts) {
        return Err(ConfigError::InvalidMaxAuthAttempts(max_auth_attempts));
    }
    if !(1..=INPUT_LENGTH_LIMIT).contains(&max_input_length) {
        return Err(ConfigError::InvalidMaxInputLength(max_input_length));
    }
    if max_read_lines == 0 {
        return Err(ConfigError::InvalidMaxReadLines(max_read_lines));
    }
    Ok(())
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - HOPSHELL_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    /// - HOPSHELL_WORLD: Override the world file path
    ///
    /// Returns the `(key, value)` pairs that were overridden. Logging is
    /// usually not set up yet at this point, so callers report them later.
    pub fn apply_env_overrides(&mut self) -> Vec<(&'static str, String)> {
        let mut applied = Vec::new();

        if let Ok(level) = std::env::var("HOPSHELL_LOG_LEVEL") {
            if !level.is_empty() {
                self.engine.log_level = level.clone();
                applied.push(("log_level", level));
            }
        }

        if let Ok(world) = std::env::var("HOPSHELL_WORLD") {
            if !world.is_empty() {
                self.engine.world_file = PathBuf::from(&world);
                applied.push(("world_file", world));
            }
        }

        applied
    }

    /// Validate the configuration values.
    ///
    /// Returns an error if any configuration value is outside the valid range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_limits(
            self.session.max_hops,
            self.session.max_auth_attempts,
            self.session.max_input_length,
            self.filesystem.max_read_lines,
        )?;

        let level = self.engine.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.engine.log_level.clone()));
        }

        Ok(())
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    /// If the file exists but is invalid TOML, returns an error with
    /// a helpful message.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }

    /// Save configuration to a file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}
