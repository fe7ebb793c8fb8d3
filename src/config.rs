//! Configuration file handling for termin8.
//!
//! Loads configuration from `~/.config/termin8/config.toml` or a custom path.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::relay::DEFAULT_CAPACITY;
use crate::transcript::DEFAULT_MAX_ESCAPE_BYTES;

/// Smallest accepted per-direction buffer capacity.
pub const MIN_BUFFER_CAPACITY: usize = 16;
/// Largest accepted per-direction buffer capacity.
pub const MAX_BUFFER_CAPACITY: usize = 1024 * 1024;

/// Configuration file structure for termin8.
/// Loaded from ~/.config/termin8/config.toml (or custom path via --config).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub shell: ShellConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub transcript: TranscriptConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShellConfig {
    pub command: Option<String>,
    /// Start the shell in `$HOME` rather than the current directory.
    #[serde(default = "default_true")]
    pub home_dir: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            command: None,
            home_dir: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_capacity")]
    pub buffer_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TranscriptConfig {
    pub path: Option<PathBuf>,
    #[serde(default = "default_max_escape_bytes")]
    pub max_escape_bytes: usize,
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_escape_bytes: DEFAULT_MAX_ESCAPE_BYTES,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LoggingConfig {
    /// Diagnostics file; without one nothing is logged.
    pub file: Option<PathBuf>,
    pub level: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_max_escape_bytes() -> usize {
    DEFAULT_MAX_ESCAPE_BYTES
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed or holds
    /// out-of-range values.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if !path.exists() {
            log::debug!("no config file at {}, using defaults", path.display());
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config = Self::parse(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.clone(),
                source,
            },
            other => other,
        })?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Load a file named on the command line. Unlike [`Config::load`], a
    /// missing file is an error.
    pub fn load_explicit(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
            });
        }
        Self::load(Some(path))
    }

    /// Parse and validate TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let capacity = self.relay.buffer_capacity;
        if !(MIN_BUFFER_CAPACITY..=MAX_BUFFER_CAPACITY).contains(&capacity) {
            return Err(ConfigError::Invalid(format!(
                "relay.buffer_capacity must be between {} and {}, got {}",
                MIN_BUFFER_CAPACITY, MAX_BUFFER_CAPACITY, capacity
            )));
        }
        if self.transcript.max_escape_bytes == 0 {
            return Err(ConfigError::Invalid(
                "transcript.max_escape_bytes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("termin8").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/termin8/config.toml")
        })
}

/// Commented template written by `termin8 config init`.
pub const DEFAULT_CONFIG: &str = r#"# termin8 configuration

[shell]
# Shell to spawn (default: $SHELL, then /bin/sh)
# command = "/bin/zsh"
# Start the shell in $HOME
home_dir = true

[relay]
# Per-direction buffer size in bytes (16 to 1048576)
buffer_capacity = 1024

[transcript]
# Record the session here when no path is given on the command line
# path = "/tmp/termin8.transcript"
# Bytes kept from an escape sequence that never terminated
max_escape_bytes = 10

[logging]
# Diagnostics file (nothing is logged without one)
# file = "/tmp/termin8.log"
# level = "info"
"#;
