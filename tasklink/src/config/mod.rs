//! Engine configuration.
//!
//! Layered with the following priority (highest first):
//! 1. TOML config file (`~/.config/tasklink/config.toml`, or an explicit path)
//! 2. Compiled defaults
//!
//! `RUST_LOG`, when set, replaces the configured log level at
//! [`init_logging`](crate::logging::init_logging) time.

use std::path::{Path, PathBuf};

use crate::directory::DEFAULT_PLACEHOLDER_NAME;
use crate::store::DEFAULT_CAS_ATTEMPTS;

/// Errors that can occur when loading engine configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct EngineConfigFile {
    store: StoreFileConfig,
    directory: DirectoryFileConfig,
    logging: LoggingFileConfig,
}

/// `[store]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StoreFileConfig {
    cas_attempts: Option<u32>,
}

/// `[directory]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct DirectoryFileConfig {
    placeholder_name: Option<String>,
}

/// `[logging]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct LoggingFileConfig {
    level: Option<String>,
    file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Compare-and-set attempts per list mutation before giving up.
    pub cas_attempts: u32,
    /// Name shown for users the directory cannot resolve.
    pub placeholder_name: String,
    /// Log level filter string.
    pub log_level: String,
    /// Log file; `None` logs to stderr.
    pub log_file: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cas_attempts: DEFAULT_CAS_ATTEMPTS,
            placeholder_name: DEFAULT_PLACEHOLDER_NAME.to_string(),
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file over compiled defaults.
    ///
    /// If `path` is given and the file does not exist, returns an error.
    /// Otherwise the default path is tried and a missing file is treated as
    /// empty config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = load_config_file(path)?;
        Ok(Self::resolve(file))
    }

    /// Parse configuration from TOML text over compiled defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ParseToml`] if the text is not valid config.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(Self::resolve(toml::from_str(contents)?))
    }

    /// Priority: file > default.
    fn resolve(file: EngineConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            // Zero attempts would reject every write.
            cas_attempts: file
                .store
                .cas_attempts
                .filter(|attempts| *attempts > 0)
                .unwrap_or(defaults.cas_attempts),
            placeholder_name: file
                .directory
                .placeholder_name
                .unwrap_or(defaults.placeholder_name),
            log_level: file.logging.level.unwrap_or(defaults.log_level),
            log_file: file.logging.file.or(defaults.log_file),
        }
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
fn load_config_file(explicit_path: Option<&Path>) -> Result<EngineConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(EngineConfigFile::default());
        };
        config_dir.join("tasklink").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(EngineConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
