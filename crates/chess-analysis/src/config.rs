//! Configuration loading for the analysis service.
//!
//! Settings come from `analyzer.toml` in the working directory when present,
//! then environment variables override individual keys.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::evaluation::MateScoring;

/// Shallowest search the service accepts.
pub const MIN_DEPTH: u32 = 1;
/// Deepest search the service accepts.
pub const MAX_DEPTH: u32 = 25;
/// Search depth used when the caller does not pick one.
pub const DEFAULT_DEPTH: u32 = 13;

/// Overrides `engine.path`.
pub const ENV_ENGINE_PATH: &str = "STOCKFISH_PATH";
/// Overrides `analysis.default_depth`.
pub const ENV_DEFAULT_DEPTH: &str = "ANALYSIS_DEPTH";
/// Overrides `engine.lifecycle` (`eager` or `lazy`).
pub const ENV_LIFECYCLE: &str = "ENGINE_LIFECYCLE";

/// Errors that can occur when loading or parsing configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse the configuration file as valid TOML.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// Default depth outside the supported range.
    #[error("Default depth {0} is outside {min}..={max}", min = MIN_DEPTH, max = MAX_DEPTH)]
    InvalidDepth(u32),
    /// An environment variable held something unusable.
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// When the engine process is launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    /// Launched at startup, stopped at shutdown.
    #[default]
    Eager,
    /// Launched by the first request, lives as long as the process.
    Lazy,
}

impl std::str::FromStr for Lifecycle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eager" => Ok(Lifecycle::Eager),
            "lazy" => Ok(Lifecycle::Lazy),
            other => Err(format!("unknown lifecycle '{}'", other)),
        }
    }
}

/// How to launch and drive the external engine.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Executable path or name looked up in `PATH`.
    pub path: String,
    /// Extra command-line arguments.
    pub args: Vec<String>,
    /// `setoption` pairs sent after the handshake, e.g. `Threads = "2"`.
    pub options: BTreeMap<String, String>,
    pub lifecycle: Lifecycle,
    /// Send `ucinewgame` before every search so results do not depend on
    /// what was searched before.
    pub reset_between_searches: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: "stockfish".to_string(),
            args: Vec::new(),
            options: BTreeMap::new(),
            lifecycle: Lifecycle::default(),
            reset_between_searches: true,
        }
    }
}

/// Analysis defaults.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Depth used when a request does not specify one.
    pub default_depth: u32,
    pub mate: MateScoring,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            default_depth: DEFAULT_DEPTH,
            mate: MateScoring::default(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub engine: EngineConfig,
    pub analysis: AnalysisConfig,
}

impl AnalyzerConfig {
    /// Loads `analyzer.toml` if it exists, then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if the file exists but cannot be read,
    /// [`ConfigError::ParseError`] if it contains invalid TOML, and a
    /// validation error when an override or the resulting depth is unusable.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        let config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        config.with_env(|key| std::env::var(key).ok())
    }

    /// Returns the path to the configuration file.
    pub fn config_path() -> PathBuf {
        PathBuf::from("analyzer.toml")
    }

    /// Reads and validates one TOML file, without environment overrides.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides from `lookup`, which maps variable names to values.
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_ENGINE_PATH).filter(|p| !p.trim().is_empty()) {
            self.engine.path = path;
        }
        if let Some(raw) = lookup(ENV_DEFAULT_DEPTH) {
            self.analysis.default_depth =
                raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    key: ENV_DEFAULT_DEPTH.to_string(),
                    value: raw.clone(),
                })?;
        }
        if let Some(raw) = lookup(ENV_LIFECYCLE) {
            self.engine.lifecycle = raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_LIFECYCLE.to_string(),
                value: raw.clone(),
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let depth = self.analysis.default_depth;
        if !(MIN_DEPTH..=MAX_DEPTH).contains(&depth) {
            return Err(ConfigError::InvalidDepth(depth));
        }
        Ok(())
    }
}
