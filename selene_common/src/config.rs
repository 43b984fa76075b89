//! Simulator configuration file.
//!
//! One TOML file holds everything the simulator needs: a `[shared]`
//! section for service identity and log level, and a `[device]` section
//! describing the simulated device.
//!
//! ```rust,no_run
//! use selene_common::config::{ConfigError, SimConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = SimConfig::load_validated(Path::new("config/selene.toml"))?;
//!     println!("{} simulates a {}", config.shared.service_name, config.device.kind);
//!     Ok(())
//! }
//! ```

use crate::device::config::DeviceConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Why a configuration could not be used. Always fatal at startup.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// No file at the given path.
    #[error("no configuration file at {0}")]
    FileNotFound(PathBuf),

    /// The file exists but could not be read.
    #[error("cannot read {path}: {reason}")]
    Unreadable {
        /// Offending file.
        path: PathBuf,
        /// I/O error text.
        reason: String,
    },

    /// Not valid TOML, or a value of the wrong shape.
    #[error("invalid TOML: {0}")]
    ParseError(String),

    /// Well-formed but semantically invalid (e.g. zero velocity).
    #[error("invalid configuration: {0}")]
    ValidationError(String),
}

/// Simulator log verbosity, as written in `[shared] log_level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Every motion step.
    Trace,
    /// Move start/finish, selector changes, rejected writes.
    Debug,
    /// Startup, composition and shutdown.
    #[default]
    Info,
    /// Tick overruns.
    Warn,
    /// Fatal problems only.
    Error,
}

impl LogLevel {
    /// Filter directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// The `[shared]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Default log level when neither `RUST_LOG` nor `-v` is given.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Name of this simulator instance, used in log output.
    pub service_name: String,
}

impl SharedConfig {
    /// `service_name` must contain at least one non-blank character.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "[shared] service_name must not be blank".to_string(),
            ));
        }
        Ok(())
    }
}

/// TOML loading for any deserializable configuration type.
pub trait ConfigLoader: Sized + DeserializeOwned {
    /// Read and parse `path`.
    ///
    /// A missing file is `FileNotFound`; other read failures are
    /// `Unreadable`; syntax or shape errors are `ParseError`.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(ConfigError::FileNotFound(path.to_path_buf()))
            }
            Err(e) => Err(ConfigError::Unreadable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }),
        }
    }

    /// Parse TOML text.
    fn from_toml(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: DeserializeOwned> ConfigLoader for T {}

/// Whole simulator configuration.
///
/// ```toml
/// [shared]
/// service_name = "pmac-sim"
///
/// [device]
/// kind = "pmac"
/// prefix = "simple:"
///
/// [device.motor]
/// initial_position = 1.0
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// `[shared]`
    pub shared: SharedConfig,
    /// `[device]`
    pub device: DeviceConfig,
}

impl SimConfig {
    /// Check everything that does not depend on the device kind. The
    /// device factory checks the kind-specific sections.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.device.validate()
    }

    /// `load` followed by `validate`.
    pub fn load_validated(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }
}
