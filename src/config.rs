//! Configuration file handling

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use hatctl_core::{BoardType, StackAddress};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pressure::TransducerModel;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bus: BusConfig,
    pub drivers: DriversConfig,
    pub output: OutputConfig,
    pub transducers: Vec<TransducerConfig>,
}

impl Config {
    /// Get the config file path for this platform
    pub fn path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "hatctl").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load an explicitly given config file, or the platform default if it
    /// exists. A missing default file means built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match Self::path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Transducer model wired to a megabas input, if configured
    pub fn transducer(&self, stack: StackAddress, channel: u8) -> Option<TransducerModel> {
        self.transducers
            .iter()
            .find(|t| t.stack == stack.get() && t.channel == channel)
            .map(|t| t.model)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// I2C character device the HATs hang off
    pub device: PathBuf,
    /// Serialize invocations on the bus with a lock file
    pub lock: bool,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from("/dev/i2c-1"),
            lock: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DriversConfig {
    /// Board types that are never probed or driven
    pub disabled: Vec<BoardType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Indent json output
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { pretty: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransducerConfig {
    pub stack: u8,
    pub channel: u8,
    pub model: TransducerModel,
}
