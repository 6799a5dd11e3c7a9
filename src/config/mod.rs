//! Nextwire Configuration System
//!
//! Loads configuration from YAML files with a cascading priority system:
//! 1. `./nextwire.yaml` (current directory - highest priority)
//! 2. `~/.config/nextwire/nextwire.yaml` (user config directory)
//! 3. `/etc/nextwire/nextwire.yaml` (system - lowest priority)
//!
//! Values from higher priority files override those from lower priority files.
//!
//! # YAML Structure
//!
//! ```yaml
//! keys:
//!   router_private_key: "<64 hex chars>"
//!   backend_private_key: "<64 hex chars>"
//!   relay_public_key: "<64 hex chars>"
//!   packet_hash_key: "<64 hex chars>"
//! ```
//!
//! The raw YAML is decoded once into an immutable [`Keys`] value, which is
//! then passed by reference into token chain and packet envelope calls.

mod keys;

use crate::crypto::CryptoError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use keys::{Keys, KeysConfig};

/// Default config filename.
const CONFIG_FILENAME: &str = "nextwire.yaml";

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseYaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("missing key: keys.{0}")]
    MissingKey(&'static str),

    #[error("invalid key keys.{name}: {reason}")]
    InvalidKey { name: &'static str, reason: String },

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Key material (`keys.*`).
    #[serde(default)]
    pub keys: KeysConfig,
}

impl Config {
    /// Create a new empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from the standard search paths.
    ///
    /// Returns the merged config and the paths that were actually loaded.
    pub fn load() -> Result<(Self, Vec<PathBuf>), ConfigError> {
        let search_paths = Self::search_paths();
        Self::load_from_paths(&search_paths)
    }

    /// Load configuration from specific paths.
    ///
    /// Paths are processed in order, with later paths overriding earlier ones.
    pub fn load_from_paths(paths: &[PathBuf]) -> Result<(Self, Vec<PathBuf>), ConfigError> {
        let mut config = Config::default();
        let mut loaded_paths = Vec::new();

        for path in paths {
            if path.exists() {
                let file_config = Self::load_file(path)?;
                config.merge(file_config);
                loaded_paths.push(path.clone());
            }
        }

        Ok((config, loaded_paths))
    }

    /// Load configuration from a single file.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;

        serde_yaml::from_str(&contents).map_err(|e| ConfigError::ParseYaml {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the standard search paths in priority order (lowest to highest).
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        paths.push(PathBuf::from("/etc/nextwire").join(CONFIG_FILENAME));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("nextwire").join(CONFIG_FILENAME));
        }

        paths.push(PathBuf::from(".").join(CONFIG_FILENAME));

        paths
    }

    /// Merge another configuration into this one.
    ///
    /// Values from `other` override values in `self` when present.
    pub fn merge(&mut self, other: Config) {
        self.keys.merge(other.keys);
    }

    /// Decode the configured key material.
    pub fn create_keys(&self) -> Result<Keys, ConfigError> {
        Keys::from_config(&self.keys)
    }

    /// Serialize this configuration to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}
