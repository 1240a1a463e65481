//! Configuration management for the host.

use std::env;
use std::path::PathBuf;

/// Host configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// JSON file the world is hydrated from, keyed by entity kind
    pub world_file: Option<PathBuf>,
    /// Directory holding one `<pack>.json` array per compendium pack
    pub packs_dir: Option<PathBuf>,
    /// User ID stamped on events the host originates
    pub user_id: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let world_file = lookup("WORLD_FILE").map(PathBuf::from);
        if let Some(path) = &world_file {
            if !path.is_file() {
                return Err(ConfigError::InvalidPath {
                    var: "WORLD_FILE",
                    path: path.clone(),
                });
            }
        }

        let packs_dir = lookup("PACKS_DIR").map(PathBuf::from);
        if let Some(path) = &packs_dir {
            if !path.is_dir() {
                return Err(ConfigError::InvalidPath {
                    var: "PACKS_DIR",
                    path: path.clone(),
                });
            }
        }

        let user_id = lookup("HOST_USER_ID").unwrap_or_else(|| "host".to_string());
        if user_id.trim().is_empty() {
            return Err(ConfigError::EmptyUserId);
        }

        Ok(Self {
            world_file,
            packs_dir,
            user_id,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} does not point at a usable path: {}", path.display())]
    InvalidPath { var: &'static str, path: PathBuf },

    #[error("HOST_USER_ID must not be empty")]
    EmptyUserId,
}
