//! Unified error handling for the host.

use crate::config::ConfigError;

/// Host error type.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error(transparent)]
    Engine(#[from] tabletop_engine::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid world file: {0}")]
    InvalidWorld(String),

    #[error("World task has stopped")]
    WorldClosed,
}

impl HostError {
    /// Convert into an engine error for engine-facing traits.
    pub fn into_engine(self) -> tabletop_engine::Error {
        match self {
            HostError::Engine(e) => e,
            other => tabletop_engine::Error::Request(other.to_string()),
        }
    }
}

/// Result type alias for the host.
pub type Result<T> = std::result::Result<T, HostError>;
