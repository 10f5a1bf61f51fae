//! Error types for the build orchestrator

use thiserror::Error;

/// Main error type for the build orchestrator
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Zip error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("Invalid archive: {0}")]
    InvalidArchive(String),

    #[error("Remote service returned {status}: {body}")]
    RemoteStatus { status: u16, body: String },

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("Remote build failed: {0}")]
    RemoteFailed(String),

    #[error("Remote build timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Deployment error: {0}")]
    DeployError(String),

    #[error("Spawn error: {0}")]
    SpawnError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<tokio::task::JoinError> for BuildError {
    fn from(err: tokio::task::JoinError) -> Self {
        BuildError::Internal(err.to_string())
    }
}
