//! Error types for the focus engine

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur while ingesting frames or serving session queries
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid base64 image payload: {0}")]
    Base64Error(#[from] base64::DecodeError),

    #[error("Landmark provider failed: {0}")]
    ProviderError(String),

    #[error("Object detector failed: {0}")]
    DetectorError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Unknown session: {0}")]
    SessionNotFound(Uuid),

    #[error("Session closed: {0}")]
    SessionClosed(Uuid),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
