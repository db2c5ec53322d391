//! Error types for the CLI application.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] rapport_worker::ConfigError),

    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] rapport_store::StoreError),

    /// Worker error
    #[error("Worker error: {0}")]
    Worker(#[from] rapport_worker::WorkerError),

    /// Rejected action
    #[error("Invalid action: {0}")]
    Protocol(#[from] rapport_protocol::ProtocolError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
