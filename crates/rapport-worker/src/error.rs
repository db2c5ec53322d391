//! Error types for worker operations

use thiserror::Error;

/// Errors that can occur while loading worker configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors that can occur during worker operations
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Storage layer error
    #[error("Storage error: {0}")]
    Store(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Worker error (tokio runtime issues)
    #[error("Worker error: {0}")]
    Worker(String),
}

impl WorkerError {
    /// Wrap a store error
    pub fn store<E: std::fmt::Display>(e: E) -> Self {
        WorkerError::Store(e.to_string())
    }
}
