//! Configuration for the action and propagation workers
//!
//! Defines batch sizes, redelivery limits and poll intervals.

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for the worker processes
///
/// # Examples
///
/// ```
/// use rapport_worker::WorkerConfig;
///
/// let config = WorkerConfig::from_toml_str(r#"
///     database_path = "friends.db"
///
///     [stream]
///     retry_attempts = 3
/// "#).unwrap();
///
/// assert_eq!(config.stream.retry_attempts, 3);
/// assert_eq!(config.queue.batch_size, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// SQLite database holding edges, the change log and the queues
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// How long a writer waits on a locked database before giving up
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Action queue consumer settings
    #[serde(default)]
    pub queue: QueueConfig,

    /// Change stream consumer settings
    #[serde(default)]
    pub stream: StreamConfig,
}

/// Action queue consumer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Messages received per poll
    /// Default: 5
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// How long a received message stays hidden from other receivers
    /// Default: 30 seconds
    #[serde(default = "default_visibility_timeout_secs")]
    pub visibility_timeout_secs: u64,

    /// Deliveries after which a failing message is dead-lettered
    /// Default: 3
    #[serde(default = "default_max_receive_count")]
    pub max_receive_count: u32,

    /// Delay between polls (in milliseconds)
    /// Default: 200
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Change stream consumer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Events read per poll
    /// Default: 5
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Redeliveries of a failing batch before its failures are dead-lettered
    /// Default: 1
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Delay between polls (in milliseconds)
    /// Default: 200
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("rapport.db")
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_batch_size() -> usize {
    5
}

fn default_visibility_timeout_secs() -> u64 {
    30
}

fn default_max_receive_count() -> u32 {
    3
}

fn default_poll_interval_ms() -> u64 {
    200
}

fn default_retry_attempts() -> u32 {
    1
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            queue: QueueConfig::default(),
            stream: StreamConfig::default(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            visibility_timeout_secs: default_visibility_timeout_secs(),
            max_receive_count: default_max_receive_count(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            retry_attempts: default_retry_attempts(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl WorkerConfig {
    /// Load and validate configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: WorkerConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the workers cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue.batch_size == 0 || self.stream.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be at least 1".into()));
        }
        if self.queue.poll_interval_ms == 0 || self.stream.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll_interval_ms must be at least 1".into()));
        }
        if self.queue.max_receive_count == 0 {
            return Err(ConfigError::Invalid("max_receive_count must be at least 1".into()));
        }
        Ok(())
    }

    /// Get busy timeout as Duration
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl QueueConfig {
    /// Get visibility timeout as Duration
    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_secs)
    }

    /// Get poll interval as Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl StreamConfig {
    /// Get poll interval as Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
