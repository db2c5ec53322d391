//! Resolves the worker configuration from the file and the command line.

use crate::error::Result;
use rapport_worker::WorkerConfig;
use std::path::PathBuf;

/// Load the configuration file if given, then apply `--database`.
pub fn resolve(config_path: Option<&str>, database: Option<&str>) -> Result<WorkerConfig> {
    let mut config = match config_path {
        Some(path) => WorkerConfig::from_file(path)?,
        None => WorkerConfig::default(),
    };

    if let Some(database) = database {
        config.database_path = PathBuf::from(database);
    }

    Ok(config)
}
