//! Serve command implementation.

use crate::error::Result;
use rapport_worker::{Supervisor, WorkerConfig};

/// Run every worker until Ctrl+C, then print the final metrics.
pub async fn execute_serve(config: WorkerConfig) -> Result<String> {
    let metrics = Supervisor::new(config).run().await?;
    Ok(metrics.summary())
}
