//! Runs the action worker and every propagation worker side by side

use crate::{ActionWorker, PropagationWorker, WorkerConfig, WorkerError, WorkerMetrics};
use rapport_domain::{DeliveryLedger, RelationshipStore};
use rapport_protocol::Transition;
use rapport_store::SqliteStore;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Owns the shared store handle and the worker tasks
///
/// The store is opened once per process and shared by all workers; the
/// workers coordinate only through its guards.
///
/// # Examples
///
/// ```no_run
/// use rapport_worker::{Supervisor, WorkerConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let supervisor = Supervisor::new(WorkerConfig::default());
///
///     // Run until Ctrl+C
///     let metrics = supervisor.run().await?;
///     println!("{}", metrics.summary());
///     Ok(())
/// }
/// ```
pub struct Supervisor {
    config: WorkerConfig,
}

impl Supervisor {
    /// Create a supervisor for the given configuration
    pub fn new(config: WorkerConfig) -> Self {
        Self { config }
    }

    /// Open the configured database and run until Ctrl+C
    pub async fn run(self) -> Result<WorkerMetrics, WorkerError> {
        self.config.validate()?;
        let store = SqliteStore::with_busy_timeout(
            &self.config.database_path,
            self.config.busy_timeout(),
        )
        .map_err(WorkerError::store)?;
        let head = store.latest_sequence().map_err(WorkerError::store)?;
        tracing::info!(
            "Opened store at {} (change stream at {})",
            self.config.database_path.display(),
            head
        );

        self.run_until(Arc::new(store), async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
    }

    /// Run every worker on `store` until `shutdown` completes
    ///
    /// Returns the merged metrics of all workers.
    pub async fn run_until<S, F>(self, store: Arc<S>, shutdown: F) -> Result<WorkerMetrics, WorkerError>
    where
        S: RelationshipStore + DeliveryLedger + Send + Sync + 'static,
        F: Future<Output = ()>,
    {
        let (stop, stopped) = watch::channel(false);

        let mut handles: Vec<JoinHandle<Result<WorkerMetrics, WorkerError>>> = Vec::new();
        handles.push(tokio::spawn(
            ActionWorker::new(self.config.queue.clone()).run(store.clone(), stopped.clone()),
        ));
        for transition in Transition::ALL {
            handles.push(tokio::spawn(
                PropagationWorker::new(transition, self.config.stream.clone())
                    .run(store.clone(), stopped.clone()),
            ));
        }
        tracing::info!("Supervisor started {} workers", handles.len());

        shutdown.await;
        tracing::info!("Shutdown signal received, stopping workers");
        stop.send(true)
            .map_err(|e| WorkerError::Worker(format!("Failed to signal workers: {}", e)))?;

        let mut metrics = WorkerMetrics::new();
        for handle in handles {
            let worker_metrics = handle
                .await
                .map_err(|e| WorkerError::Worker(e.to_string()))??;
            metrics.merge(&worker_metrics);
        }

        tracing::info!("Workers stopped. Final metrics:\n{}", metrics.summary());
        Ok(metrics)
    }
}
