//! Rapport Worker
//!
//! Background processes that drive the relationship protocol from its two
//! inputs:
//!
//! - **Action worker**: receives action messages from the ingress queue and
//!   applies each actor's guarded write.
//! - **Propagation workers**: one per transition, each reading its filtered
//!   slice of the change stream and applying the mirrored write.
//!
//! Delivery is at-least-once on both inputs. A failed message is released
//! for redelivery until its receive count reaches the configured maximum; a
//! failed event rewinds the consumer's checkpoint until the retry ceiling is
//! reached. Items past their ceiling are written to the dead-letter table.
//!
//! # Configuration
//!
//! ```toml
//! database_path = "rapport.db"
//! busy_timeout_ms = 5000
//!
//! [queue]
//! batch_size = 5
//! visibility_timeout_secs = 30
//! max_receive_count = 3
//! poll_interval_ms = 200
//!
//! [stream]
//! batch_size = 5
//! retry_attempts = 1
//! poll_interval_ms = 200
//! ```
//!
//! # One-shot polling
//!
//! ```
//! use rapport_domain::DeliveryLedger;
//! use rapport_protocol::{ActionMessage, FriendAction, Transition};
//! use rapport_store::SqliteStore;
//! use rapport_worker::{ActionWorker, PropagationWorker, WorkerConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteStore::new(":memory:")?;
//! let config = WorkerConfig::default();
//!
//! let body = ActionMessage::new("p1", "p2", FriendAction::Request).to_json()?;
//! store.enqueue(&body)?;
//!
//! let mut actions = ActionWorker::new(config.queue.clone());
//! assert_eq!(actions.poll_once(&store)?, 1);
//!
//! let mut requests = PropagationWorker::new(Transition::Request, config.stream.clone());
//! assert_eq!(requests.poll_once(&store)?, 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod action_worker;
mod config;
mod error;
mod metrics;
mod stream_worker;
mod supervisor;

pub use action_worker::{ActionWorker, ACTION_SOURCE};
pub use config::{QueueConfig, StreamConfig, WorkerConfig};
pub use error::{ConfigError, WorkerError};
pub use metrics::{SourceCounts, WorkerMetrics};
pub use stream_worker::PropagationWorker;
pub use supervisor::Supervisor;
