//! Command implementations.

mod dead_letters;
mod serve;
mod show;
mod submit;

pub use dead_letters::execute_dead_letters;
pub use serve::execute_serve;
pub use show::execute_show;
pub use submit::execute_submit;

use crate::cli::Command;
use crate::error::Result;
use rapport_store::SqliteStore;
use rapport_worker::WorkerConfig;

/// Run one command against the configured database.
///
/// `serve` hands the configuration to the supervisor, which opens its own
/// store; the other commands open the database here.
pub async fn execute(command: Command, config: WorkerConfig) -> Result<String> {
    let open = || SqliteStore::with_busy_timeout(&config.database_path, config.busy_timeout());

    match command {
        Command::Submit(args) => execute_submit(args, &open()?),
        Command::Show(args) => execute_show(args, &open()?),
        Command::DeadLetters(args) => execute_dead_letters(args, &open()?),
        Command::Serve => execute_serve(config).await,
    }
}
