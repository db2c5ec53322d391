//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use rapport_protocol::FriendAction;

/// Rapport CLI - Submit relationship actions and inspect relationship state.
#[derive(Debug, Parser)]
#[command(name = "rapport")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Worker configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Database path, overriding the configuration file
    #[arg(short, long, global = true, env = "RAPPORT_DATABASE")]
    pub database: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Enqueue an action for the workers
    Submit(SubmitArgs),

    /// Show relationship state for a player
    Show(ShowArgs),

    /// List items that exhausted their redeliveries
    DeadLetters(DeadLettersArgs),

    /// Run the action and propagation workers until Ctrl+C
    Serve,
}

/// Arguments for the submit command.
#[derive(Debug, Parser)]
pub struct SubmitArgs {
    /// Acting player
    #[arg(short, long)]
    pub player: String,

    /// Player the action targets
    #[arg(short, long)]
    pub friend: String,

    /// Action to take
    #[arg(short, long, value_enum, ignore_case = true)]
    pub action: ActionArg,
}

/// Arguments for the show command.
#[derive(Debug, Parser)]
pub struct ShowArgs {
    /// Player owning the edges
    pub player: String,

    /// Only show the edge pointing at this player
    pub friend: Option<String>,
}

/// Arguments for the dead-letters command.
#[derive(Debug, Parser)]
pub struct DeadLettersArgs {
    /// Maximum number of entries
    #[arg(short, long, default_value = "20")]
    pub limit: usize,
}

/// Action argument.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum ActionArg {
    /// Ask for a relationship
    Request,
    /// Accept a pending request
    Accept,
    /// Decline a pending request
    Reject,
    /// End a relationship
    Unfriend,
}

impl From<ActionArg> for FriendAction {
    fn from(action: ActionArg) -> Self {
        match action {
            ActionArg::Request => FriendAction::Request,
            ActionArg::Accept => FriendAction::Accept,
            ActionArg::Reject => FriendAction::Reject,
            ActionArg::Unfriend => FriendAction::Unfriend,
        }
    }
}
