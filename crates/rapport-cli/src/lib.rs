//! Rapport CLI library.
//!
//! Argument parsing, configuration resolution and the command implementations
//! behind the `rapport` binary.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::{Cli, Command};
pub use error::{CliError, Result};
