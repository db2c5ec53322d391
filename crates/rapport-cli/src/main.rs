//! Rapport CLI - Submit actions, inspect relationships and run the workers.

use clap::Parser;
use rapport_cli::{commands, config, Cli};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Log to stderr so command output stays clean on stdout
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rapport=info"));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> rapport_cli::Result<()> {
    let cli = Cli::parse();
    let config = config::resolve(cli.config.as_deref(), cli.database.as_deref())?;

    let output = commands::execute(cli.command, config).await?;

    println!("{}", output);
    Ok(())
}
