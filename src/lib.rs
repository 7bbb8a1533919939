pub mod agent_engine;
pub mod cli;
pub mod config;
pub mod errors;
pub mod executor;
pub mod llm;
pub mod perception;

#[cfg(test)]
mod test_support;

use clap::Parser;

use crate::cli::Cli;
use crate::errors::DeskPilotResult;

pub async fn run() -> DeskPilotResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load .env file if present (ignore error if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    tracing::debug!(command = ?cli.command, "starting");
    cli::execute(cli).await
}
