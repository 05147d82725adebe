//! calmirror entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use calmirror_sync::cli::Cli;
use calmirror_sync::config::SyncConfig;
use calmirror_sync::error::SyncResult;
use calmirror_sync::run;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.debug {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match run_cli(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_cli(cli: Cli) -> SyncResult<()> {
    let mut config = SyncConfig::load()?;
    if let Some(path) = cli.ledger {
        config.ledger_path = path;
    }

    let summary = run::run(&config, cli.dry_run).await?;
    print!("{}", summary.render());
    Ok(())
}
