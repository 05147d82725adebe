//! Command-line interface definition.

use std::path::PathBuf;

use clap::Parser;

/// Mirror read-only calendar feeds into Google Calendar.
#[derive(Debug, Parser)]
#[command(name = "calmirror", version, about)]
pub struct Cli {
    /// Enable debug logging.
    #[arg(long)]
    pub debug: bool,

    /// Compute and log the sync plan without writing to the remote side.
    #[arg(long)]
    pub dry_run: bool,

    /// Path to the run ledger file (overrides LEDGER_PATH).
    #[arg(long)]
    pub ledger: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let cli = Cli::parse_from(["calmirror", "--debug", "--dry-run"]);
        assert!(cli.debug);
        assert!(cli.dry_run);
        assert!(cli.ledger.is_none());
    }

    #[test]
    fn parses_ledger_path() {
        let cli = Cli::parse_from(["calmirror", "--ledger", "/tmp/ledger.json"]);
        assert_eq!(cli.ledger, Some(PathBuf::from("/tmp/ledger.json")));
    }
}
