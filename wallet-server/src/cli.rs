//! CLI interface
//!
//! Defines the command-line argument structure for `walletd` using
//! `clap` derive.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Currency wallet HTTP service.
///
/// Serves registration, login, balance, deposit, withdrawal, and exchange
/// endpoints over a single embedded database file.
#[derive(Parser, Debug)]
#[command(
    name = "walletd",
    about = "Currency wallet HTTP service",
    version,
    propagate_version = true
)]
pub struct WalletCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the wallet binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server.
    Run(RunArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the wallet data directory (settings.json and database file).
    ///
    /// Created on first run if it does not exist.
    #[arg(long, short = 'd', env = "WALLET_DIR", default_value = ".wallet")]
    pub wallet_dir: PathBuf,

    /// Address to bind the HTTP listener on. Overrides the configured value.
    #[arg(long, env = "WALLET_BIND")]
    pub bind: Option<String>,

    /// Log output format: "pretty" or "json".
    #[arg(long, env = "WALLET_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        WalletCli::command().debug_assert();
    }

    #[test]
    fn test_run_defaults() {
        let cli = WalletCli::parse_from(["walletd", "run"]);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.wallet_dir, PathBuf::from(".wallet"));
                assert!(args.bind.is_none());
                assert_eq!(args.log_format, "pretty");
            }
            _ => panic!("expected run subcommand"),
        }
    }
}
