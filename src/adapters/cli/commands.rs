//! CLI Commands
//!
//! Argument definitions for the flowscan binary.
//! Uses clap derive macros for argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Flowscan - orderbook imbalance signal engine
#[derive(Parser, Debug)]
#[command(
    name = "flowscan",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Orderbook imbalance signal engine",
    long_about = "Flowscan qualifies directional entries from orderbook imbalance, \
                  trade flow and orderbook levels, then tracks each position through \
                  a persistence-filtered exit state machine."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay recorded snapshots through the engine
    Run(RunCmd),

    /// Load and validate a configuration file
    CheckConfig(CheckConfigCmd),
}

#[derive(Parser, Debug)]
pub struct RunCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/default.toml")]
    pub config: PathBuf,

    /// JSON-lines file of market snapshots
    #[arg(short, long, value_name = "FILE")]
    pub replay: PathBuf,

    /// Append lifecycle events to this file (overrides [logging] journal_path)
    #[arg(short, long, value_name = "FILE")]
    pub journal: Option<PathBuf>,

    /// Skip malformed snapshot lines instead of aborting
    #[arg(long)]
    pub skip_malformed: bool,
}

#[derive(Parser, Debug)]
pub struct CheckConfigCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/default.toml")]
    pub config: PathBuf,
}
