//! CLI Adapter
//!
//! Command-line interface for the flowscan binary.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{CheckConfigCmd, CliApp, Command, RunCmd};
