//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits:
//! - Feed: JSON-lines snapshot replay
//! - Sinks: event journal and log output
//! - CLI: Command-line interface definitions

pub mod cli;
pub mod feed;
pub mod sinks;

pub use cli::CliApp;
pub use feed::ReplayFeed;
pub use sinks::{JsonlJournalSink, LogSink};
