//! Event sink adapters

mod journal;
mod log;

pub use journal::JsonlJournalSink;
pub use log::LogSink;
