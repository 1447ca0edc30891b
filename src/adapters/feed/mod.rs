//! Snapshot feed adapters

mod replay;

pub use replay::ReplayFeed;
