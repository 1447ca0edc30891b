//! Ports Layer - Trait definitions for external collaborators
//!
//! Following hexagonal architecture, these traits abstract:
//! - Time (`Clock`)
//! - Market snapshot delivery (`SnapshotFeed`)
//! - Lifecycle event delivery (`EventSink`)

pub mod clock;
pub mod events;
pub mod market_data;
pub mod mocks;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use events::{EventSink, SinkError};
pub use market_data::{FeedError, SnapshotFeed};
