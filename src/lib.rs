//! Flowscan - Orderbook Imbalance Signal Engine Library
//!
//! Qualifies directional entries from orderbook imbalance, trade flow and
//! orderbook levels, then manages each admitted position through a
//! persistence-filtered exit state machine.
//!
//! # Modules
//!
//! - `domain`: Core business logic (snapshots, candidates, positions, tracker, admission)
//! - `ports`: Trait abstractions (Clock, SnapshotFeed, EventSink)
//! - `strategy`: Signal generation (volatility, levels, risk geometry, entry qualification)
//! - `application`: Pipeline, per-symbol engine, event dispatcher, replay runner
//! - `adapters`: External implementations (replay feed, journal and log sinks, CLI)
//! - `config`: Configuration loading and validation

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod strategy;
