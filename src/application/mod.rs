//! Application Layer - wires the strategy and domain into running workers
//!
//! - `pipeline`: one pure evaluation of a snapshot into a candidate
//! - `session`: per-symbol entry confirmation and position tracking
//! - `engine`: per-symbol worker tasks, routing, watchdog and shutdown
//! - `dispatcher`: out-of-band event delivery with retry and backoff
//! - `runner`: feed → engine → dispatcher for one replay run

pub mod dispatcher;
pub mod engine;
pub mod pipeline;
pub mod runner;
pub mod session;

pub use dispatcher::{DispatchConfig, DispatchStats, EventDispatcher};
pub use engine::{EngineConfig, EngineError, ShutdownReport, SignalEngine, WorkerReport};
pub use pipeline::{EvaluationError, RejectReason, SignalPipeline};
pub use runner::{ReplayRunner, RunError, RunSummary};
pub use session::{SessionStats, SymbolSession};
