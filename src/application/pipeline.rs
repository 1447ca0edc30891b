//! Signal Pipeline
//!
//! Snapshot → volatility + levels → risk geometry → entry qualification.
//! One pure evaluation per snapshot; no state is carried between calls.

use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::domain::{CandidateSignal, MarketSnapshot};
use crate::strategy::{
    EntryConfig, EntryQualifier, EntryRejection, GeometryConfig, GeometryError, LevelConfig,
    LevelDetector, LevelRiskCalculator, VolatilityConfig, VolatilityError, VolatilityEstimator,
};

/// Why a snapshot produced no candidate
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RejectReason {
    #[error("Invalid market data: {0}")]
    InvalidData(VolatilityError),

    #[error("No defensible risk geometry: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Entry rejected: {0}")]
    Entry(#[from] EntryRejection),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvaluationError {
    /// Not enough history yet; try again on a later snapshot
    #[error("Evaluation deferred: {0}")]
    Deferred(VolatilityError),

    #[error("{0}")]
    Rejected(#[from] RejectReason),
}

impl EvaluationError {
    pub fn is_deferred(&self) -> bool {
        matches!(self, EvaluationError::Deferred(_))
    }
}

impl From<VolatilityError> for EvaluationError {
    fn from(err: VolatilityError) -> Self {
        match err {
            VolatilityError::InsufficientData { .. } => EvaluationError::Deferred(err),
            other => EvaluationError::Rejected(RejectReason::InvalidData(other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SignalPipeline {
    estimator: VolatilityEstimator,
    detector: LevelDetector,
    calculator: LevelRiskCalculator,
    qualifier: EntryQualifier,
}

impl SignalPipeline {
    pub fn new(
        volatility: VolatilityConfig,
        levels: LevelConfig,
        geometry: GeometryConfig,
        entry: EntryConfig,
    ) -> Self {
        let max_stop = geometry.max_stop_distance_pct;
        Self {
            estimator: VolatilityEstimator::new(volatility),
            detector: LevelDetector::new(levels),
            calculator: LevelRiskCalculator::new(geometry),
            qualifier: EntryQualifier::new(entry, max_stop),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.volatility.clone(),
            config.levels.clone(),
            config.geometry.clone(),
            config.entry.clone(),
        )
    }

    pub fn evaluate(&self, snapshot: &MarketSnapshot) -> Result<CandidateSignal, EvaluationError> {
        let volatility = self.estimator.estimate(&snapshot.bars)?;

        let direction = self
            .qualifier
            .direction_for(snapshot)
            .map_err(RejectReason::from)?;

        let price = snapshot.last_price;
        let range = self.detector.config().use_working_range.then(|| {
            volatility.working_range(price, self.estimator.config().working_range_atr_multiplier)
        });
        let levels = self.detector.detect_within(&snapshot.depth, price, range);
        debug!(
            "{}: {} supports / {} resistances, ATR {:.6} ({})",
            snapshot.symbol,
            levels.supports.len(),
            levels.resistances.len(),
            volatility.atr,
            volatility.regime
        );

        let geometry = self
            .calculator
            .compute(direction, price, &levels, &volatility)
            .map_err(RejectReason::from)?;

        let candidate = self
            .qualifier
            .qualify(snapshot, &volatility, &geometry, levels.total())
            .map_err(RejectReason::from)?;

        Ok(candidate)
    }
}
