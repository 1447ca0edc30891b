//! Volatility Estimator
//!
//! Average True Range over the most recent bars, bucketed into a regime by
//! ATR as a percent of the last close.
//!
//! True Range = max(high - low, |high - prev_close|, |low - prev_close|)
//! ATR        = mean of the last `atr_period` true ranges

use thiserror::Error;

use crate::domain::{PriceBar, VolatilityRegime};
use crate::strategy::params::VolatilityConfig;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum VolatilityError {
    /// Not enough history yet; the caller should defer, not reject
    #[error("Insufficient data: {have} bars, need {need}")]
    InsufficientData { have: usize, need: usize },

    #[error("Invalid bar at index {0}")]
    InvalidBar(usize),

    #[error("Invalid reference price {0}")]
    InvalidPrice(f64),
}

/// Volatility magnitude and regime for one evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolatilityProfile {
    pub atr: f64,
    /// ATR as percent of `reference_price`
    pub atr_pct: f64,
    pub regime: VolatilityRegime,
    /// Last close of the window
    pub reference_price: f64,
}

impl VolatilityProfile {
    /// `price ± multiplier × ATR`
    pub fn working_range(&self, price: f64, multiplier: f64) -> (f64, f64) {
        let half_width = self.atr * multiplier;
        ((price - half_width).max(0.0), price + half_width)
    }
}

#[derive(Debug, Clone)]
pub struct VolatilityEstimator {
    config: VolatilityConfig,
}

impl VolatilityEstimator {
    pub fn new(config: VolatilityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VolatilityConfig {
        &self.config
    }

    /// Estimate from bars ordered oldest first
    pub fn estimate(&self, bars: &[PriceBar]) -> Result<VolatilityProfile, VolatilityError> {
        let period = self.config.atr_period;
        if bars.len() < period {
            return Err(VolatilityError::InsufficientData {
                have: bars.len(),
                need: period,
            });
        }

        let start = bars.len() - period;
        // The bar before the window only contributes its close
        let first_checked = start.saturating_sub(1);
        if let Some(offset) = bars[first_checked..].iter().position(|b| !b.is_valid()) {
            return Err(VolatilityError::InvalidBar(first_checked + offset));
        }

        let sum: f64 = (start..bars.len())
            .map(|i| {
                let prev_close = if i > 0 { Some(bars[i - 1].close) } else { None };
                true_range(&bars[i], prev_close)
            })
            .sum();
        let atr = sum / period as f64;

        let reference_price = bars[bars.len() - 1].close;
        if reference_price <= 0.0 {
            return Err(VolatilityError::InvalidPrice(reference_price));
        }
        let atr_pct = atr / reference_price * 100.0;

        Ok(VolatilityProfile {
            atr,
            atr_pct,
            regime: self.classify(atr_pct),
            reference_price,
        })
    }

    /// Regime for an ATR percentage
    pub fn classify(&self, atr_pct: f64) -> VolatilityRegime {
        if atr_pct < self.config.low_band_pct {
            VolatilityRegime::Low
        } else if atr_pct < self.config.high_band_pct {
            VolatilityRegime::Medium
        } else {
            VolatilityRegime::High
        }
    }
}

fn true_range(bar: &PriceBar, prev_close: Option<f64>) -> f64 {
    let range = bar.high - bar.low;
    match prev_close {
        Some(prev) => range
            .max((bar.high - prev).abs())
            .max((bar.low - prev).abs()),
        None => range,
    }
}
