//! Run performance
//!
//! Aggregates lifecycle events into win/loss, PnL, hold time and exit reason
//! counts. PnL figures are whole-position percent of entry, so a position
//! with a partial close counts once with its blended result.

use serde::Serialize;

use super::events::{FullyClosed, LifecycleEvent};
use super::position::CloseReason;

/// Returns are treated as daily for annualisation; the market runs every day
const PERIODS_PER_YEAR: f64 = 365.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceStats {
    pub opened: u32,
    pub partial_closes: u32,
    pub closed: u32,
    /// Closes with positive PnL
    pub wins: u32,
    /// Every other close, flat ones included
    pub losses: u32,
    pub total_pnl_pct: f64,
    pub best_pnl_pct: f64,
    pub worst_pnl_pct: f64,
    pub tp1_exits: u32,
    pub tp2_exits: u32,
    pub stop_exits: u32,
    pub breakeven_exits: u32,
    pub reversal_exits: u32,
    /// Stale and shutdown closes
    pub forced_exits: u32,
    total_hold_ms: u64,
    /// Close PnL in close order, for Sharpe and drawdown
    #[serde(skip)]
    returns: Vec<f64>,
}

impl PerformanceStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: &LifecycleEvent) {
        match event {
            LifecycleEvent::SignalOpened(_) => self.opened += 1,
            LifecycleEvent::PartialClosed(_) => self.partial_closes += 1,
            LifecycleEvent::FullyClosed(close) => self.record_close(close),
        }
    }

    fn record_close(&mut self, close: &FullyClosed) {
        let pnl = close.total_pnl_pct;
        if self.closed == 0 {
            self.best_pnl_pct = pnl;
            self.worst_pnl_pct = pnl;
        } else {
            self.best_pnl_pct = self.best_pnl_pct.max(pnl);
            self.worst_pnl_pct = self.worst_pnl_pct.min(pnl);
        }

        self.closed += 1;
        if pnl > 0.0 {
            self.wins += 1;
        } else {
            self.losses += 1;
        }
        self.total_pnl_pct += pnl;
        self.total_hold_ms += close.hold_ms;
        self.returns.push(pnl);

        match close.reason {
            CloseReason::TakeProfit1 => self.tp1_exits += 1,
            CloseReason::TakeProfit2 => self.tp2_exits += 1,
            CloseReason::StopLoss => self.stop_exits += 1,
            CloseReason::BreakevenStop => self.breakeven_exits += 1,
            CloseReason::ReversalConfirmed => self.reversal_exits += 1,
            CloseReason::Stale | CloseReason::Shutdown => self.forced_exits += 1,
        }
    }

    /// Win rate as a percentage (0-100)
    pub fn win_rate(&self) -> f64 {
        if self.closed == 0 {
            return 0.0;
        }
        f64::from(self.wins) / f64::from(self.closed) * 100.0
    }

    pub fn average_pnl_pct(&self) -> f64 {
        if self.closed == 0 {
            return 0.0;
        }
        self.total_pnl_pct / f64::from(self.closed)
    }

    pub fn average_hold_ms(&self) -> u64 {
        if self.closed == 0 {
            return 0;
        }
        self.total_hold_ms / u64::from(self.closed)
    }

    /// Annualised Sharpe ratio of per-close returns (population deviation).
    /// None with fewer than two closes or when every close returned the same.
    pub fn sharpe_ratio(&self) -> Option<f64> {
        if self.returns.len() < 2 {
            return None;
        }

        let n = self.returns.len() as f64;
        let mean = self.returns.iter().sum::<f64>() / n;
        let variance = self.returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
        let std_dev = variance.sqrt();

        if std_dev < 1e-12 {
            return None;
        }
        Some(mean / std_dev * PERIODS_PER_YEAR.sqrt())
    }

    /// Largest fall of cumulative PnL below its running peak, in percent points.
    /// The peak starts at the first close.
    pub fn max_drawdown_pct(&self) -> f64 {
        let mut cumulative = 0.0;
        let mut peak = f64::NEG_INFINITY;
        let mut max_drawdown: f64 = 0.0;

        for pnl in &self.returns {
            cumulative += pnl;
            peak = peak.max(cumulative);
            max_drawdown = max_drawdown.max(peak - cumulative);
        }
        max_drawdown
    }
}
