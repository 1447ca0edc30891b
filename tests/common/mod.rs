//! Shared fixtures for the integration tests
#![allow(dead_code)]

use flowscan::domain::{
    CandidateSignal, Direction, LevelReasons, MarketSnapshot, OrderBookDepth, PriceBar,
    PriorityTier, TradeFlow, VolatilityRegime,
};

/// Candidate at 100 with stop 95.9 and targets 103 / 106 (mirrored for shorts)
pub fn candidate(symbol: &str, direction: Direction, created_at: u64) -> CandidateSignal {
    let (stop, tp1, tp2) = match direction {
        Direction::Long => (95.9, 103.0, 106.0),
        Direction::Short => (104.1, 97.0, 94.0),
    };
    CandidateSignal {
        symbol: symbol.to_string(),
        direction,
        created_at,
        entry_price: 100.0,
        stop_price: stop,
        tp1,
        tp2,
        reasons: LevelReasons {
            stop: "beyond nearest cluster".to_string(),
            tp1: "first opposing cluster".to_string(),
            tp2: "second opposing cluster".to_string(),
        },
        reward_risk: 3.0 / 4.1,
        quality_score: 82.0,
        tier: PriorityTier::High,
        imbalance: direction.sign() * 0.40,
        atr: 0.5,
        regime: VolatilityRegime::Medium,
    }
}

/// Snapshot at 100 with 20 flat bars (true range 0.5) and strong two-sided flow
pub fn full_snapshot(symbol: &str, ts: u64, imbalance: f64, depth: OrderBookDepth) -> MarketSnapshot {
    MarketSnapshot {
        symbol: symbol.to_string(),
        timestamp: ts,
        imbalance,
        trade_flow: TradeFlow {
            large_buys: 6,
            large_sells: 6,
            notional: 500_000.0,
            volume_ratio: 3.2,
        },
        last_price: 100.0,
        bars: (0..20)
            .map(|_| PriceBar::new(100.0, 100.25, 99.75, 100.0, 10.0))
            .collect(),
        depth,
    }
}

/// Support cluster at 99.85-99.9, resistances near 101.02 and at 101.4
pub fn supportive_book() -> OrderBookDepth {
    OrderBookDepth::new(
        vec![(99.9, 400.0), (99.85, 300.0), (99.0, 500.0)],
        vec![(101.0, 400.0), (101.05, 300.0), (101.4, 500.0)],
    )
}

/// Long-qualifying snapshot for `symbol`
pub fn long_entry(symbol: &str, ts: u64) -> MarketSnapshot {
    full_snapshot(symbol, ts, 0.40, supportive_book())
}
