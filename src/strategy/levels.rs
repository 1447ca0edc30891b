//! Level Detector
//!
//! Clusters resting orderbook liquidity into support and resistance levels.
//! Points below the current price form supports, points above form
//! resistances; the two sides are clustered independently so no level ever
//! straddles the price.

use std::fmt;

use crate::domain::OrderBookDepth;
use crate::strategy::params::LevelConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelKind {
    Support,
    Resistance,
}

impl fmt::Display for LevelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelKind::Support => write!(f, "support"),
            LevelKind::Resistance => write!(f, "resistance"),
        }
    }
}

/// One liquidity cluster
#[derive(Debug, Clone, PartialEq)]
pub struct PriceLevel {
    /// Notional-weighted mean price of the cluster
    pub price: f64,
    /// Sum of resting notional
    pub strength: f64,
    pub kind: LevelKind,
    pub low: f64,
    pub high: f64,
    /// Number of price points merged into the cluster
    pub points: usize,
}

impl PriceLevel {
    /// Edge of the cluster farthest from the current price
    pub fn far_edge(&self) -> f64 {
        match self.kind {
            LevelKind::Support => self.low,
            LevelKind::Resistance => self.high,
        }
    }
}

/// Detected levels, nearest to the price first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectedLevels {
    pub supports: Vec<PriceLevel>,
    pub resistances: Vec<PriceLevel>,
}

impl DetectedLevels {
    pub fn is_empty(&self) -> bool {
        self.supports.is_empty() && self.resistances.is_empty()
    }

    pub fn total(&self) -> usize {
        self.supports.len() + self.resistances.len()
    }

    pub fn of_kind(&self, kind: LevelKind) -> &[PriceLevel] {
        match kind {
            LevelKind::Support => &self.supports,
            LevelKind::Resistance => &self.resistances,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LevelDetector {
    config: LevelConfig,
}

#[derive(Debug, Clone, Copy)]
struct ClusterAcc {
    notional: f64,
    weighted: f64,
    low: f64,
    high: f64,
    points: usize,
}

impl ClusterAcc {
    fn start(price: f64, notional: f64) -> Self {
        Self {
            notional,
            weighted: price * notional,
            low: price,
            high: price,
            points: 1,
        }
    }

    fn push(&mut self, price: f64, notional: f64) {
        self.notional += notional;
        self.weighted += price * notional;
        self.low = self.low.min(price);
        self.high = self.high.max(price);
        self.points += 1;
    }

    fn into_level(self, kind: LevelKind) -> PriceLevel {
        PriceLevel {
            price: self.weighted / self.notional,
            strength: self.notional,
            kind,
            low: self.low,
            high: self.high,
            points: self.points,
        }
    }
}

impl LevelDetector {
    pub fn new(config: LevelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LevelConfig {
        &self.config
    }

    pub fn detect(&self, depth: &OrderBookDepth, price: f64) -> DetectedLevels {
        self.detect_within(depth, price, None)
    }

    /// Detect levels, optionally ignoring liquidity outside `range`
    pub fn detect_within(
        &self,
        depth: &OrderBookDepth,
        price: f64,
        range: Option<(f64, f64)>,
    ) -> DetectedLevels {
        if !price.is_finite() || price <= 0.0 {
            return DetectedLevels::default();
        }

        let in_range = |p: f64| range.map_or(true, |(lo, hi)| p >= lo && p <= hi);
        let mut below = Vec::new();
        let mut above = Vec::new();
        for (p, size) in depth.points().filter(|(p, _)| in_range(*p)) {
            if p < price {
                below.push((p, p * size));
            } else if p > price {
                above.push((p, p * size));
            }
        }

        let gap = price * self.config.cluster_distance_pct / 100.0;
        let mut supports = cluster(below, gap, LevelKind::Support);
        let mut resistances = cluster(above, gap, LevelKind::Resistance);

        let strongest = supports
            .iter()
            .chain(resistances.iter())
            .map(|l| l.strength)
            .fold(0.0, f64::max);
        let floor = self
            .config
            .min_cluster_notional
            .max(strongest * self.config.min_relative_strength);
        supports.retain(|l| l.strength >= floor);
        resistances.retain(|l| l.strength >= floor);

        supports.sort_by(|a, b| b.price.total_cmp(&a.price));
        resistances.sort_by(|a, b| a.price.total_cmp(&b.price));
        supports.truncate(self.config.max_levels_per_side);
        resistances.truncate(self.config.max_levels_per_side);

        DetectedLevels {
            supports,
            resistances,
        }
    }
}

/// Merge sorted points whose gap to the previous point is within `gap`
fn cluster(mut points: Vec<(f64, f64)>, gap: f64, kind: LevelKind) -> Vec<PriceLevel> {
    points.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut levels = Vec::new();
    let mut current: Option<ClusterAcc> = None;
    for (price, notional) in points {
        match current.as_mut() {
            Some(acc) if price - acc.high <= gap => acc.push(price, notional),
            _ => {
                if let Some(done) = current.take() {
                    levels.push(done.into_level(kind));
                }
                current = Some(ClusterAcc::start(price, notional));
            }
        }
    }
    if let Some(done) = current {
        levels.push(done.into_level(kind));
    }
    levels
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn detector() -> LevelDetector {
        LevelDetector::new(LevelConfig {
            min_cluster_notional: 1_000.0,
            ..LevelConfig::default()
        })
    }

    #[test]
    fn test_clusters_adjacent_points() {
        // gap at price 100 = 0.2
        let depth = OrderBookDepth::new(
            vec![(99.0, 100.0), (98.9, 100.0), (97.0, 50.0)],
            vec![(101.0, 100.0), (101.15, 100.0), (103.0, 80.0)],
        );
        let levels = detector().detect(&depth, 100.0);

        assert_eq!(levels.supports.len(), 2);
        let nearest = &levels.supports[0];
        assert_eq!(nearest.kind, LevelKind::Support);
        assert_eq!(nearest.points, 2);
        assert_relative_eq!(nearest.low, 98.9);
        assert_relative_eq!(nearest.high, 99.0);
        assert_relative_eq!(nearest.strength, 9_900.0 + 9_890.0, epsilon = 1e-6);
        assert_relative_eq!(levels.supports[1].price, 97.0);

        assert_eq!(levels.resistances.len(), 2);
        assert_relative_eq!(levels.resistances[0].far_edge(), 101.15);
        assert_relative_eq!(levels.resistances[1].price, 103.0);
    }

    #[test]
    fn test_weak_clusters_filtered() {
        let depth = OrderBookDepth::new(
            vec![(99.0, 1_000.0), (95.0, 5.0)],
            vec![(101.0, 1_000.0), (104.0, 50.0)],
        );
        let levels = detector().detect(&depth, 100.0);
        // 95 × 5 = 475 below the absolute floor, 104 × 50 below 10% of the strongest
        assert_eq!(levels.supports.len(), 1);
        assert_eq!(levels.resistances.len(), 1);
    }

    #[test]
    fn test_empty_when_nothing_clears_floor() {
        let depth = OrderBookDepth::new(vec![(99.0, 1.0)], vec![(101.0, 1.0)]);
        let levels = detector().detect(&depth, 100.0);
        assert!(levels.is_empty());
        assert_eq!(levels.total(), 0);
    }

    #[test]
    fn test_working_range_excludes_far_liquidity() {
        let depth = OrderBookDepth::new(
            vec![(99.0, 100.0), (90.0, 10_000.0)],
            vec![(101.0, 100.0)],
        );
        let levels = detector().detect_within(&depth, 100.0, Some((98.5, 101.5)));
        assert_eq!(levels.supports.len(), 1);
        assert_relative_eq!(levels.supports[0].price, 99.0);
    }

    #[test]
    fn test_caps_levels_per_side() {
        let bids: Vec<_> = (1..=8).map(|i| (100.0 - i as f64, 100.0)).collect();
        let depth = OrderBookDepth::new(bids, Vec::new());
        let levels = detector().detect(&depth, 100.0);
        assert_eq!(levels.supports.len(), 5);
        assert_relative_eq!(levels.supports[0].price, 99.0);
        assert!(levels.resistances.is_empty());
    }
}
