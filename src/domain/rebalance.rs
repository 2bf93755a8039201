//! Full-replacement rebalancing.
//!
//! A position is the set of target fractions applied at the last rebalance;
//! whatever the fractions leave uncovered is cash. Rebalancing normalizes
//! the requested weights by their sum (a sum of zero means all cash) and
//! replaces the position outright, reporting per-asset deltas for
//! observability. No lots, fees, slippage, or partial fills.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::domain::prices::AssetId;
use crate::domain::weighting::Weights;

/// Sums smaller than this are treated as zero when normalizing.
const ZERO_SUM_TOLERANCE: f64 = 1e-12;

/// Fractions held since the last rebalance. `1 - invested_fraction()` sits
/// in cash and earns nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Position {
    pub weights: Weights,
}

impl Position {
    pub fn empty() -> Position {
        Position::default()
    }

    pub fn invested_fraction(&self) -> f64 {
        self.weights.values().sum()
    }

    pub fn cash_fraction(&self) -> f64 {
        1.0 - self.invested_fraction()
    }

    pub fn is_all_cash(&self) -> bool {
        self.weights.is_empty()
    }
}

/// Change in one asset's fraction: new minus old.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeDelta {
    pub asset: AssetId,
    pub delta: f64,
}

/// One schedule activation: when it fired and what it moved.
#[derive(Debug, Clone, PartialEq)]
pub struct RebalanceEvent {
    pub date: NaiveDate,
    pub deltas: Vec<TradeDelta>,
}

/// Replace `current` with `target`, normalized by its sum.
///
/// Deltas cover the union of old and new assets in sorted order; zero-delta
/// entries are omitted.
pub fn rebalance(current: &Position, target: &Weights) -> (Position, Vec<TradeDelta>) {
    let total: f64 = target.values().sum();
    let next: Weights = if !total.is_finite() || total.abs() < ZERO_SUM_TOLERANCE {
        Weights::new()
    } else {
        target
            .iter()
            .map(|(asset, weight)| (asset.clone(), weight / total))
            .collect()
    };

    let union: BTreeSet<&AssetId> = current.weights.keys().chain(next.keys()).collect();
    let mut deltas = Vec::new();
    for asset in union {
        let old = current.weights.get(asset).copied().unwrap_or(0.0);
        let new = next.get(asset).copied().unwrap_or(0.0);
        let delta = new - old;
        if delta != 0.0 {
            deltas.push(TradeDelta {
                asset: asset.clone(),
                delta,
            });
        }
    }
    (Position { weights: next }, deltas)
}
