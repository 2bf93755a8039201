//! Single-strategy execution over the shared timeline.
//!
//! One forward pass per strategy. On an active period the pipeline runs
//! selection, weighting, and rebalancing, in that order; every period the
//! portfolio value compounds by the position-weighted return since the
//! previous period, with cash contributing zero. The first period is pinned
//! to the baseline. The curve is append-only: exactly one point per period,
//! immutable once the run completes.

use chrono::NaiveDate;
use tracing::debug;

use crate::domain::cache::SeriesCache;
use crate::domain::error::FoliosimError;
use crate::domain::prices::PriceTable;
use crate::domain::rebalance::{Position, RebalanceEvent, rebalance};
use crate::domain::strategy::{BacktestSettings, StrategyConfig};
use crate::domain::weighting::WeightContext;

/// Portfolio value at one period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

/// Everything a completed strategy run produced.
#[derive(Debug, Clone)]
pub struct StrategyOutcome {
    pub name: String,
    pub equity_curve: Vec<EquityPoint>,
    pub rebalances: Vec<RebalanceEvent>,
    pub final_position: Position,
    pub warnings: Vec<String>,
}

/// Walks one strategy across the table. Constructing the runner is the idle
/// state; `run` consumes it, so a runner cannot be replayed and an outcome
/// cannot be mutated after completion.
pub struct StrategyRunner<'a> {
    table: &'a PriceTable,
    cache: &'a SeriesCache,
    config: &'a StrategyConfig,
    settings: &'a BacktestSettings,
}

impl<'a> StrategyRunner<'a> {
    pub fn new(
        table: &'a PriceTable,
        cache: &'a SeriesCache,
        config: &'a StrategyConfig,
        settings: &'a BacktestSettings,
    ) -> StrategyRunner<'a> {
        StrategyRunner {
            table,
            cache,
            config,
            settings,
        }
    }

    pub fn run(self) -> Result<StrategyOutcome, FoliosimError> {
        let ctx = WeightContext {
            table: self.table,
            cache: self.cache,
        };
        let universe = self.table.assets();

        let mut position = Position::empty();
        let mut equity = self.settings.baseline;
        let mut equity_curve = Vec::with_capacity(self.table.len());
        let mut rebalances = Vec::new();
        let mut warnings: Vec<String> = Vec::new();
        let mut last_active: Option<NaiveDate> = None;

        for (index, &date) in self.table.periods().iter().enumerate() {
            if self.config.schedule.is_active(index, date, last_active) {
                let selection = self.config.selector.select(universe);
                for missing in &selection.missing {
                    let message = format!("selected asset '{missing}' not in the price table");
                    if !warnings.contains(&message) {
                        warnings.push(message);
                    }
                }
                let target = self
                    .config
                    .weighting
                    .compute(&ctx, index, &selection.assets)?;
                let (next, deltas) = rebalance(&position, &target);
                debug!(
                    strategy = %self.config.name,
                    %date,
                    moves = deltas.len(),
                    invested = next.invested_fraction(),
                    "rebalanced"
                );
                rebalances.push(RebalanceEvent { date, deltas });
                position = next;
                last_active = Some(date);
            }

            if index > 0 {
                equity *= 1.0 + weighted_return(self.table, &position, index);
            }
            equity_curve.push(EquityPoint { date, equity });
        }

        Ok(StrategyOutcome {
            name: self.config.name.clone(),
            equity_curve,
            rebalances,
            final_position: position,
            warnings,
        })
    }
}

/// Position-weighted return from period `index - 1` to `index`. Cash (the
/// unallocated remainder) contributes zero.
fn weighted_return(table: &PriceTable, position: &Position, index: usize) -> f64 {
    let mut growth = 0.0;
    for (asset, weight) in &position.weights {
        let prev = table.value_at(asset, index - 1);
        let curr = table.value_at(asset, index);
        if let (Some(prev), Some(curr)) = (prev, curr) {
            if prev != 0.0 {
                growth += weight * (curr / prev - 1.0);
            }
        }
    }
    growth
}
