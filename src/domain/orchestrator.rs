//! Multi-strategy orchestration.
//!
//! Strategies are independent: they share the immutable price table and the
//! derived-series cache, and nothing else. Each gets its own result slot, so
//! one misconfigured strategy never aborts its siblings. The fan-out runs on
//! rayon, and because every slot is isolated and every weight map iterates
//! in sorted order, a parallel run is bit-identical to a sequential one.

use std::collections::BTreeSet;

use rayon::prelude::*;
use tracing::debug;

use crate::domain::cache::SeriesCache;
use crate::domain::error::FoliosimError;
use crate::domain::prices::PriceTable;
use crate::domain::runner::{StrategyOutcome, StrategyRunner};
use crate::domain::strategy::{BacktestSettings, StrategyConfig};
use crate::domain::weighting::Weighting;

/// One strategy slot: completed outcome or the error that stopped it.
#[derive(Debug)]
pub struct StrategyRun {
    pub name: String,
    pub outcome: Result<StrategyOutcome, FoliosimError>,
}

/// All strategy slots, in input order.
#[derive(Debug)]
pub struct BacktestReport {
    pub runs: Vec<StrategyRun>,
}

impl BacktestReport {
    pub fn get(&self, name: &str) -> Option<&StrategyRun> {
        self.runs.iter().find(|run| run.name == name)
    }

    /// Completed outcomes, in input order.
    pub fn completed(&self) -> impl Iterator<Item = &StrategyOutcome> {
        self.runs.iter().filter_map(|run| run.outcome.as_ref().ok())
    }

    /// Failed slots as (name, error), in input order.
    pub fn failed(&self) -> impl Iterator<Item = (&str, &FoliosimError)> {
        self.runs
            .iter()
            .filter_map(|run| run.outcome.as_ref().err().map(|e| (run.name.as_str(), e)))
    }
}

/// Run every strategy against the table.
///
/// Aborts before any strategy starts when the table is empty, no strategy is
/// configured, or two strategies share a name. Per-slot configuration
/// problems (unknown reference asset, misaligned cap table, zero windows)
/// fail only their own slot.
pub fn run_backtest(
    table: &PriceTable,
    strategies: &[StrategyConfig],
    settings: &BacktestSettings,
) -> Result<BacktestReport, FoliosimError> {
    if table.is_empty() {
        return Err(FoliosimError::EmptyTable {
            reason: "cannot run against a table with no periods".into(),
        });
    }
    if strategies.is_empty() {
        return Err(FoliosimError::NoStrategies);
    }
    let mut seen = BTreeSet::new();
    for config in strategies {
        if !seen.insert(config.name.as_str()) {
            return Err(FoliosimError::DuplicateStrategy {
                name: config.name.clone(),
            });
        }
    }

    let cache = SeriesCache::new();
    let runs: Vec<StrategyRun> = strategies
        .par_iter()
        .map(|config| {
            let outcome = validate_strategy(table, config)
                .and_then(|()| StrategyRunner::new(table, &cache, config, settings).run());
            if let Err(err) = &outcome {
                debug!(strategy = %config.name, %err, "strategy slot failed");
            }
            StrategyRun {
                name: config.name.clone(),
                outcome,
            }
        })
        .collect();

    Ok(BacktestReport { runs })
}

/// Per-slot pre-flight: reject references the table cannot satisfy before
/// any period runs. Selection lists are deliberately not checked here; a
/// missing selection name degrades at selection time instead.
pub fn validate_strategy(
    table: &PriceTable,
    config: &StrategyConfig,
) -> Result<(), FoliosimError> {
    match &config.weighting {
        Weighting::SignalCrossover {
            reference,
            fast,
            slow,
        } => {
            if !table.contains(reference) {
                return Err(FoliosimError::UnknownAsset {
                    asset: reference.to_string(),
                });
            }
            if *fast == 0 {
                return Err(FoliosimError::InvalidParameter {
                    name: "fast".into(),
                    reason: "window must be at least 1".into(),
                });
            }
            if *slow == 0 {
                return Err(FoliosimError::InvalidParameter {
                    name: "slow".into(),
                    reason: "span must be at least 1".into(),
                });
            }
        }
        Weighting::MarketCap { caps } => {
            table.validate_alignment(caps)?;
        }
        _ => {}
    }
    Ok(())
}
