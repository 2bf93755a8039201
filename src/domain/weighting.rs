//! Weighting algorithms.
//!
//! Each algorithm maps (period, eligible assets, read-only context) to a
//! target-weight map. Algorithms are pure: no engine state is touched and
//! the same inputs always produce the same output. Degenerate inputs do not
//! fail; they fall back (documented per variant) and warn. History-based
//! variants use returns up to and including the current period, never past
//! it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::domain::cache::SeriesCache;
use crate::domain::error::FoliosimError;
use crate::domain::prices::{AssetId, PriceTable};
use crate::domain::series;

/// Target fractions per asset. Sorted keys keep every summation order, and
/// therefore every float result, identical between runs.
pub type Weights = BTreeMap<AssetId, f64>;

/// Crossover defaults: SMA(50) against EMA(200).
pub const DEFAULT_FAST_WINDOW: usize = 50;
pub const DEFAULT_SLOW_SPAN: usize = 200;

/// Fewest return observations a history-based weighting will work from.
pub const MIN_RETURN_OBSERVATIONS: usize = 2;

/// Read-only inputs available to a weighting call.
pub struct WeightContext<'a> {
    pub table: &'a PriceTable,
    pub cache: &'a SeriesCache,
}

#[derive(Debug, Clone)]
pub enum Weighting {
    /// 1/N across the eligible set.
    Equal,
    /// Proportional to capitalization at the current period. The cap table
    /// shares the price table's period index; assets without a usable cap
    /// are excluded from numerator and denominator.
    MarketCap { caps: Arc<PriceTable> },
    /// Proportional to 1/sigma over full-history returns. Zero-volatility
    /// assets are excluded and the rest renormalized; if every asset is
    /// degenerate the result is equal weights.
    InverseVolatility,
    /// Naive historical-mean ratio: mean_i / sum(mean_j). Weights can be
    /// negative; `long_only` clips negatives and renormalizes as an opt-in
    /// post-processing step.
    MeanVariance { long_only: bool },
    /// Global minimum-variance portfolio from the sample covariance matrix.
    /// A singular system falls back to inverse-volatility weights.
    MinimumVariance,
    /// All-in/all-out gate on one reference asset: equal split across the
    /// eligible set while SMA(fast) > EMA(slow), cash otherwise. The signal
    /// is off until the SMA window is filled.
    SignalCrossover {
        reference: AssetId,
        fast: usize,
        slow: usize,
    },
}

impl fmt::Display for Weighting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Weighting::Equal => write!(f, "equal"),
            Weighting::MarketCap { .. } => write!(f, "market-cap"),
            Weighting::InverseVolatility => write!(f, "inverse-volatility"),
            Weighting::MeanVariance { long_only: false } => write!(f, "mean-variance"),
            Weighting::MeanVariance { long_only: true } => write!(f, "mean-variance (long-only)"),
            Weighting::MinimumVariance => write!(f, "minimum-variance"),
            Weighting::SignalCrossover {
                reference,
                fast,
                slow,
            } => write!(f, "signal-crossover({reference}, {fast}/{slow})"),
        }
    }
}

impl Weighting {
    /// Compute target weights at `period` for the `eligible` assets.
    ///
    /// An empty eligible set always yields empty weights (all cash). Errors
    /// surface only for configuration-class problems such as a reference
    /// asset the price table does not carry.
    pub fn compute(
        &self,
        ctx: &WeightContext<'_>,
        period: usize,
        eligible: &[AssetId],
    ) -> Result<Weights, FoliosimError> {
        if eligible.is_empty() {
            return Ok(Weights::new());
        }
        match self {
            Weighting::Equal => Ok(equal_split(eligible)),
            Weighting::MarketCap { caps } => Ok(market_cap(caps, period, eligible)),
            Weighting::InverseVolatility => inverse_volatility(ctx, period, eligible),
            Weighting::MeanVariance { long_only } => {
                mean_variance(ctx, period, eligible, *long_only)
            }
            Weighting::MinimumVariance => minimum_variance(ctx, period, eligible),
            Weighting::SignalCrossover {
                reference,
                fast,
                slow,
            } => signal_crossover(ctx, period, eligible, reference, *fast, *slow),
        }
    }
}

fn equal_split(eligible: &[AssetId]) -> Weights {
    let share = 1.0 / eligible.len() as f64;
    eligible.iter().map(|a| (a.clone(), share)).collect()
}

fn market_cap(caps: &PriceTable, period: usize, eligible: &[AssetId]) -> Weights {
    let mut usable: Vec<(AssetId, f64)> = Vec::new();
    for asset in eligible {
        match caps.value_at(asset, period) {
            Some(cap) if cap.is_finite() && cap >= 0.0 => usable.push((asset.clone(), cap)),
            Some(cap) => {
                warn!(asset = %asset, cap, "unusable capitalization value, excluding");
            }
            None => {
                warn!(asset = %asset, "no capitalization value, excluding");
            }
        }
    }
    let total: f64 = usable.iter().map(|(_, cap)| cap).sum();
    if total <= 0.0 {
        if !usable.is_empty() {
            warn!("total capitalization is zero, going to cash");
        }
        return Weights::new();
    }
    usable
        .into_iter()
        .map(|(asset, cap)| (asset, cap / total))
        .collect()
}

fn inverse_volatility(
    ctx: &WeightContext<'_>,
    period: usize,
    eligible: &[AssetId],
) -> Result<Weights, FoliosimError> {
    if period < MIN_RETURN_OBSERVATIONS {
        warn!(period, "not enough return history for volatilities, going to cash");
        return Ok(Weights::new());
    }

    let mut inverses: Vec<(AssetId, f64)> = Vec::new();
    for asset in eligible {
        let returns = ctx.cache.returns(ctx.table, asset)?;
        match series::sample_variance(&returns[..=period]) {
            Some(var) if var > 0.0 && var.is_finite() => {
                inverses.push((asset.clone(), 1.0 / var.sqrt()));
            }
            _ => {
                warn!(asset = %asset, "degenerate volatility, excluding from inverse-vol weights");
            }
        }
    }

    if inverses.is_empty() {
        warn!("every volatility degenerate, falling back to equal weights");
        return Ok(equal_split(eligible));
    }
    let total: f64 = inverses.iter().map(|(_, inv)| inv).sum();
    if !total.is_finite() || total <= 0.0 {
        warn!("inverse-volatility sum not usable, falling back to equal weights");
        return Ok(equal_split(eligible));
    }
    Ok(inverses
        .into_iter()
        .map(|(asset, inv)| (asset, inv / total))
        .collect())
}

fn mean_variance(
    ctx: &WeightContext<'_>,
    period: usize,
    eligible: &[AssetId],
    long_only: bool,
) -> Result<Weights, FoliosimError> {
    if period < MIN_RETURN_OBSERVATIONS {
        warn!(period, "not enough return history for mean returns, going to cash");
        return Ok(Weights::new());
    }

    let mut means: Vec<(AssetId, f64)> = Vec::new();
    for asset in eligible {
        let returns = ctx.cache.returns(ctx.table, asset)?;
        if let Some(mean) = series::mean(&returns[..=period]) {
            means.push((asset.clone(), mean));
        }
    }

    let total: f64 = means.iter().map(|(_, mean)| mean).sum();
    if means.is_empty() || !total.is_finite() || total.abs() < 1e-12 {
        warn!("mean returns sum to zero, going to cash");
        return Ok(Weights::new());
    }

    let mut weights: Weights = means
        .into_iter()
        .map(|(asset, mean)| (asset, mean / total))
        .collect();

    if long_only {
        weights.retain(|_, weight| *weight > 0.0);
        let kept: f64 = weights.values().sum();
        if kept <= 0.0 {
            warn!("long-only clip removed every weight, going to cash");
            return Ok(Weights::new());
        }
        for weight in weights.values_mut() {
            *weight /= kept;
        }
    }
    Ok(weights)
}

fn minimum_variance(
    ctx: &WeightContext<'_>,
    period: usize,
    eligible: &[AssetId],
) -> Result<Weights, FoliosimError> {
    if period < MIN_RETURN_OBSERVATIONS {
        warn!(period, "not enough return history for a covariance matrix, going to cash");
        return Ok(Weights::new());
    }
    if eligible.len() == 1 {
        return Ok(equal_split(eligible));
    }

    let mut windows: Vec<Arc<Vec<f64>>> = Vec::with_capacity(eligible.len());
    for asset in eligible {
        windows.push(ctx.cache.returns(ctx.table, asset)?);
    }

    let n = eligible.len();
    let mut matrix = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in i..n {
            let cov =
                series::sample_covariance(&windows[i][..=period], &windows[j][..=period]);
            match cov {
                Some(value) if value.is_finite() => {
                    matrix[i][j] = value;
                    matrix[j][i] = value;
                }
                _ => {
                    warn!("covariance unavailable, falling back to inverse-volatility weights");
                    return inverse_volatility(ctx, period, eligible);
                }
            }
        }
    }

    // Global minimum variance: solve C x = 1, then normalize x to sum 1.
    let Some(solution) = solve_linear(matrix, vec![1.0; n]) else {
        warn!("covariance matrix singular, falling back to inverse-volatility weights");
        return inverse_volatility(ctx, period, eligible);
    };
    let total: f64 = solution.iter().sum();
    if !total.is_finite() || total.abs() < 1e-12 {
        warn!("minimum-variance solution not usable, falling back to inverse-volatility weights");
        return inverse_volatility(ctx, period, eligible);
    }
    Ok(eligible
        .iter()
        .zip(solution)
        .map(|(asset, x)| (asset.clone(), x / total))
        .collect())
}

fn signal_crossover(
    ctx: &WeightContext<'_>,
    period: usize,
    eligible: &[AssetId],
    reference: &AssetId,
    fast: usize,
    slow: usize,
) -> Result<Weights, FoliosimError> {
    let sma = ctx.cache.sma(ctx.table, reference, fast)?;
    let ema = ctx.cache.ema(ctx.table, reference, slow)?;
    // NaN during SMA warmup compares false, matching the off-until-filled rule.
    let signal_on = period + 1 >= fast && sma[period] > ema[period];
    if signal_on {
        Ok(equal_split(eligible))
    } else {
        Ok(Weights::new())
    }
}

/// Gaussian elimination with partial pivoting. None when the system is
/// singular or produces non-finite values.
fn solve_linear(mut matrix: Vec<Vec<f64>>, mut rhs: Vec<f64>) -> Option<Vec<f64>> {
    let n = rhs.len();
    for col in 0..n {
        let mut pivot = col;
        for row in col + 1..n {
            if matrix[row][col].abs() > matrix[pivot][col].abs() {
                pivot = row;
            }
        }
        if !matrix[pivot][col].is_finite() || matrix[pivot][col].abs() < 1e-12 {
            return None;
        }
        matrix.swap(col, pivot);
        rhs.swap(col, pivot);
        for row in col + 1..n {
            let factor = matrix[row][col] / matrix[col][col];
            for k in col..n {
                matrix[row][k] -= factor * matrix[col][k];
            }
            rhs[row] -= factor * rhs[col];
        }
    }
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let mut acc = rhs[row];
        for k in row + 1..n {
            acc -= matrix[row][k] * x[k];
        }
        x[row] = acc / matrix[row][row];
    }
    if x.iter().all(|v| v.is_finite()) {
        Some(x)
    } else {
        None
    }
}
