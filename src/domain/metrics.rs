//! Performance summary over an equity curve.
//!
//! Report-stage only; the engine loop never reads these. Annualization
//! assumes daily periods on a 365-day calendar (crypto markets do not
//! close).

use chrono::NaiveDate;

use crate::domain::runner::EquityPoint;

const PERIODS_PER_YEAR: f64 = 365.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub total_return: f64,
    pub annualized_return: f64,
    pub annualized_volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration: i64,
}

impl Summary {
    /// Compute the summary for one curve. Curves with fewer than 2 points
    /// produce a zeroed summary, never an error.
    pub fn from_curve(curve: &[EquityPoint], risk_free_rate: f64) -> Summary {
        let initial = curve.first().map(|p| p.equity).unwrap_or(0.0);
        let last = curve.last().map(|p| p.equity).unwrap_or(0.0);

        let total_return = if initial > 0.0 {
            (last - initial) / initial
        } else {
            0.0
        };

        let years = curve.len() as f64 / PERIODS_PER_YEAR;
        let annualized_return = if curve.len() > 1 && total_return > -1.0 {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(curve);

        let periodic_rf = risk_free_rate / PERIODS_PER_YEAR;
        let (sharpe_ratio, sortino_ratio, annualized_volatility) =
            compute_risk_adjusted(curve, periodic_rf);

        Summary {
            total_return,
            annualized_return,
            annualized_volatility,
            sharpe_ratio,
            sortino_ratio,
            max_drawdown,
            max_drawdown_duration,
        }
    }
}

fn compute_drawdown(curve: &[EquityPoint]) -> (f64, i64) {
    if curve.is_empty() {
        return (0.0, 0);
    }

    let mut peak = curve[0].equity;
    let mut max_dd = 0.0_f64;
    let mut max_dd_duration = 0i64;
    let mut dd_start: Option<NaiveDate> = None;
    let mut current_dd_duration = 0i64;

    for point in curve {
        if point.equity > peak {
            peak = point.equity;
            dd_start = None;
            current_dd_duration = 0;
        } else if peak > 0.0 {
            let dd = (peak - point.equity) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
            if dd_start.is_none() {
                dd_start = Some(point.date);
            }
            current_dd_duration += 1;
            if current_dd_duration > max_dd_duration {
                max_dd_duration = current_dd_duration;
            }
        }
    }

    (max_dd, max_dd_duration)
}

fn compute_risk_adjusted(curve: &[EquityPoint], periodic_rf: f64) -> (f64, f64, f64) {
    if curve.len() < 2 {
        return (0.0, 0.0, 0.0);
    }

    let returns: Vec<f64> = curve
        .windows(2)
        .map(|w| {
            let prev = w[0].equity;
            let curr = w[1].equity;
            if prev > 0.0 { (curr - prev) / prev } else { 0.0 }
        })
        .collect();

    let n = returns.len() as f64;
    let mean: f64 = returns.iter().sum::<f64>() / n;

    let variance: f64 = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();
    let annualized_volatility = stddev * PERIODS_PER_YEAR.sqrt();

    let excess_return = mean - periodic_rf;

    let sharpe = if stddev > 0.0 {
        (excess_return / stddev) * PERIODS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    let downside: Vec<f64> = returns
        .iter()
        .filter(|&&r| r < periodic_rf)
        .map(|&r| (r - periodic_rf).powi(2))
        .collect();

    let downside_stddev = if !downside.is_empty() {
        (downside.iter().sum::<f64>() / n).sqrt()
    } else {
        0.0
    };

    let sortino = if downside_stddev > 0.0 {
        (excess_return / downside_stddev) * PERIODS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    (sharpe, sortino, annualized_volatility)
}
