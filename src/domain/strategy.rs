//! Strategy configuration.

use crate::domain::schedule::Schedule;
use crate::domain::selector::Selector;
use crate::domain::weighting::Weighting;

/// One strategy: a rebalance schedule, a selection rule, and a weighting
/// algorithm over the shared price table. The rebalance policy itself is
/// fixed: full replacement with the normalized target weights.
#[derive(Debug, Clone)]
pub struct StrategyConfig {
    /// Unique per run; keys the report.
    pub name: String,
    pub schedule: Schedule,
    pub selector: Selector,
    pub weighting: Weighting,
}

/// Run-level knobs shared by every strategy in a backtest.
#[derive(Debug, Clone)]
pub struct BacktestSettings {
    /// Equity assigned to the first period of every curve.
    pub baseline: f64,
    /// Annual risk-free rate for the performance summary.
    pub risk_free_rate: f64,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        BacktestSettings {
            baseline: 100.0,
            risk_free_rate: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_strategy() -> StrategyConfig {
        StrategyConfig {
            name: "core".into(),
            schedule: Schedule::Monthly,
            selector: Selector::These(vec!["BTC".into(), "ETH".into()]),
            weighting: Weighting::Equal,
        }
    }

    #[test]
    fn strategy_fields() {
        let s = sample_strategy();
        assert_eq!(s.name, "core");
        assert_eq!(s.schedule, Schedule::Monthly);
        assert!(matches!(s.selector, Selector::These(ref list) if list.len() == 2));
    }

    #[test]
    fn default_settings() {
        let settings = BacktestSettings::default();
        assert!((settings.baseline - 100.0).abs() < f64::EPSILON);
        assert!(settings.risk_free_rate.abs() < f64::EPSILON);
    }
}
