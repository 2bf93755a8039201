//! Memoized derived series, shared by every strategy in a run.
//!
//! Keyed by (asset, transform, parameters). A key is computed at most once
//! per process lifetime and never invalidated; the price table it derives
//! from is immutable. Strategies on different threads share entries through
//! `Arc`.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::domain::error::FoliosimError;
use crate::domain::prices::{AssetId, PriceTable};
use crate::domain::series;

/// A derived-series transform and its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Transform {
    /// Percentage returns (NaN at index 0).
    Returns,
    /// Simple moving average over a window.
    Sma(usize),
    /// Exponential moving average with span (alpha = 2 / (span + 1)).
    Ema(usize),
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::Returns => write!(f, "returns"),
            Transform::Sma(window) => write!(f, "sma({window})"),
            Transform::Ema(span) => write!(f, "ema({span})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SeriesKey {
    asset: AssetId,
    transform: Transform,
}

/// Concurrent read-safe cache of derived series.
#[derive(Debug, Default)]
pub struct SeriesCache {
    entries: RwLock<HashMap<SeriesKey, Arc<Vec<f64>>>>,
}

impl SeriesCache {
    pub fn new() -> Self {
        SeriesCache::default()
    }

    /// Fetch a derived series, computing and memoizing it on first use.
    ///
    /// The compute runs under the write lock after a re-check, so a key is
    /// computed at most once even when several strategies miss at the same
    /// time. A poisoned lock only means a compute panicked before inserting;
    /// every entry already present is complete.
    pub fn get_or_compute(
        &self,
        table: &PriceTable,
        asset: &AssetId,
        transform: Transform,
    ) -> Result<Arc<Vec<f64>>, FoliosimError> {
        let key = SeriesKey {
            asset: asset.clone(),
            transform,
        };

        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(found) = entries.get(&key) {
                return Ok(Arc::clone(found));
            }
        }

        let column = table
            .column(asset)
            .ok_or_else(|| FoliosimError::UnknownAsset {
                asset: asset.to_string(),
            })?;

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(found) = entries.get(&key) {
            return Ok(Arc::clone(found));
        }

        let computed = Arc::new(match key.transform {
            Transform::Returns => series::pct_returns(column),
            Transform::Sma(window) => series::sma(column, window),
            Transform::Ema(span) => series::ema(column, span),
        });
        debug!(asset = %key.asset, transform = %key.transform, "derived series computed");
        entries.insert(key, Arc::clone(&computed));
        Ok(computed)
    }

    pub fn returns(
        &self,
        table: &PriceTable,
        asset: &AssetId,
    ) -> Result<Arc<Vec<f64>>, FoliosimError> {
        self.get_or_compute(table, asset, Transform::Returns)
    }

    pub fn sma(
        &self,
        table: &PriceTable,
        asset: &AssetId,
        window: usize,
    ) -> Result<Arc<Vec<f64>>, FoliosimError> {
        self.get_or_compute(table, asset, Transform::Sma(window))
    }

    pub fn ema(
        &self,
        table: &PriceTable,
        asset: &AssetId,
        span: usize,
    ) -> Result<Arc<Vec<f64>>, FoliosimError> {
        self.get_or_compute(table, asset, Transform::Ema(span))
    }

    /// Number of memoized series.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::prices::PricePoint;
    use chrono::NaiveDate;

    fn table(prices: &[f64]) -> PriceTable {
        let points: Vec<PricePoint> = prices
            .iter()
            .enumerate()
            .map(|(i, &value)| PricePoint {
                date: NaiveDate::from_ymd_opt(2024, 1, (i + 1) as u32).unwrap(),
                value,
            })
            .collect();
        PriceTable::from_series(vec![("BTC".into(), points)]).unwrap()
    }

    #[test]
    fn second_fetch_shares_the_first_computation() {
        let table = table(&[100.0, 110.0, 121.0]);
        let cache = SeriesCache::new();

        let first = cache.returns(&table, &"BTC".into()).unwrap();
        let second = cache.returns(&table, &"BTC".into()).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn distinct_parameters_are_distinct_entries() {
        let table = table(&[1.0, 2.0, 3.0, 4.0]);
        let cache = SeriesCache::new();

        cache.sma(&table, &"BTC".into(), 2).unwrap();
        cache.sma(&table, &"BTC".into(), 3).unwrap();
        cache.ema(&table, &"BTC".into(), 2).unwrap();

        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn unknown_asset_is_a_configuration_error() {
        let table = table(&[1.0, 2.0]);
        let cache = SeriesCache::new();

        let err = cache.returns(&table, &"DOGE".into()).unwrap_err();
        assert!(matches!(err, FoliosimError::UnknownAsset { .. }));
    }

    #[test]
    fn cached_series_match_the_kernels() {
        let prices = [100.0, 110.0, 99.0, 120.0];
        let table = table(&prices);
        let cache = SeriesCache::new();

        let returns = cache.returns(&table, &"BTC".into()).unwrap();
        assert_eq!(returns.len(), prices.len());
        assert!(returns[0].is_nan());
        assert!((returns[1] - 0.1).abs() < 1e-12);

        let sma = cache.sma(&table, &"BTC".into(), 2).unwrap();
        assert!((sma[1] - 105.0).abs() < 1e-12);
    }

    #[test]
    fn concurrent_fetches_compute_once() {
        let table = table(&[1.0, 2.0, 4.0, 8.0, 16.0]);
        let cache = SeriesCache::new();

        let arcs: Vec<Arc<Vec<f64>>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| cache.returns(&table, &"BTC".into()).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(cache.len(), 1);
        for arc in &arcs[1..] {
            assert!(Arc::ptr_eq(&arcs[0], arc));
        }
    }
}
