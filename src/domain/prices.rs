//! Aligned price table shared by every strategy in a run.
//!
//! Providers deliver per-asset (date, close) series of uneven length; the
//! table keeps only dates present in every series (inner join). After
//! construction the table is immutable: strictly increasing dates, one fully
//! populated column per asset, assets in sorted order.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::warn;

use crate::domain::error::FoliosimError;

/// Interned asset identifier. Compares and hashes by value, clones by
/// reference count.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetId(Arc<str>);

impl AssetId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(s: &str) -> Self {
        AssetId(Arc::from(s))
    }
}

impl From<String> for AssetId {
    fn from(s: String) -> Self {
        AssetId(Arc::from(s.as_str()))
    }
}

/// One provider observation, before alignment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Immutable aligned price matrix: one row per date, one column per asset.
#[derive(Debug, Clone)]
pub struct PriceTable {
    periods: Vec<NaiveDate>,
    assets: Vec<AssetId>,
    columns: BTreeMap<AssetId, Vec<f64>>,
    date_index: HashMap<NaiveDate, usize>,
}

impl PriceTable {
    /// Build a table from per-asset series by inner join on date.
    ///
    /// 1. Within each series, drop non-finite values; on duplicate dates the
    ///    last observation wins (providers occasionally re-deliver a row).
    /// 2. Keep only dates present in every series; dropped rows are counted
    ///    and logged as a data-quality warning.
    /// 3. Fail with `EmptyTable` if no asset or no common date survives.
    pub fn from_series(
        series: Vec<(AssetId, Vec<PricePoint>)>,
    ) -> Result<PriceTable, FoliosimError> {
        if series.is_empty() {
            return Err(FoliosimError::EmptyTable {
                reason: "no asset series provided".into(),
            });
        }

        let mut per_asset: BTreeMap<AssetId, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
        for (asset, points) in series {
            if per_asset.contains_key(&asset) {
                return Err(FoliosimError::Data {
                    reason: format!("duplicate series for asset '{asset}'"),
                });
            }
            let mut by_date = BTreeMap::new();
            let mut skipped = 0usize;
            for point in points {
                if point.value.is_finite() {
                    by_date.insert(point.date, point.value);
                } else {
                    skipped += 1;
                }
            }
            if skipped > 0 {
                warn!(asset = %asset, skipped, "dropped non-finite observations");
            }
            per_asset.insert(asset, by_date);
        }

        // Dates present in every series.
        let mut common: Option<BTreeSet<NaiveDate>> = None;
        for by_date in per_asset.values() {
            let dates: BTreeSet<NaiveDate> = by_date.keys().copied().collect();
            common = Some(match common {
                None => dates,
                Some(acc) => acc.intersection(&dates).copied().collect(),
            });
        }
        let common = common.unwrap_or_default();
        if common.is_empty() {
            return Err(FoliosimError::EmptyTable {
                reason: "no date is present in every asset series".into(),
            });
        }

        let periods: Vec<NaiveDate> = common.iter().copied().collect();
        let mut columns = BTreeMap::new();
        for (asset, by_date) in &per_asset {
            let dropped = by_date.len() - periods.len();
            if dropped > 0 {
                warn!(asset = %asset, dropped, "rows outside the common timeline dropped by join");
            }
            let column: Vec<f64> = periods.iter().map(|d| by_date[d]).collect();
            columns.insert(asset.clone(), column);
        }

        let assets: Vec<AssetId> = columns.keys().cloned().collect();
        let date_index = periods.iter().enumerate().map(|(i, d)| (*d, i)).collect();

        Ok(PriceTable {
            periods,
            assets,
            columns,
            date_index,
        })
    }

    /// Rescale every column so it starts at `baseline`. Returns are
    /// unaffected; this only anchors curves for display. Columns whose first
    /// value is zero or non-finite are left unscaled.
    pub fn rebase(&self, baseline: f64) -> PriceTable {
        let mut columns = BTreeMap::new();
        for (asset, column) in &self.columns {
            let first = column[0];
            let rescaled = if first.is_finite() && first != 0.0 {
                let factor = baseline / first;
                column.iter().map(|v| v * factor).collect()
            } else {
                warn!(asset = %asset, first, "cannot rebase column with zero or non-finite start");
                column.clone()
            };
            columns.insert(asset.clone(), rescaled);
        }
        PriceTable {
            periods: self.periods.clone(),
            assets: self.assets.clone(),
            columns,
            date_index: self.date_index.clone(),
        }
    }

    /// Assets in sorted order. This is the selection universe.
    pub fn assets(&self) -> &[AssetId] {
        &self.assets
    }

    pub fn periods(&self) -> &[NaiveDate] {
        &self.periods
    }

    /// Number of periods (rows).
    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn contains(&self, asset: &AssetId) -> bool {
        self.columns.contains_key(asset)
    }

    pub fn column(&self, asset: &AssetId) -> Option<&[f64]> {
        self.columns.get(asset).map(Vec::as_slice)
    }

    pub fn value_at(&self, asset: &AssetId, index: usize) -> Option<f64> {
        self.columns.get(asset).and_then(|c| c.get(index)).copied()
    }

    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.date_index.get(&date).copied()
    }

    /// Check that `other` shares this table's period index row for row.
    /// Used to validate a market-cap table before a run.
    pub fn validate_alignment(&self, other: &PriceTable) -> Result<(), FoliosimError> {
        if other.periods.len() != self.periods.len() {
            return Err(FoliosimError::MisalignedCaps {
                reason: format!(
                    "period count {} does not match price table's {}",
                    other.periods.len(),
                    self.periods.len()
                ),
            });
        }
        for (a, b) in self.periods.iter().zip(&other.periods) {
            if a != b {
                return Err(FoliosimError::MisalignedCaps {
                    reason: format!("period {a} does not match {b}"),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn series(asset: &str, points: &[(u32, f64)]) -> (AssetId, Vec<PricePoint>) {
        (
            AssetId::from(asset),
            points
                .iter()
                .map(|&(d, value)| PricePoint {
                    date: date(2024, 1, d),
                    value,
                })
                .collect(),
        )
    }

    #[test]
    fn inner_join_keeps_only_common_dates() {
        let table = PriceTable::from_series(vec![
            series("BTC", &[(1, 100.0), (2, 110.0), (3, 120.0)]),
            series("ETH", &[(2, 50.0), (3, 55.0), (4, 60.0)]),
        ])
        .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.periods(), &[date(2024, 1, 2), date(2024, 1, 3)]);
        assert_eq!(table.column(&"BTC".into()).unwrap(), &[110.0, 120.0]);
        assert_eq!(table.column(&"ETH".into()).unwrap(), &[50.0, 55.0]);
    }

    #[test]
    fn assets_are_sorted() {
        let table = PriceTable::from_series(vec![
            series("ETH", &[(1, 50.0)]),
            series("ADA", &[(1, 1.0)]),
            series("BTC", &[(1, 100.0)]),
        ])
        .unwrap();

        let names: Vec<&str> = table.assets().iter().map(|a| a.as_str()).collect();
        assert_eq!(names, vec!["ADA", "BTC", "ETH"]);
    }

    #[test]
    fn duplicate_dates_last_observation_wins() {
        let (asset, mut points) = series("BTC", &[(1, 100.0), (2, 110.0)]);
        points.push(PricePoint {
            date: date(2024, 1, 2),
            value: 115.0,
        });
        let table = PriceTable::from_series(vec![(asset, points)]).unwrap();

        assert_eq!(table.value_at(&"BTC".into(), 1), Some(115.0));
    }

    #[test]
    fn non_finite_values_are_dropped_before_the_join() {
        let table = PriceTable::from_series(vec![
            series("BTC", &[(1, 100.0), (2, f64::NAN), (3, 120.0)]),
            series("ETH", &[(1, 50.0), (2, 52.0), (3, 55.0)]),
        ])
        .unwrap();

        // Day 2 exists only for ETH once the NaN row is gone.
        assert_eq!(table.len(), 2);
        assert_eq!(table.periods(), &[date(2024, 1, 1), date(2024, 1, 3)]);
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = PriceTable::from_series(vec![]).unwrap_err();
        assert!(matches!(err, FoliosimError::EmptyTable { .. }));
    }

    #[test]
    fn disjoint_series_are_rejected() {
        let err = PriceTable::from_series(vec![
            series("BTC", &[(1, 100.0), (2, 110.0)]),
            series("ETH", &[(3, 50.0), (4, 55.0)]),
        ])
        .unwrap_err();
        assert!(matches!(err, FoliosimError::EmptyTable { .. }));
    }

    #[test]
    fn duplicate_asset_series_is_rejected() {
        let err = PriceTable::from_series(vec![
            series("BTC", &[(1, 100.0)]),
            series("BTC", &[(1, 101.0)]),
        ])
        .unwrap_err();
        assert!(matches!(err, FoliosimError::Data { .. }));
    }

    #[test]
    fn single_asset_single_period_is_legal() {
        let table = PriceTable::from_series(vec![series("BTC", &[(1, 100.0)])]).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.assets().len(), 1);
    }

    #[test]
    fn periods_strictly_increase() {
        let table = PriceTable::from_series(vec![series(
            "BTC",
            &[(5, 1.0), (1, 2.0), (3, 3.0), (2, 4.0)],
        )])
        .unwrap();

        let periods = table.periods();
        for pair in periods.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn rebase_anchors_every_column_at_the_baseline() {
        let table = PriceTable::from_series(vec![
            series("BTC", &[(1, 200.0), (2, 220.0)]),
            series("ETH", &[(1, 50.0), (2, 40.0)]),
        ])
        .unwrap()
        .rebase(100.0);

        assert!((table.value_at(&"BTC".into(), 0).unwrap() - 100.0).abs() < 1e-9);
        assert!((table.value_at(&"BTC".into(), 1).unwrap() - 110.0).abs() < 1e-9);
        assert!((table.value_at(&"ETH".into(), 0).unwrap() - 100.0).abs() < 1e-9);
        assert!((table.value_at(&"ETH".into(), 1).unwrap() - 80.0).abs() < 1e-9);
    }

    #[test]
    fn index_of_maps_dates_to_rows() {
        let table = PriceTable::from_series(vec![series("BTC", &[(1, 1.0), (3, 2.0)])]).unwrap();
        assert_eq!(table.index_of(date(2024, 1, 1)), Some(0));
        assert_eq!(table.index_of(date(2024, 1, 3)), Some(1));
        assert_eq!(table.index_of(date(2024, 1, 2)), None);
    }

    #[test]
    fn alignment_validation_catches_mismatched_periods() {
        let prices = PriceTable::from_series(vec![series("BTC", &[(1, 1.0), (2, 2.0)])]).unwrap();
        let caps_ok = PriceTable::from_series(vec![series("BTC", &[(1, 9.0), (2, 9.0)])]).unwrap();
        let caps_short = PriceTable::from_series(vec![series("BTC", &[(1, 9.0)])]).unwrap();
        let caps_shifted =
            PriceTable::from_series(vec![series("BTC", &[(1, 9.0), (3, 9.0)])]).unwrap();

        assert!(prices.validate_alignment(&caps_ok).is_ok());
        assert!(matches!(
            prices.validate_alignment(&caps_short),
            Err(FoliosimError::MisalignedCaps { .. })
        ));
        assert!(matches!(
            prices.validate_alignment(&caps_shifted),
            Err(FoliosimError::MisalignedCaps { .. })
        ));
    }
}
