#![allow(dead_code)]

use std::collections::HashMap;

use chrono::{Days, NaiveDate};
use foliosim::domain::error::FoliosimError;
use foliosim::domain::prices::{AssetId, PricePoint, PriceTable};
use foliosim::domain::schedule::Schedule;
use foliosim::domain::selector::Selector;
use foliosim::domain::strategy::StrategyConfig;
use foliosim::domain::weighting::Weighting;
use foliosim::ports::data_port::{MarketCapPort, PriceSeriesPort};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_points(start: NaiveDate, values: &[f64]) -> Vec<PricePoint> {
    values
        .iter()
        .enumerate()
        .map(|(i, &value)| PricePoint {
            date: start.checked_add_days(Days::new(i as u64)).unwrap(),
            value,
        })
        .collect()
}

/// Table over consecutive days starting 2024-01-01.
pub fn make_table(columns: &[(&str, &[f64])]) -> PriceTable {
    make_table_from(date(2024, 1, 1), columns)
}

pub fn make_table_from(start: NaiveDate, columns: &[(&str, &[f64])]) -> PriceTable {
    let series = columns
        .iter()
        .map(|&(name, values)| (AssetId::from(name), make_points(start, values)))
        .collect();
    PriceTable::from_series(series).unwrap()
}

/// Table over an explicit, possibly irregular timeline.
pub fn make_table_with_dates(dates: &[NaiveDate], columns: &[(&str, &[f64])]) -> PriceTable {
    let series = columns
        .iter()
        .map(|&(name, values)| {
            let points = dates
                .iter()
                .zip(values)
                .map(|(&date, &value)| PricePoint { date, value })
                .collect();
            (AssetId::from(name), points)
        })
        .collect();
    PriceTable::from_series(series).unwrap()
}

pub fn make_strategy(
    name: &str,
    schedule: Schedule,
    selector: Selector,
    weighting: Weighting,
) -> StrategyConfig {
    StrategyConfig {
        name: name.into(),
        schedule,
        selector,
        weighting,
    }
}

pub fn these(names: &[&str]) -> Selector {
    Selector::These(names.iter().map(|&n| AssetId::from(n)).collect())
}

pub struct MockSeriesPort {
    pub closes: HashMap<String, Vec<PricePoint>>,
    pub caps: HashMap<String, Vec<PricePoint>>,
    pub errors: HashMap<String, String>,
}

impl MockSeriesPort {
    pub fn new() -> Self {
        Self {
            closes: HashMap::new(),
            caps: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_closes(mut self, asset: &str, points: Vec<PricePoint>) -> Self {
        self.closes.insert(asset.to_string(), points);
        self
    }

    pub fn with_caps(mut self, asset: &str, points: Vec<PricePoint>) -> Self {
        self.caps.insert(asset.to_string(), points);
        self
    }

    pub fn with_error(mut self, asset: &str, reason: &str) -> Self {
        self.errors.insert(asset.to_string(), reason.to_string());
        self
    }

    fn tail(points: &[PricePoint], periods: usize) -> Vec<PricePoint> {
        if periods > 0 && points.len() > periods {
            points[points.len() - periods..].to_vec()
        } else {
            points.to_vec()
        }
    }
}

impl PriceSeriesPort for MockSeriesPort {
    fn fetch_closes(
        &self,
        asset: &AssetId,
        _interval: &str,
        periods: usize,
    ) -> Result<Vec<PricePoint>, FoliosimError> {
        if let Some(reason) = self.errors.get(asset.as_str()) {
            return Err(FoliosimError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .closes
            .get(asset.as_str())
            .map(|p| Self::tail(p, periods))
            .unwrap_or_default())
    }

    fn list_assets(&self, _interval: &str) -> Result<Vec<AssetId>, FoliosimError> {
        let mut assets: Vec<AssetId> = self.closes.keys().map(|k| AssetId::from(k.as_str())).collect();
        assets.sort();
        Ok(assets)
    }
}

impl MarketCapPort for MockSeriesPort {
    fn fetch_caps(
        &self,
        asset: &AssetId,
        _interval: &str,
        periods: usize,
    ) -> Result<Vec<PricePoint>, FoliosimError> {
        if let Some(reason) = self.errors.get(asset.as_str()) {
            return Err(FoliosimError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .caps
            .get(asset.as_str())
            .map(|p| Self::tail(p, periods))
            .unwrap_or_default())
    }
}
