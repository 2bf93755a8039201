//! CSV file data adapter.
//!
//! One file per asset: `{ASSET}_{interval}.csv` with a `date,close` header
//! for prices, `{ASSET}_{interval}_cap.csv` for market capitalizations.
//! Rows may arrive in any order; the adapter sorts by date and keeps the
//! most recent `periods` rows.

use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;

use crate::domain::error::FoliosimError;
use crate::domain::prices::{AssetId, PricePoint};
use crate::ports::data_port::{MarketCapPort, PriceSeriesPort};

pub struct CsvDataAdapter {
    base_path: PathBuf,
}

impl CsvDataAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn price_path(&self, asset: &AssetId, interval: &str) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", asset, interval))
    }

    fn cap_path(&self, asset: &AssetId, interval: &str) -> PathBuf {
        self.base_path
            .join(format!("{}_{}_cap.csv", asset, interval))
    }

    fn read_points(&self, path: &PathBuf, periods: usize) -> Result<Vec<PricePoint>, FoliosimError> {
        let content = fs::read_to_string(path).map_err(|e| FoliosimError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut points = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| FoliosimError::Data {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;

            let date_str = record.get(0).ok_or_else(|| FoliosimError::Data {
                reason: format!("missing date column in {}", path.display()),
            })?;
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                FoliosimError::Data {
                    reason: format!("invalid date '{}' in {}: {}", date_str, path.display(), e),
                }
            })?;

            let value: f64 = record
                .get(1)
                .ok_or_else(|| FoliosimError::Data {
                    reason: format!("missing value column in {}", path.display()),
                })?
                .parse()
                .map_err(|e| FoliosimError::Data {
                    reason: format!("invalid value on {} in {}: {}", date, path.display(), e),
                })?;

            points.push(PricePoint { date, value });
        }

        points.sort_by_key(|p| p.date);
        if periods > 0 && points.len() > periods {
            points.drain(..points.len() - periods);
        }
        Ok(points)
    }
}

impl PriceSeriesPort for CsvDataAdapter {
    fn fetch_closes(
        &self,
        asset: &AssetId,
        interval: &str,
        periods: usize,
    ) -> Result<Vec<PricePoint>, FoliosimError> {
        self.read_points(&self.price_path(asset, interval), periods)
    }

    fn list_assets(&self, interval: &str) -> Result<Vec<AssetId>, FoliosimError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| FoliosimError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let suffix = format!("_{}.csv", interval);
        let mut assets = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| FoliosimError::Data {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            // Cap files carry a `_cap` infix and never match the suffix.
            if name_str.ends_with(&suffix) {
                let asset = &name_str[..name_str.len() - suffix.len()];
                assets.push(AssetId::from(asset));
            }
        }

        assets.sort();
        Ok(assets)
    }
}

impl MarketCapPort for CsvDataAdapter {
    fn fetch_caps(
        &self,
        asset: &AssetId,
        interval: &str,
        periods: usize,
    ) -> Result<Vec<PricePoint>, FoliosimError> {
        self.read_points(&self.cap_path(asset, interval), periods)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = "date,close\n\
            2024-01-17,115.0\n\
            2024-01-15,105.0\n\
            2024-01-16,110.0\n";

        fs::write(path.join("BTC_1d.csv"), csv_content).unwrap();
        fs::write(path.join("ETH_1d.csv"), "date,close\n2024-01-15,50.0\n").unwrap();
        fs::write(path.join("BTC_1h.csv"), "date,close\n").unwrap();
        fs::write(
            path.join("BTC_1d_cap.csv"),
            "date,close\n2024-01-15,800000.0\n2024-01-16,820000.0\n",
        )
        .unwrap();

        (dir, path)
    }

    #[test]
    fn fetch_closes_sorts_by_date() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvDataAdapter::new(path);

        let points = adapter.fetch_closes(&"BTC".into(), "1d", 0).unwrap();

        assert_eq!(points.len(), 3);
        assert_eq!(points[0].date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(points[0].value, 105.0);
        assert_eq!(points[2].date, NaiveDate::from_ymd_opt(2024, 1, 17).unwrap());
        assert_eq!(points[2].value, 115.0);
    }

    #[test]
    fn limit_keeps_the_most_recent_rows() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvDataAdapter::new(path);

        let points = adapter.fetch_closes(&"BTC".into(), "1d", 2).unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, NaiveDate::from_ymd_opt(2024, 1, 16).unwrap());
    }

    #[test]
    fn missing_file_is_an_error() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvDataAdapter::new(path);

        let result = adapter.fetch_closes(&"DOGE".into(), "1d", 0);
        assert!(matches!(result, Err(FoliosimError::Data { .. })));
    }

    #[test]
    fn bad_value_is_a_row_precise_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();
        fs::write(
            path.join("BAD_1d.csv"),
            "date,close\n2024-01-15,not-a-number\n",
        )
        .unwrap();
        let adapter = CsvDataAdapter::new(path);

        let err = adapter.fetch_closes(&"BAD".into(), "1d", 0).unwrap_err();
        assert!(err.to_string().contains("2024-01-15"));
    }

    #[test]
    fn caps_come_from_the_cap_file() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvDataAdapter::new(path);

        let caps = adapter.fetch_caps(&"BTC".into(), "1d", 0).unwrap();
        assert_eq!(caps.len(), 2);
        assert_eq!(caps[1].value, 820000.0);
    }

    #[test]
    fn list_assets_filters_by_interval_and_skips_cap_files() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvDataAdapter::new(path);

        let daily = adapter.list_assets("1d").unwrap();
        let names: Vec<&str> = daily.iter().map(|a| a.as_str()).collect();
        assert_eq!(names, vec!["BTC", "ETH"]);

        let hourly = adapter.list_assets("1h").unwrap();
        assert_eq!(hourly.len(), 1);
    }
}
