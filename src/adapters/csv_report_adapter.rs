//! CSV report adapter.
//!
//! One row per period: the date followed by one equity column per completed
//! strategy, in input order. Failed slots contribute no column.

use std::path::Path;

use crate::domain::error::FoliosimError;
use crate::domain::orchestrator::BacktestReport;
use crate::ports::report_port::ReportPort;

pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CsvReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, report: &BacktestReport, output_path: &Path) -> Result<(), FoliosimError> {
        let mut writer = csv::Writer::from_path(output_path).map_err(|e| FoliosimError::Io {
            reason: format!("failed to open {}: {}", output_path.display(), e),
        })?;

        let completed: Vec<_> = report.completed().collect();

        let mut header = vec!["date".to_string()];
        header.extend(completed.iter().map(|outcome| outcome.name.clone()));
        writer.write_record(&header).map_err(|e| FoliosimError::Io {
            reason: format!("failed to write header: {}", e),
        })?;

        // Every completed curve spans the same table, so dates line up.
        if let Some(first) = completed.first() {
            for (index, point) in first.equity_curve.iter().enumerate() {
                let mut row = vec![point.date.to_string()];
                for outcome in &completed {
                    row.push(outcome.equity_curve[index].equity.to_string());
                }
                writer.write_record(&row).map_err(|e| FoliosimError::Io {
                    reason: format!("failed to write row for {}: {}", point.date, e),
                })?;
            }
        }

        writer.flush().map_err(|e| FoliosimError::Io {
            reason: format!("failed to flush {}: {}", output_path.display(), e),
        })?;
        Ok(())
    }
}
