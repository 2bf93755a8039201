//! Results output port trait.

use std::path::Path;

use crate::domain::error::FoliosimError;
use crate::domain::orchestrator::BacktestReport;

/// Consumer of completed backtest results. Receives the report after every
/// strategy slot has finished; it cannot influence a run.
pub trait ReportPort {
    fn write(&self, report: &BacktestReport, output_path: &Path) -> Result<(), FoliosimError>;
}
