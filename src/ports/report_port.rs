//! Report generation port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::ScanError;
use crate::domain::scanner::ScanReport;
use std::path::Path;

/// Persists scan and backtest results under an output directory.
pub trait ReportPort {
    fn write_scan(&self, report: &ScanReport, output_dir: &Path) -> Result<(), ScanError>;

    fn write_backtest(&self, result: &BacktestResult, output_dir: &Path) -> Result<(), ScanError>;
}
