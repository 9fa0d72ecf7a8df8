//! CSV report adapter implementing ReportPort.
//!
//! A scan writes `scan.csv` and `errors.csv`; a backtest writes
//! `trades.csv`, `equity.csv`, `symbols.csv` and `errors.csv`.

use std::fs;
use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::{ScanError, SymbolError, SymbolErrorRecord};
use crate::domain::scanner::ScanReport;
use crate::ports::report_port::ReportPort;
use serde::Serialize;

pub const SCAN_FILE: &str = "scan.csv";
pub const TRADES_FILE: &str = "trades.csv";
pub const EQUITY_FILE: &str = "equity.csv";
pub const SYMBOLS_FILE: &str = "symbols.csv";
pub const ERRORS_FILE: &str = "errors.csv";

// Column order follows the serde field order of each row type. `serialize`
// only emits a header alongside the first record, so empty reports use these.
pub const SCAN_HEADER: &[&str] = &[
    "symbol",
    "timeframe",
    "asset_class",
    "timestamp",
    "close",
    "change",
    "change_pct",
    "volume",
    "score",
    "direction",
    "rsi",
    "ema_long",
    "macd_hist",
    "atr",
    "atr_pct",
    "bb_width",
    "vol_z",
    "rolling_max",
    "rolling_min",
    "stop_price",
    "per_unit_risk",
    "risk_dollars",
    "size_units",
    "notional_dollars",
];
pub const TRADES_HEADER: &[&str] = &[
    "symbol",
    "direction",
    "entry_time",
    "entry_price",
    "exit_time",
    "exit_price",
    "position_size",
    "position_value",
    "trade_return",
    "trade_pnl",
    "r_multiple",
    "exit_reason",
    "holding_days",
];
pub const EQUITY_HEADER: &[&str] = &["timestamp", "equity", "daily_pnl"];
pub const SYMBOLS_HEADER: &[&str] = &[
    "symbol",
    "trades",
    "wins",
    "total_pnl",
    "avg_return",
    "win_rate",
];
pub const ERRORS_HEADER: &[&str] = &["symbol", "kind", "reason"];

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

fn write_rows<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> Result<(), ScanError> {
    let mut writer = csv::Writer::from_path(path)?;
    if rows.is_empty() {
        writer.write_record(header)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    tracing::debug!(path = %path.display(), rows = rows.len(), "wrote report");
    Ok(())
}

fn write_errors(dir: &Path, errors: &[SymbolError]) -> Result<(), ScanError> {
    let records: Vec<SymbolErrorRecord> = errors.iter().map(SymbolErrorRecord::from).collect();
    write_rows(&dir.join(ERRORS_FILE), ERRORS_HEADER, &records)
}

impl ReportPort for CsvReportAdapter {
    fn write_scan(&self, report: &ScanReport, output_dir: &Path) -> Result<(), ScanError> {
        fs::create_dir_all(output_dir)?;
        write_rows(&output_dir.join(SCAN_FILE), SCAN_HEADER, &report.rows)?;
        write_errors(output_dir, &report.errors)?;
        tracing::info!(dir = %output_dir.display(), "scan report written");
        Ok(())
    }

    fn write_backtest(&self, result: &BacktestResult, output_dir: &Path) -> Result<(), ScanError> {
        fs::create_dir_all(output_dir)?;
        write_rows(&output_dir.join(TRADES_FILE), TRADES_HEADER, &result.trades)?;
        write_rows(&output_dir.join(EQUITY_FILE), EQUITY_HEADER, &result.equity_curve)?;
        write_rows(&output_dir.join(SYMBOLS_FILE), SYMBOLS_HEADER, &result.symbol_performance)?;
        write_errors(output_dir, &result.errors)?;
        tracing::info!(dir = %output_dir.display(), "backtest report written");
        Ok(())
    }
}
