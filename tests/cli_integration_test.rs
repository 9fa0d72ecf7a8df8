//! CLI integration tests: real INI and CSV files on disk, driven through
//! the same dispatch path as the binary.

mod common;

use clap::Parser;
use common::*;
use marketscan::adapters::csv_adapter::CsvAdapter;
use marketscan::adapters::csv_report_adapter::{ERRORS_FILE, SCAN_FILE, TRADES_FILE};
use marketscan::adapters::file_config_adapter::FileConfigAdapter;
use marketscan::cli::{self, Cli};
use marketscan::domain::backtest::run_backtest;
use marketscan::domain::cancel::CancelToken;
use marketscan::domain::error::ScanError;
use marketscan::domain::timeframe::Timeframe;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

fn write_csv(dir: &Path, file: &str, bars: &[Bar]) {
    let mut content = String::from("timestamp,open,high,low,close,volume\n");
    for b in bars {
        content.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.timestamp.to_rfc3339(),
            b.open,
            b.high,
            b.low,
            b.close,
            b.volume
        ));
    }
    fs::write(dir.join(file), content).unwrap();
}

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// Data directory with a rising and a flat daily symbol.
fn data_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_csv(dir.path(), "UP_1D.csv", &linear_bars(day(2021, 1, 1), 300, 100.0, 400.0));
    write_csv(dir.path(), "FLAT_1D.csv", &flat_bars(day(2021, 1, 1), 300, 100.0));
    write_csv(dir.path(), "GROW_1D.csv", &growth_bars(day(2021, 1, 1), 600, 100.0, 0.002));
    dir
}

fn run_cli(args: &[&str]) -> Result<(), ScanError> {
    let mut argv = vec!["marketscan"];
    argv.extend_from_slice(args);
    cli::dispatch(Cli::parse_from(argv).command)
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

mod scan_command {
    use super::*;

    #[test]
    fn writes_ranked_report() {
        let data = data_dir();
        let out = TempDir::new().unwrap();
        let ini = write_temp_ini(&format!(
            "[data]\ndir = {}\n\n[scan]\nsymbols = FLAT, UP\n",
            path_str(data.path())
        ));

        run_cli(&[
            "scan",
            "--config",
            path_str(ini.path()),
            "--output",
            path_str(out.path()),
        ])
        .unwrap();

        let report = fs::read_to_string(out.path().join(SCAN_FILE)).unwrap();
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("symbol,timeframe,asset_class,timestamp"));
        assert!(lines[1].starts_with("UP,1D,equity,"));
        assert!(lines[2].starts_with("FLAT,1D,equity,"));
    }

    #[test]
    fn symbol_flag_overrides_config_and_reports_failures() {
        let data = data_dir();
        let out = TempDir::new().unwrap();
        let ini = write_temp_ini("[scan]\nsymbols = FLAT\n");

        run_cli(&[
            "scan",
            "--config",
            path_str(ini.path()),
            "--data-dir",
            path_str(data.path()),
            "--symbols",
            "up,nope",
            "--format",
            "json",
            "--output",
            path_str(out.path()),
        ])
        .unwrap();

        let report = fs::read_to_string(out.path().join(SCAN_FILE)).unwrap();
        assert_eq!(report.lines().count(), 2);
        assert!(report.contains("\nUP,"));

        let errors = fs::read_to_string(out.path().join(ERRORS_FILE)).unwrap();
        assert!(errors.contains("NOPE,data_unavailable"));
    }

    #[test]
    fn scans_every_file_without_symbol_list() {
        let data = data_dir();
        let out = TempDir::new().unwrap();

        run_cli(&[
            "scan",
            "--data-dir",
            path_str(data.path()),
            "--output",
            path_str(out.path()),
        ])
        .unwrap();

        let report = fs::read_to_string(out.path().join(SCAN_FILE)).unwrap();
        assert_eq!(report.lines().count(), 4);
    }

    #[test]
    fn duplicate_symbols_are_config_errors() {
        let data = data_dir();
        let result = run_cli(&[
            "scan",
            "--data-dir",
            path_str(data.path()),
            "--symbols",
            "UP,up",
        ]);
        assert!(matches!(
            result,
            Err(ScanError::ConfigInvalid { key, .. }) if key == "symbols"
        ));
    }
}

mod backtest_command {
    use super::*;

    #[test]
    fn writes_trade_log() {
        let data = data_dir();
        let out = TempDir::new().unwrap();

        run_cli(&[
            "backtest",
            "--data-dir",
            path_str(data.path()),
            "--symbols",
            "GROW",
            "--start",
            "2022-01-01",
            "--end",
            "2022-06-30",
            "--output",
            path_str(out.path()),
        ])
        .unwrap();

        let trades = fs::read_to_string(out.path().join(TRADES_FILE)).unwrap();
        assert_eq!(trades.lines().count(), 10);
        assert!(trades.lines().skip(1).all(|l| l.contains("time_exit")));
    }

    #[test]
    fn inverted_range_is_rejected_before_reading_data() {
        let result = run_cli(&[
            "backtest",
            "--data-dir",
            "/nonexistent/marketscan",
            "--symbols",
            "GROW",
            "--start",
            "2022-06-30",
            "--end",
            "2022-01-01",
        ]);
        assert!(matches!(result, Err(ScanError::InvalidRange { .. })));
    }

    #[test]
    fn missing_dates_are_reported() {
        let ini = write_temp_ini("[backtest]\nmin_score = 40\n");
        let result = run_cli(&["backtest", "--config", path_str(ini.path())]);
        assert!(matches!(
            result,
            Err(ScanError::ConfigMissing { key, .. }) if key == "start_date"
        ));
    }

    #[test]
    fn config_dates_and_symbols_are_used() {
        let data = data_dir();
        let ini = write_temp_ini(&format!(
            "[data]\ndir = {}\n\n[backtest]\nsymbols = GROW\nstart_date = 2022-01-01\n\
             end_date = 2022-06-30\nmin_score = 50\nmax_positions = 2\n",
            path_str(data.path())
        ));
        let port = FileConfigAdapter::from_file(ini.path()).unwrap();
        let config = cli::build_backtest_config(&port, &cli::BacktestOverrides::default()).unwrap();
        assert_eq!(config.max_positions, 2);

        let adapter = CsvAdapter::new(data.path().to_path_buf());
        let symbols =
            cli::resolve_symbols(None, &port, "backtest", false, &adapter, config.timeframe).unwrap();
        assert_eq!(symbols, vec!["GROW"]);

        let result = run_backtest(&adapter, &symbols, &config, &CancelToken::new()).unwrap();
        assert_eq!(result.trades.len(), 9);

        let mut summary = Vec::new();
        cli::print_backtest_summary(&mut summary, &result).unwrap();
        let summary = String::from_utf8(summary).unwrap();
        assert!(summary.contains("Total Trades:     9"));
        assert!(summary.contains("Win Rate:         100.0%"));
        assert!(summary.contains("Open Positions:   1"));
    }
}

mod validate_command {
    use super::*;

    #[test]
    fn accepts_complete_config() {
        let ini = write_temp_ini(
            "[scan]\ntimeframe = 1h\nsymbols = AAPL, MSFT, GC=F\n\n\
             [backtest]\nstart_date = 2023-01-01\nend_date = 2023-06-30\n\n\
             [weights]\nregime = 30\n",
        );
        run_cli(&["validate", "--config", path_str(ini.path())]).unwrap();
    }

    #[test]
    fn rejects_unknown_timeframe() {
        let ini = write_temp_ini("[scan]\ntimeframe = 4h\n");
        let result = run_cli(&["validate", "--config", path_str(ini.path())]);
        assert!(matches!(
            result,
            Err(ScanError::ConfigInvalid { key, .. }) if key == "timeframe"
        ));
    }

    #[test]
    fn rejects_unparsable_number() {
        let ini = write_temp_ini(
            "[backtest]\nstart_date = 2023-01-01\nend_date = 2023-06-30\nrisk_per_trade = 0.05x\n",
        );
        let result = run_cli(&["validate", "--config", path_str(ini.path())]);
        assert!(matches!(
            result,
            Err(ScanError::ConfigInvalid { key, .. }) if key == "risk_per_trade"
        ));
    }

    #[test]
    fn rejects_short_backtest_range() {
        let ini = write_temp_ini("[backtest]\nstart_date = 2023-01-01\nend_date = 2023-01-15\n");
        let result = run_cli(&["validate", "--config", path_str(ini.path())]);
        assert!(matches!(result, Err(ScanError::InvalidRange { .. })));
    }

    #[test]
    fn rejects_empty_symbol_token() {
        let ini = write_temp_ini("[scan]\nsymbols = AAPL,,MSFT\n");
        let result = run_cli(&["validate", "--config", path_str(ini.path())]);
        assert!(matches!(result, Err(ScanError::ConfigInvalid { .. })));
    }

    #[test]
    fn missing_file_is_parse_error() {
        let result = run_cli(&["validate", "--config", "/nonexistent/marketscan.ini"]);
        assert!(matches!(result, Err(ScanError::ConfigParse { .. })));
    }
}

mod list_symbols_command {
    use super::*;

    #[test]
    fn lists_files_for_timeframe() {
        let data = data_dir();
        run_cli(&["list-symbols", "--data-dir", path_str(data.path())]).unwrap();

        let adapter = CsvAdapter::new(data.path().to_path_buf());
        let port = FileConfigAdapter::empty();
        let symbols =
            cli::resolve_symbols(None, &port, "scan", false, &adapter, Timeframe::Daily).unwrap();
        assert_eq!(symbols, vec!["FLAT", "GROW", "UP"]);
    }

    #[test]
    fn missing_directory_is_io_error() {
        let result = run_cli(&["list-symbols", "--data-dir", "/nonexistent/marketscan"]);
        assert!(matches!(result, Err(ScanError::Io(_))));
    }
}
