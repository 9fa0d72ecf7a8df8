//! CLI definition and dispatch.
//!
//! Logs go to stderr; scan tables, backtest summaries and JSON go to stdout.

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{run_backtest, validate_range, BacktestResult};
use crate::domain::cancel::CancelToken;
use crate::domain::config::{symbols_from_port, BacktestConfig, ScanConfig};
use crate::domain::error::{ScanError, SymbolErrorRecord};
use crate::domain::metrics::{PortfolioMetrics, SymbolPerformance};
use crate::domain::portfolio::EquityPoint;
use crate::domain::position::BacktestTrade;
use crate::domain::scanner::{scan, ScanReport, ScanRow};
use crate::domain::timeframe::Timeframe;
use crate::domain::universe::parse_symbols;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

pub const LOG_ENV_VAR: &str = "MARKETSCAN_LOG";
const DEFAULT_DATA_DIR: &str = "data";

#[derive(Parser, Debug)]
#[command(name = "marketscan", about = "Technical market scanner and signal backtester")]
pub struct Cli {
    /// Log filter when MARKETSCAN_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Score the latest bar of every symbol and rank the results
    Scan {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Comma-separated symbols; defaults to [scan] symbols, then every file
        #[arg(long)]
        symbols: Option<String>,
        #[arg(long)]
        timeframe: Option<Timeframe>,
        /// Directory for CSV reports
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Replay the score over a date range and report performance
    Backtest {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(long)]
        symbols: Option<String>,
        #[arg(long)]
        timeframe: Option<Timeframe>,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Check a configuration file without fetching data
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List symbols with data for a timeframe
    ListSymbols {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(long, default_value_t = Timeframe::Daily)]
        timeframe: Timeframe,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    if let Err(e) = init_tracing(&cli.log_level, cli.log_format) {
        eprintln!("error: {e}");
        return ExitCode::from(2);
    }

    match dispatch(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(kind = e.kind(), "{e}");
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

/// Runs one subcommand without touching the global subscriber.
pub fn dispatch(command: Command) -> Result<(), ScanError> {
    match command {
        Command::Scan {
            config,
            data_dir,
            symbols,
            timeframe,
            output,
            format,
        } => run_scan(
            config.as_deref(),
            data_dir.as_deref(),
            symbols.as_deref(),
            timeframe,
            output.as_deref(),
            format,
        ),
        Command::Backtest {
            config,
            data_dir,
            symbols,
            timeframe,
            start,
            end,
            output,
            format,
        } => run_backtest_command(
            config.as_deref(),
            data_dir.as_deref(),
            BacktestOverrides {
                symbols: symbols.as_deref(),
                timeframe,
                start,
                end,
            },
            output.as_deref(),
            format,
        ),
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols {
            config,
            data_dir,
            timeframe,
        } => run_list_symbols(config.as_deref(), data_dir.as_deref(), timeframe),
    }
}

/// Installs the global subscriber. The filter comes from `MARKETSCAN_LOG`,
/// falling back to `log_level`. A subscriber that is already installed is
/// left in place.
pub fn init_tracing(log_level: &str, log_format: LogFormat) -> Result<(), String> {
    let filter = std::env::var(LOG_ENV_VAR).unwrap_or_else(|_| log_level.to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter)
        .map_err(|err| format!("invalid log filter: {err}"))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);
    let _ = match log_format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    Ok(())
}

pub fn load_config(path: Option<&Path>) -> Result<FileConfigAdapter, ScanError> {
    match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading config");
            FileConfigAdapter::from_file(path)
        }
        None => Ok(FileConfigAdapter::empty()),
    }
}

fn data_adapter(port: &dyn ConfigPort, data_dir: Option<&Path>) -> CsvAdapter {
    let dir = data_dir
        .map(Path::to_path_buf)
        .or_else(|| port.get_string("data", "dir").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
    tracing::debug!(dir = %dir.display(), "using CSV data directory");
    CsvAdapter::new(dir)
}

/// Symbols from the CLI flag, else the config section, else every symbol the
/// data source has for `timeframe`.
pub fn resolve_symbols(
    flag: Option<&str>,
    port: &dyn ConfigPort,
    section: &str,
    is_crypto: bool,
    data: &dyn DataPort,
    timeframe: Timeframe,
) -> Result<Vec<String>, ScanError> {
    let raw = match flag {
        Some(list) => list.to_string(),
        None => match symbols_from_port(port, section) {
            Some(list) => list,
            None => {
                let all = data.list_symbols(timeframe)?;
                if all.is_empty() {
                    return Err(ScanError::ConfigMissing {
                        section: section.to_string(),
                        key: "symbols".to_string(),
                    });
                }
                all.join(",")
            }
        },
    };
    parse_symbols(&raw, is_crypto)
        .map_err(|e| ScanError::invalid_config(section, "symbols", e.to_string()))
}

pub fn build_scan_config(
    port: &dyn ConfigPort,
    timeframe: Option<Timeframe>,
) -> Result<ScanConfig, ScanError> {
    let mut config = ScanConfig::from_port(port)?;
    if let Some(tf) = timeframe {
        config.timeframe = tf;
    }
    Ok(config)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BacktestOverrides<'a> {
    pub symbols: Option<&'a str>,
    pub timeframe: Option<Timeframe>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

pub fn build_backtest_config(
    port: &dyn ConfigPort,
    overrides: &BacktestOverrides<'_>,
) -> Result<BacktestConfig, ScanError> {
    let mut config = BacktestConfig::from_port_with_dates(port, overrides.start, overrides.end)?;
    if let Some(tf) = overrides.timeframe {
        config.timeframe = tf;
    }
    Ok(config)
}

fn run_scan(
    config_path: Option<&Path>,
    data_dir: Option<&Path>,
    symbols: Option<&str>,
    timeframe: Option<Timeframe>,
    output: Option<&Path>,
    format: OutputFormat,
) -> Result<(), ScanError> {
    let port = load_config(config_path)?;
    let config = build_scan_config(&port, timeframe)?;
    let data = data_adapter(&port, data_dir);
    let symbols = resolve_symbols(symbols, &port, "scan", config.is_crypto, &data, config.timeframe)?;

    let report = scan(&data, &symbols, &config, &CancelToken::new())?;

    if let Some(dir) = output {
        CsvReportAdapter::new().write_scan(&report, dir)?;
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Json => write_json(&mut out, &ScanJson::from(&report))?,
        OutputFormat::Table => print_scan_table(&mut out, &report)?,
    }
    Ok(())
}

fn run_backtest_command(
    config_path: Option<&Path>,
    data_dir: Option<&Path>,
    overrides: BacktestOverrides<'_>,
    output: Option<&Path>,
    format: OutputFormat,
) -> Result<(), ScanError> {
    let port = load_config(config_path)?;
    let config = build_backtest_config(&port, &overrides)?;
    // range problems surface before the data directory is touched
    validate_range(config.start_date, config.end_date, config.timeframe)?;

    let data = data_adapter(&port, data_dir);
    let symbols = resolve_symbols(
        overrides.symbols,
        &port,
        "backtest",
        config.is_crypto,
        &data,
        config.timeframe,
    )?;

    let result = run_backtest(&data, &symbols, &config, &CancelToken::new())?;

    if let Some(dir) = output {
        CsvReportAdapter::new().write_backtest(&result, dir)?;
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Json => write_json(&mut out, &BacktestJson::from(&result))?,
        OutputFormat::Table => print_backtest_summary(&mut out, &result)?,
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), ScanError> {
    let port = FileConfigAdapter::from_file(config_path)?;
    let scan_config = build_scan_config(&port, None)?;
    if let Some(list) = symbols_from_port(&port, "scan") {
        parse_symbols(&list, scan_config.is_crypto)
            .map_err(|e| ScanError::invalid_config("scan", "symbols", e.to_string()))?;
    }

    let has_backtest = port.get_string("backtest", "start_date").is_some()
        || port.get_string("backtest", "end_date").is_some();
    if has_backtest {
        let config = build_backtest_config(&port, &BacktestOverrides::default())?;
        validate_range(config.start_date, config.end_date, config.timeframe)?;
        if let Some(list) = symbols_from_port(&port, "backtest") {
            parse_symbols(&list, config.is_crypto)
                .map_err(|e| ScanError::invalid_config("backtest", "symbols", e.to_string()))?;
        }
    }

    println!("{}: OK", config_path.display());
    Ok(())
}

fn run_list_symbols(
    config_path: Option<&Path>,
    data_dir: Option<&Path>,
    timeframe: Timeframe,
) -> Result<(), ScanError> {
    let port = load_config(config_path)?;
    let data = data_adapter(&port, data_dir);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for symbol in data.list_symbols(timeframe)? {
        writeln!(out, "{symbol}")?;
    }
    Ok(())
}

#[derive(Serialize)]
pub struct ScanJson<'a> {
    pub rows: &'a [ScanRow],
    pub errors: Vec<SymbolErrorRecord>,
}

impl<'a> From<&'a ScanReport> for ScanJson<'a> {
    fn from(report: &'a ScanReport) -> Self {
        ScanJson {
            rows: &report.rows,
            errors: report.errors.iter().map(SymbolErrorRecord::from).collect(),
        }
    }
}

#[derive(Serialize)]
pub struct BacktestJson<'a> {
    pub metrics: &'a PortfolioMetrics,
    pub trades: &'a [BacktestTrade],
    pub equity_curve: &'a [EquityPoint],
    pub symbol_performance: &'a [SymbolPerformance],
    pub errors: Vec<SymbolErrorRecord>,
    pub open_positions: usize,
}

impl<'a> From<&'a BacktestResult> for BacktestJson<'a> {
    fn from(result: &'a BacktestResult) -> Self {
        BacktestJson {
            metrics: &result.metrics,
            trades: &result.trades,
            equity_curve: &result.equity_curve,
            symbol_performance: &result.symbol_performance,
            errors: result.errors.iter().map(SymbolErrorRecord::from).collect(),
            open_positions: result.open_positions.len(),
        }
    }
}

fn write_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> Result<(), ScanError> {
    serde_json::to_writer_pretty(&mut *out, value).map_err(std::io::Error::from)?;
    writeln!(out)?;
    Ok(())
}

pub fn print_scan_table<W: Write>(out: &mut W, report: &ScanReport) -> Result<(), ScanError> {
    writeln!(
        out,
        "{:<12} {:>4} {:>12} {:>8} {:>8} {:>8} {:>6} {:>12} {:>10}",
        "SYMBOL", "TF", "CLOSE", "CHG%", "SCORE", "SIGNAL", "RSI", "STOP", "UNITS"
    )?;
    for row in &report.rows {
        writeln!(
            out,
            "{:<12} {:>4} {:>12.4} {:>7.2}% {:>8.1} {:>8} {:>6.1} {:>12.4} {:>10}",
            row.symbol,
            row.timeframe.as_str(),
            row.close,
            row.change_pct,
            row.score,
            row.direction.as_str(),
            row.rsi,
            row.stop_price,
            row.size_units
        )?;
    }
    if !report.errors.is_empty() {
        writeln!(out)?;
        writeln!(out, "Skipped {} symbol(s):", report.errors.len())?;
        for err in &report.errors {
            writeln!(out, "  {err}")?;
        }
    }
    Ok(())
}

pub fn print_backtest_summary<W: Write>(
    out: &mut W,
    result: &BacktestResult,
) -> Result<(), ScanError> {
    let m = &result.metrics;
    writeln!(out, "=== Backtest Results ===")?;
    writeln!(out, "Initial Equity:   {:.2}", m.initial_equity)?;
    writeln!(out, "Final Equity:     {:.2}", m.final_equity)?;
    writeln!(out, "Total Return:     {:.2}%", m.total_return * 100.0)?;
    writeln!(out, "Sharpe Ratio:     {:.2}", m.sharpe_ratio)?;
    writeln!(out, "Max Drawdown:     -{:.1}%", m.max_drawdown * 100.0)?;
    writeln!(out, "Total Trades:     {}", m.total_trades)?;
    writeln!(out, "Win Rate:         {:.1}%", m.win_rate * 100.0)?;
    writeln!(out, "Profit Factor:    {:.2}", m.profit_factor)?;
    writeln!(out, "Avg Win / Loss:   {:.2} / {:.2}", m.avg_win, m.avg_loss)?;
    writeln!(out, "Avg R-Multiple:   {:.2}", m.avg_r_multiple)?;
    writeln!(out, "Avg Holding Days: {:.1}", m.avg_holding_days)?;
    if !result.open_positions.is_empty() {
        writeln!(out, "Open Positions:   {}", result.open_positions.len())?;
    }

    if !result.symbol_performance.is_empty() {
        writeln!(out)?;
        writeln!(out, "=== Per-Symbol Summary ===")?;
        for perf in &result.symbol_performance {
            writeln!(
                out,
                "  {:<12} trades={:<4} win_rate={:>5.1}% pnl={:>12.2} avg_return={:>7.2}%",
                perf.symbol,
                perf.trades,
                perf.win_rate * 100.0,
                perf.total_pnl,
                perf.avg_return * 100.0
            )?;
        }
    }

    if !result.errors.is_empty() {
        writeln!(out)?;
        writeln!(out, "Skipped {} symbol(s):", result.errors.len())?;
        for err in &result.errors {
            writeln!(out, "  {err}")?;
        }
    }
    Ok(())
}
