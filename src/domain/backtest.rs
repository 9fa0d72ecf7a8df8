//! Backtest simulator: replays feature rows and scores for several symbols
//! on one shared clock, opening and closing positions against a single
//! equity account.
//!
//! Symbol preparation (fetch, normalize, compile, score) is independent per
//! symbol and may run on the rayon pool. The clock walk is sequential: every
//! symbol at time T is processed, in input order, before T+1.

use crate::domain::cancel::CancelToken;
use crate::domain::config::{BacktestConfig, ScoringConfig};
use crate::domain::error::{ScanError, SymbolError};
use crate::domain::features::{compile_features, FeatureRow};
use crate::domain::metrics::{PortfolioMetrics, SymbolPerformance};
use crate::domain::ohlcv::BarSeries;
use crate::domain::portfolio::{BacktestState, EquityPoint};
use crate::domain::position::{BacktestPosition, BacktestTrade, ExitReason};
use crate::domain::scanner::map_symbols;
use crate::domain::scoring::{score_row, Direction};
use crate::domain::timeframe::Timeframe;
use crate::domain::universe::normalize_symbol;
use crate::ports::data_port::{DataPort, FetchRange};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use std::collections::{BTreeSet, HashMap};

pub const MIN_RANGE_DAYS: i64 = 30;
pub const TIME_EXIT_DAYS: i64 = 20;
/// Largest share of current equity a single position may take.
pub const MAX_POSITION_FRACTION: f64 = 0.2;

/// Feature rows and per-bar scores of one symbol, indexed by timestamp.
#[derive(Debug, Clone)]
pub struct SymbolData {
    pub symbol: String,
    pub rows: Vec<FeatureRow>,
    pub scores: Vec<f64>,
    index: HashMap<DateTime<Utc>, usize>,
}

impl SymbolData {
    /// Pairs `rows` with their `scores`; both must have the same length.
    pub fn new(
        symbol: impl Into<String>,
        rows: Vec<FeatureRow>,
        scores: Vec<f64>,
    ) -> Result<Self, ScanError> {
        let symbol = symbol.into();
        if rows.len() != scores.len() {
            return Err(ScanError::ComputationUndefined {
                reason: format!("{} feature rows but {} scores", rows.len(), scores.len()),
                symbol,
            });
        }
        Ok(Self::indexed(symbol, rows, scores))
    }

    /// Scores every row with `scoring`.
    pub fn scored(symbol: impl Into<String>, rows: Vec<FeatureRow>, scoring: &ScoringConfig) -> Self {
        let scores = rows.iter().map(|row| score_row(row, scoring).score).collect();
        Self::indexed(symbol.into(), rows, scores)
    }

    fn indexed(symbol: String, rows: Vec<FeatureRow>, scores: Vec<f64>) -> Self {
        let index = rows
            .iter()
            .enumerate()
            .map(|(i, row)| (row.bar.timestamp, i))
            .collect();
        SymbolData {
            symbol,
            rows,
            scores,
            index,
        }
    }

    pub fn at(&self, timestamp: DateTime<Utc>) -> Option<(&FeatureRow, f64)> {
        self.index
            .get(&timestamp)
            .map(|&i| (&self.rows[i], self.scores[i]))
    }
}

#[derive(Debug)]
pub struct BacktestResult {
    pub trades: Vec<BacktestTrade>,
    pub equity_curve: Vec<EquityPoint>,
    pub metrics: PortfolioMetrics,
    pub symbol_performance: Vec<SymbolPerformance>,
    pub errors: Vec<SymbolError>,
    /// Positions still open when the clock ran out; not marked to market.
    pub open_positions: Vec<BacktestPosition>,
}

/// Inclusive UTC bounds of the configured date range.
pub fn range_bounds(config: &BacktestConfig) -> Result<(DateTime<Utc>, DateTime<Utc>), ScanError> {
    let start = config.start_date.and_time(NaiveTime::MIN).and_utc();
    let end = config
        .end_date
        .and_hms_opt(23, 59, 59)
        .ok_or_else(|| ScanError::invalid_range("end date out of range"))?
        .and_utc();
    Ok((start, end))
}

/// First instant fetched for a backtest: the range start, moved back far
/// enough for the longest indicator to be defined on the first bar.
pub fn fetch_start(config: &BacktestConfig) -> Result<DateTime<Utc>, ScanError> {
    let (start, _) = range_bounds(config)?;
    config
        .timeframe
        .warmup_padding(config.features.warmup_rows())
        .and_then(|padding| start.checked_sub_signed(padding))
        .ok_or_else(|| {
            ScanError::invalid_range(format!(
                "indicator warm-up before {} is out of range",
                config.start_date
            ))
        })
}

/// Rejects inverted, too-short and provider-exceeding ranges.
pub fn validate_range(
    start: NaiveDate,
    end: NaiveDate,
    timeframe: Timeframe,
) -> Result<(), ScanError> {
    if start > end {
        return Err(ScanError::invalid_range(format!(
            "start date {start} is after end date {end}"
        )));
    }
    let span = (end - start).num_days();
    if span < MIN_RANGE_DAYS {
        return Err(ScanError::invalid_range(format!(
            "range of {span} days is shorter than the minimum of {MIN_RANGE_DAYS} days"
        )));
    }
    if let Some(max) = timeframe.max_range() {
        if span > max.num_days() {
            return Err(ScanError::invalid_range(format!(
                "range of {span} days exceeds the {} day limit for {timeframe} bars",
                max.num_days()
            )));
        }
    }
    Ok(())
}

/// Fetches, compiles and scores one symbol over the configured range.
/// Bars before `start_date` are fetched only to warm up indicators.
pub fn prepare_symbol(
    data_port: &dyn DataPort,
    symbol: &str,
    config: &BacktestConfig,
) -> Result<SymbolData, ScanError> {
    let (start, end) = range_bounds(config)?;
    let warmup = config.features.warmup_rows();

    let raw = data_port.fetch_bars(
        symbol,
        config.timeframe,
        FetchRange::Between {
            start: fetch_start(config)?,
            end,
        },
    )?;
    let series = BarSeries::normalize(symbol, config.timeframe, raw);
    if series.is_empty() {
        return Err(ScanError::DataUnavailable {
            symbol: symbol.to_string(),
            reason: "no usable bars in range".to_string(),
        });
    }

    let rows: Vec<FeatureRow> = compile_features(&series, &config.features)
        .into_iter()
        .filter(|row| row.bar.timestamp >= start && row.bar.timestamp <= end)
        .collect();
    if rows.is_empty() {
        return Err(ScanError::DataInsufficient {
            symbol: symbol.to_string(),
            bars: series.len(),
            minimum: warmup + 1,
        });
    }

    tracing::debug!(symbol = %symbol, rows = rows.len(), "prepared symbol");
    Ok(SymbolData::scored(symbol, rows, &config.scoring))
}

/// Sorted union of every symbol's timestamps.
pub fn build_clock(symbols: &[SymbolData]) -> Vec<DateTime<Utc>> {
    let unique: BTreeSet<DateTime<Utc>> = symbols
        .iter()
        .flat_map(|data| data.rows.iter().map(|row| row.bar.timestamp))
        .collect();
    unique.into_iter().collect()
}

/// Walks the clock and returns the final state.
pub fn simulate(
    symbols: &[SymbolData],
    config: &BacktestConfig,
    cancel: &CancelToken,
) -> Result<BacktestState, ScanError> {
    let clock = build_clock(symbols);
    let mut state = BacktestState::new(config.initial_equity);

    for timestamp in clock {
        cancel.check()?;

        for data in symbols {
            let Some((row, score)) = data.at(timestamp) else {
                continue;
            };

            if let Some((price, reason)) = exit_signal(&state, data, row, score, config) {
                if let Some(position) = state.positions.remove(&data.symbol) {
                    let trade = position.close(timestamp, price, reason);
                    tracing::debug!(
                        symbol = %trade.symbol,
                        reason = %reason,
                        pnl = trade.trade_pnl,
                        "closed position"
                    );
                    state.close(trade);
                }
            }

            if !state.has_position(&data.symbol)
                && state.position_count() < config.max_positions
                && state.current_equity > 0.0
                && score >= config.min_score
            {
                if let Some(position) =
                    open_position(&data.symbol, row, score, state.current_equity, config)
                {
                    tracing::debug!(
                        symbol = %position.symbol,
                        direction = %position.direction,
                        entry = position.entry_price,
                        stop = position.stop_price,
                        "opened position"
                    );
                    state.open(position);
                }
            }
        }

        state.mark(timestamp);
    }

    Ok(state)
}

/// Stop-loss first (filled at the stop), then score decay, then holding time
/// (both filled at the close).
fn exit_signal(
    state: &BacktestState,
    data: &SymbolData,
    row: &FeatureRow,
    score: f64,
    config: &BacktestConfig,
) -> Option<(f64, ExitReason)> {
    let position = state.positions.get(&data.symbol)?;
    if position.stop_hit(&row.bar) {
        Some((position.stop_price, ExitReason::StopLoss))
    } else if score < config.min_score / 2.0 {
        Some((row.bar.close, ExitReason::ScoreExit))
    } else if position.holding_days(row.bar.timestamp) >= TIME_EXIT_DAYS {
        Some((row.bar.close, ExitReason::TimeExit))
    } else {
        None
    }
}

/// Sizes an entry at the bar close. Units are fractional; the position value
/// is capped at [`MAX_POSITION_FRACTION`] of equity.
fn open_position(
    symbol: &str,
    row: &FeatureRow,
    score: f64,
    equity: f64,
    config: &BacktestConfig,
) -> Option<BacktestPosition> {
    // strictly positive here, unlike the scanner's tie rule
    let direction = if score > 0.0 {
        Direction::Bullish
    } else {
        Direction::Bearish
    };
    let entry_price = row.bar.close;
    let stop_distance = config.stop_atr_mult * row.atr;
    if !(stop_distance > 0.0) || !(entry_price > 0.0) {
        return None;
    }

    let mut position_size = equity * config.risk_per_trade / stop_distance;
    let cap = equity * MAX_POSITION_FRACTION;
    if position_size * entry_price > cap {
        position_size = cap / entry_price;
    }
    if !(position_size > 0.0) {
        return None;
    }

    let stop_price = match direction {
        Direction::Bullish => entry_price - stop_distance,
        Direction::Bearish => entry_price + stop_distance,
    };

    Some(BacktestPosition {
        symbol: symbol.to_string(),
        direction,
        entry_price,
        entry_time: row.bar.timestamp,
        stop_price,
        position_size,
        position_value: position_size * entry_price,
        risk_dollars: position_size * stop_distance,
    })
}

/// Runs a full backtest. Range and config errors abort before any fetch;
/// per-symbol failures are collected in [`BacktestResult::errors`].
pub fn run_backtest(
    data_port: &dyn DataPort,
    symbols: &[String],
    config: &BacktestConfig,
    cancel: &CancelToken,
) -> Result<BacktestResult, ScanError> {
    validate_range(config.start_date, config.end_date, config.timeframe)?;
    config.validate()?;
    fetch_start(config)?;
    let symbols: Vec<String> = symbols
        .iter()
        .map(|s| normalize_symbol(s, config.is_crypto))
        .collect();

    tracing::info!(
        symbols = symbols.len(),
        start = %config.start_date,
        end = %config.end_date,
        timeframe = %config.timeframe,
        "starting backtest"
    );

    let outcomes = map_symbols(&symbols, config.parallel, |symbol| {
        cancel.check()?;
        Ok(prepare_symbol(data_port, symbol, config))
    })?;

    let mut prepared = Vec::new();
    let mut errors = Vec::new();
    for (symbol, outcome) in symbols.iter().zip(outcomes) {
        match outcome {
            Ok(data) => prepared.push(data),
            Err(error) => {
                tracing::warn!(symbol = %symbol, kind = error.kind(), "skipping symbol: {error}");
                errors.push(SymbolError::new(symbol.as_str(), error));
            }
        }
    }

    if prepared.is_empty() {
        return Err(ScanError::DataUnavailable {
            symbol: "all".to_string(),
            reason: format!("none of {} symbols produced usable data", symbols.len()),
        });
    }

    let state = simulate(&prepared, config, cancel)?;
    let names: Vec<String> = prepared.iter().map(|d| d.symbol.clone()).collect();
    let metrics = PortfolioMetrics::compute(&state, config.timeframe.annualization_factor());
    let symbol_performance = SymbolPerformance::compute_all(&names, &state.trades);

    tracing::info!(
        trades = metrics.total_trades,
        final_equity = metrics.final_equity,
        max_drawdown = metrics.max_drawdown,
        "backtest complete"
    );

    let mut open_positions: Vec<BacktestPosition> = state.positions.into_values().collect();
    open_positions.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    Ok(BacktestResult {
        trades: state.trades,
        equity_curve: state.equity_curve,
        metrics,
        symbol_performance,
        errors,
        open_positions,
    })
}
