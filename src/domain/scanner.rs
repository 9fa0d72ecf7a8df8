//! Single-point-in-time scan across a symbol universe.
//!
//! Each symbol is fetched, normalized, filtered, compiled and scored on its
//! own. A failing symbol becomes a [`SymbolError`] next to the ranked rows;
//! only cancellation aborts the whole scan.

use crate::domain::cancel::CancelToken;
use crate::domain::config::ScanConfig;
use crate::domain::error::{ScanError, SymbolError};
use crate::domain::features::compile_features;
use crate::domain::ohlcv::BarSeries;
use crate::domain::scoring::{score_row, Direction};
use crate::domain::sizing::size_position;
use crate::domain::timeframe::Timeframe;
use crate::domain::universe::{normalize_symbol, AssetClass};
use crate::ports::data_port::{DataPort, FetchRange};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;

/// Bars averaged for the liquidity filter.
pub const LIQUIDITY_WINDOW: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanRow {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub asset_class: AssetClass,
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    pub change: f64,
    pub change_pct: f64,
    pub volume: f64,
    pub score: f64,
    pub direction: Direction,
    pub rsi: f64,
    pub ema_long: f64,
    pub macd_hist: f64,
    pub atr: f64,
    pub atr_pct: Option<f64>,
    pub bb_width: f64,
    pub vol_z: f64,
    pub rolling_max: f64,
    pub rolling_min: f64,
    pub stop_price: f64,
    pub per_unit_risk: f64,
    pub risk_dollars: f64,
    pub size_units: u64,
    pub notional_dollars: f64,
}

#[derive(Debug, Default)]
pub struct ScanReport {
    /// Sorted by score, highest first.
    pub rows: Vec<ScanRow>,
    pub errors: Vec<SymbolError>,
}

/// Scans `symbols` after normalizing each one with `config.is_crypto`.
pub fn scan(
    data_port: &dyn DataPort,
    symbols: &[String],
    config: &ScanConfig,
    cancel: &CancelToken,
) -> Result<ScanReport, ScanError> {
    tracing::info!(
        symbols = symbols.len(),
        timeframe = %config.timeframe,
        "starting scan"
    );

    let symbols: Vec<String> = symbols
        .iter()
        .map(|s| normalize_symbol(s, config.is_crypto))
        .collect();

    let outcomes = map_symbols(&symbols, config.parallel, |symbol| {
        cancel.check()?;
        Ok(scan_symbol(data_port, symbol, config))
    })?;

    let mut report = ScanReport::default();
    for (symbol, outcome) in symbols.iter().zip(outcomes) {
        match outcome {
            Ok(row) => report.rows.push(row),
            Err(error) => {
                tracing::warn!(symbol = %symbol, kind = error.kind(), "skipping symbol: {error}");
                report.errors.push(SymbolError::new(symbol.as_str(), error));
            }
        }
    }
    report.rows.sort_by(|a, b| b.score.total_cmp(&a.score));

    tracing::info!(
        scanned = report.rows.len(),
        failed = report.errors.len(),
        "scan complete"
    );
    Ok(report)
}

/// Scans one symbol. Every failure is per-symbol.
pub fn scan_symbol(
    data_port: &dyn DataPort,
    symbol: &str,
    config: &ScanConfig,
) -> Result<ScanRow, ScanError> {
    let symbol = normalize_symbol(symbol, config.is_crypto);
    let symbol = symbol.as_str();
    let timeframe = config.timeframe;
    let raw = data_port.fetch_bars(
        symbol,
        timeframe,
        FetchRange::Lookback(timeframe.default_lookback()),
    )?;
    let series = BarSeries::normalize(symbol, timeframe, raw);
    if series.is_empty() {
        return Err(ScanError::DataUnavailable {
            symbol: symbol.to_string(),
            reason: "no usable bars".to_string(),
        });
    }

    let minimum = timeframe.min_bars_required();
    if series.len() < minimum {
        return Err(ScanError::DataInsufficient {
            symbol: symbol.to_string(),
            bars: series.len(),
            minimum,
        });
    }

    let asset_class = AssetClass::classify(symbol);
    if !asset_class.skips_liquidity_filter() {
        let dollar_volume = series
            .trailing_dollar_volume(LIQUIDITY_WINDOW)
            .unwrap_or(0.0);
        if !(dollar_volume >= config.min_dollar_volume) {
            return Err(ScanError::LiquidityFiltered {
                symbol: symbol.to_string(),
                dollar_volume,
                minimum: config.min_dollar_volume,
            });
        }
    }

    let rows = compile_features(&series, &config.features);
    let latest = rows.last().ok_or_else(|| ScanError::ComputationUndefined {
        symbol: symbol.to_string(),
        reason: "every row lacks a defined indicator".to_string(),
    })?;

    let score = score_row(latest, &config.scoring);
    let sizing = size_position(latest, score.direction, &config.sizing);

    let bars = series.bars();
    let prev_close = bars
        .len()
        .checked_sub(2)
        .map(|i| bars[i].close)
        .unwrap_or(latest.bar.close);
    let change = latest.bar.close - prev_close;
    let change_pct = if prev_close != 0.0 {
        change / prev_close * 100.0
    } else {
        0.0
    };

    tracing::debug!(symbol = %symbol, score = score.score, direction = %score.direction, "scored");

    Ok(ScanRow {
        symbol: symbol.to_string(),
        timeframe,
        asset_class,
        timestamp: latest.bar.timestamp,
        close: latest.bar.close,
        change,
        change_pct,
        volume: latest.bar.volume,
        score: score.score,
        direction: score.direction,
        rsi: latest.rsi,
        ema_long: latest.ema_long,
        macd_hist: latest.macd_hist,
        atr: latest.atr,
        atr_pct: latest.atr_pct(),
        bb_width: latest.bb_width,
        vol_z: latest.vol_z,
        rolling_max: latest.rolling_max,
        rolling_min: latest.rolling_min,
        stop_price: sizing.stop_price,
        per_unit_risk: sizing.per_unit_risk,
        risk_dollars: sizing.risk_dollars,
        size_units: sizing.size_units,
        notional_dollars: sizing.notional_dollars,
    })
}

/// Runs `f` for every symbol, on the rayon pool when `parallel`. Results come
/// back in input order; the first batch-level error (cancellation) wins.
pub(crate) fn map_symbols<T, F>(
    symbols: &[String],
    parallel: bool,
    f: F,
) -> Result<Vec<T>, ScanError>
where
    T: Send,
    F: Fn(&str) -> Result<T, ScanError> + Send + Sync,
{
    if parallel {
        symbols
            .par_iter()
            .map(|symbol| f(symbol.as_str()))
            .collect::<Result<Vec<_>, _>>()
    } else {
        symbols
            .iter()
            .map(|symbol| f(symbol.as_str()))
            .collect::<Result<Vec<_>, _>>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::Bar;
    use chrono::{Duration, TimeZone};
    use std::collections::HashMap;

    struct StubData {
        bars: HashMap<String, Vec<Bar>>,
    }

    impl DataPort for StubData {
        fn fetch_bars(
            &self,
            symbol: &str,
            _timeframe: Timeframe,
            _range: FetchRange,
        ) -> Result<Vec<Bar>, ScanError> {
            self.bars
                .get(symbol)
                .cloned()
                .ok_or_else(|| ScanError::DataUnavailable {
                    symbol: symbol.to_string(),
                    reason: "unknown symbol".to_string(),
                })
        }

        fn list_symbols(&self, _timeframe: Timeframe) -> Result<Vec<String>, ScanError> {
            Ok(self.bars.keys().cloned().collect())
        }
    }

    fn trending(n: usize, start: f64, step: f64, volume: f64) -> Vec<Bar> {
        let t0 = Utc.with_ymd_and_hms(2022, 1, 3, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                let close = start + step * i as f64;
                Bar {
                    timestamp: t0 + Duration::days(i as i64),
                    open: close - step / 2.0,
                    high: close.max(close - step) + 0.5,
                    low: close.min(close - step) - 0.5,
                    close,
                    volume,
                }
            })
            .collect()
    }

    fn stub(entries: Vec<(&str, Vec<Bar>)>) -> StubData {
        StubData {
            bars: entries
                .into_iter()
                .map(|(s, b)| (s.to_string(), b))
                .collect(),
        }
    }

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn ranks_by_score_and_isolates_failures() {
        let data = stub(vec![
            ("UP", trending(300, 100.0, 1.0, 1_000_000.0)),
            ("DOWN", trending(300, 400.0, -1.0, 1_000_000.0)),
            ("SHORT", trending(50, 100.0, 1.0, 1_000_000.0)),
        ]);
        let config = ScanConfig {
            parallel: false,
            ..ScanConfig::default()
        };
        let report = scan(
            &data,
            &symbols(&["DOWN", "MISSING", "UP", "SHORT"]),
            &config,
            &CancelToken::new(),
        )
        .unwrap();

        let ranked: Vec<&str> = report.rows.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(ranked, vec!["UP", "DOWN"]);
        assert_eq!(report.rows[0].direction, Direction::Bullish);
        assert_eq!(report.rows[1].direction, Direction::Bearish);

        let failed: Vec<(&str, &str)> = report
            .errors
            .iter()
            .map(|e| (e.symbol.as_str(), e.error.kind()))
            .collect();
        assert_eq!(
            failed,
            vec![("MISSING", "data_unavailable"), ("SHORT", "data_insufficient")]
        );
    }

    #[test]
    fn liquidity_filter_skips_futures_and_forex() {
        let thin = trending(300, 100.0, 0.5, 10.0);
        let data = stub(vec![
            ("THIN", thin.clone()),
            ("GC=F", thin.clone()),
            ("EURUSD=X", thin),
        ]);
        let report = scan(
            &data,
            &symbols(&["THIN", "GC=F", "EURUSD=X"]),
            &ScanConfig::default(),
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].symbol, "THIN");
        assert_eq!(report.errors[0].error.kind(), "liquidity_filtered");
    }

    #[test]
    fn row_carries_change_and_sizing() {
        let data = stub(vec![("UP", trending(300, 100.0, 1.0, 1_000_000.0))]);
        let config = ScanConfig::default();
        let row = scan_symbol(&data, "UP", &config).unwrap();

        assert_eq!(row.close, 399.0);
        assert_eq!(row.change, 1.0);
        assert!((row.change_pct - 100.0 / 398.0).abs() < 1e-12);
        assert_eq!(row.asset_class, AssetClass::Equity);
        assert!(row.stop_price < row.close);
        let expected_units = (config.sizing.account_equity * config.sizing.risk_pct
            / row.per_unit_risk)
            .floor() as u64;
        assert_eq!(row.size_units, expected_units);
    }

    #[test]
    fn crypto_flag_normalizes_bare_tickers() {
        let data = stub(vec![("BTC-USD", trending(300, 100.0, 1.0, 1_000_000.0))]);
        let config = ScanConfig {
            is_crypto: true,
            parallel: false,
            ..ScanConfig::default()
        };
        let report = scan(&data, &symbols(&["btc", "ETH"]), &config, &CancelToken::new()).unwrap();

        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].symbol, "BTC-USD");
        assert_eq!(report.rows[0].asset_class, AssetClass::Crypto);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].symbol, "ETH-USD");

        let row = scan_symbol(&data, "BTC", &config).unwrap();
        assert_eq!(row.symbol, "BTC-USD");
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let data = stub(vec![
            ("A", trending(300, 100.0, 1.0, 1_000_000.0)),
            ("B", trending(300, 300.0, -0.5, 1_000_000.0)),
            ("C", trending(300, 50.0, 0.2, 1_000_000.0)),
        ]);
        let list = symbols(&["A", "B", "C"]);
        let seq = ScanConfig {
            parallel: false,
            ..ScanConfig::default()
        };
        let par = ScanConfig {
            parallel: true,
            ..ScanConfig::default()
        };
        let a = scan(&data, &list, &seq, &CancelToken::new()).unwrap();
        let b = scan(&data, &list, &par, &CancelToken::new()).unwrap();
        assert_eq!(a.rows, b.rows);
    }

    #[test]
    fn cancelled_scan_returns_error() {
        let data = stub(vec![("UP", trending(300, 100.0, 1.0, 1_000_000.0))]);
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = scan(&data, &symbols(&["UP"]), &ScanConfig::default(), &cancel);
        assert!(matches!(result, Err(ScanError::Cancelled)));
    }
}
