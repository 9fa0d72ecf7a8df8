#![allow(dead_code)]

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use marketscan::domain::config::BacktestConfig;
use marketscan::domain::error::ScanError;
use marketscan::domain::features::FeatureRow;
pub use marketscan::domain::ohlcv::Bar;
use marketscan::domain::timeframe::Timeframe;
use marketscan::ports::data_port::{DataPort, FetchRange};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory data source. Counts fetches so tests can assert that a call
/// failed before touching data.
pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
    fetches: AtomicUsize,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        _timeframe: Timeframe,
        range: FetchRange,
    ) -> Result<Vec<Bar>, ScanError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self.errors.get(symbol) {
            return Err(ScanError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: reason.clone(),
            });
        }
        let bars = self.data.get(symbol).cloned().unwrap_or_default();
        let bars: Vec<Bar> = match range {
            FetchRange::Lookback(_) => bars,
            FetchRange::Between { start, end } => bars
                .into_iter()
                .filter(|b| b.timestamp >= start && b.timestamp <= end)
                .collect(),
        };
        if bars.is_empty() {
            return Err(ScanError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: "no bars".to_string(),
            });
        }
        Ok(bars)
    }

    fn list_symbols(&self, _timeframe: Timeframe) -> Result<Vec<String>, ScanError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

pub const VOLUME: f64 = 1_000_000.0;

/// One bar per calendar day from `start`, with closes from `close_at(i)` and
/// a one-unit band either side.
pub fn generate_bars(start: DateTime<Utc>, count: usize, close_at: impl Fn(usize) -> f64) -> Vec<Bar> {
    (0..count)
        .map(|i| {
            let close = close_at(i);
            Bar {
                timestamp: start + Duration::days(i as i64),
                open: close - 0.5,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: VOLUME,
            }
        })
        .collect()
}

pub fn flat_bars(start: DateTime<Utc>, count: usize, price: f64) -> Vec<Bar> {
    (0..count)
        .map(|i| Bar {
            timestamp: start + Duration::days(i as i64),
            open: price,
            high: price,
            low: price,
            close: price,
            volume: VOLUME,
        })
        .collect()
}

/// Straight line from `from` to `to` over `count` bars.
pub fn linear_bars(start: DateTime<Utc>, count: usize, from: f64, to: f64) -> Vec<Bar> {
    let step = (to - from) / (count.saturating_sub(1).max(1)) as f64;
    generate_bars(start, count, |i| from + step * i as f64)
}

/// Compounding growth of `rate` per bar, with a band of 1% either side.
pub fn growth_bars(start: DateTime<Utc>, count: usize, from: f64, rate: f64) -> Vec<Bar> {
    (0..count)
        .map(|i| {
            let close = from * (1.0 + rate).powi(i as i32);
            Bar {
                timestamp: start + Duration::days(i as i64),
                open: close * 0.995,
                high: close * 1.01,
                low: close * 0.99,
                close,
                volume: VOLUME,
            }
        })
        .collect()
}

/// A fully defined feature row for driving the simulator directly.
pub fn feature_row(timestamp: DateTime<Utc>, close: f64, low: f64, high: f64, atr: f64) -> FeatureRow {
    FeatureRow {
        bar: Bar {
            timestamp,
            open: close,
            high,
            low,
            close,
            volume: VOLUME,
        },
        ema8: close,
        ema21: close,
        ema50: close,
        ema_long: close,
        rsi: 50.0,
        macd_hist: 0.0,
        atr,
        bb_width: 0.05,
        bb_width_ma: 0.05,
        vol_ma: VOLUME,
        vol_z: 0.0,
        rolling_max: close,
        rolling_min: close,
    }
}

pub fn sample_config() -> BacktestConfig {
    let mut config = BacktestConfig::new(date(2022, 1, 1), date(2022, 6, 30));
    config.parallel = false;
    config
}
