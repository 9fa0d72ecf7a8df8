//! CSV file data adapter.
//!
//! One file per symbol and timeframe, `{SYMBOL}_{TIMEFRAME}.csv` (for
//! example `AAPL_1D.csv`, `BTC-USD_1h.csv`), with a header row and columns
//! `timestamp,open,high,low,close,volume`. Timestamps may be RFC 3339,
//! `YYYY-MM-DD HH:MM:SS` (UTC) or a bare `YYYY-MM-DD` date.

use crate::domain::error::ScanError;
use crate::domain::ohlcv::Bar;
use crate::domain::timeframe::Timeframe;
use crate::ports::data_port::{DataPort, FetchRange};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str, timeframe: Timeframe) -> PathBuf {
        self.base_path.join(format!("{symbol}_{timeframe}.csv"))
    }

    fn read_bars(&self, symbol: &str, timeframe: Timeframe) -> Result<Vec<Bar>, ScanError> {
        let unavailable = |reason: String| ScanError::DataUnavailable {
            symbol: symbol.to_string(),
            reason,
        };

        let path = self.csv_path(symbol, timeframe);
        let content = fs::read_to_string(&path)
            .map_err(|e| unavailable(format!("failed to read {}: {e}", path.display())))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| unavailable(format!("CSV parse error: {e}")))?;
            // header is line 1
            let bar = parse_record(&record, line + 2).map_err(unavailable)?;
            bars.push(bar);
        }

        Ok(bars)
    }
}

fn parse_record(record: &csv::StringRecord, line: usize) -> Result<Bar, String> {
    let field = |idx: usize, name: &str| -> Result<String, String> {
        record
            .get(idx)
            .map(|v| v.trim().to_string())
            .ok_or_else(|| format!("line {line}: missing {name} column"))
    };
    let number = |idx: usize, name: &str| -> Result<f64, String> {
        field(idx, name)?
            .parse()
            .map_err(|e| format!("line {line}: invalid {name} value: {e}"))
    };

    let raw_ts = field(0, "timestamp")?;
    let timestamp = parse_timestamp(&raw_ts)
        .ok_or_else(|| format!("line {line}: invalid timestamp '{raw_ts}'"))?;

    Ok(Bar {
        timestamp,
        open: number(1, "open")?,
        high: number(2, "high")?,
        low: number(3, "low")?,
        close: number(4, "close")?,
        volume: number(5, "volume")?,
    })
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        range: FetchRange,
    ) -> Result<Vec<Bar>, ScanError> {
        let mut bars = self.read_bars(symbol, timeframe)?;
        bars.sort_by_key(|b| b.timestamp);

        match range {
            FetchRange::Lookback(lookback) => {
                if let Some(latest) = bars.last().map(|b| b.timestamp) {
                    let cutoff = latest - lookback;
                    bars.retain(|b| b.timestamp >= cutoff);
                }
            }
            FetchRange::Between { start, end } => {
                bars.retain(|b| b.timestamp >= start && b.timestamp <= end);
            }
        }

        if bars.is_empty() {
            return Err(ScanError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: "no bars in requested range".to_string(),
            });
        }
        tracing::debug!(symbol = %symbol, timeframe = %timeframe, bars = bars.len(), "loaded CSV bars");
        Ok(bars)
    }

    fn list_symbols(&self, timeframe: Timeframe) -> Result<Vec<String>, ScanError> {
        let entries = fs::read_dir(&self.base_path)?;
        let suffix = format!("_{timeframe}.csv");
        let mut symbols = Vec::new();

        for entry in entries {
            let name = entry?.file_name();
            let name = name.to_string_lossy();
            if let Some(symbol) = name.strip_suffix(&suffix) {
                if !symbol.is_empty() {
                    symbols.push(symbol.to_string());
                }
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
