//! OHLCV bar representation and the bar series normalizer.

use crate::domain::timeframe::Timeframe;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    pub fn dollar_volume(&self) -> f64 {
        self.close * self.volume
    }

    fn is_complete(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite()
    }
}

/// Bars for one symbol at one timeframe, ascending and unique by timestamp.
#[derive(Debug, Clone)]
pub struct BarSeries {
    pub symbol: String,
    pub timeframe: Timeframe,
    bars: Vec<Bar>,
}

impl BarSeries {
    /// Shapes a raw price history into a canonical frame: rows with a
    /// non-finite required field are dropped, bars are sorted by time and
    /// duplicate timestamps keep the last occurrence. OHLC ordering
    /// violations are tolerated.
    pub fn normalize(symbol: &str, timeframe: Timeframe, raw: Vec<Bar>) -> Self {
        let mut bars: Vec<Bar> = raw.into_iter().filter(Bar::is_complete).collect();
        // stable sort keeps input order among equal timestamps
        bars.sort_by_key(|b| b.timestamp);

        let mut deduped: Vec<Bar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match deduped.last_mut() {
                Some(last) if last.timestamp == bar.timestamp => *last = bar,
                _ => deduped.push(bar),
            }
        }

        BarSeries {
            symbol: symbol.to_string(),
            timeframe,
            bars: deduped,
        }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    /// Mean of close * volume over the trailing `window` bars.
    pub fn trailing_dollar_volume(&self, window: usize) -> Option<f64> {
        if window == 0 || self.bars.is_empty() {
            return None;
        }
        let start = self.bars.len().saturating_sub(window);
        let tail = &self.bars[start..];
        Some(tail.iter().map(Bar::dollar_volume).sum::<f64>() / tail.len() as f64)
    }
}
