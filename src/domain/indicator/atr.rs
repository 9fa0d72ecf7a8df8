//! Average True Range.
//!
//! TR[0] = high - low, TR[i] = max(high-low, |high-prev_close|, |low-prev_close|),
//! smoothed with Wilder's weighting (alpha = 1/n, seeded by TR[0]).
//! Warmup: first (n-1) values are undefined.

use super::{ewm, mask_warmup, Series};
use crate::domain::ohlcv::Bar;

pub fn atr(bars: &[Bar], period: usize) -> Series {
    if period == 0 {
        return vec![None; bars.len()];
    }

    let tr: Vec<f64> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| match i {
            0 => bar.high - bar.low,
            _ => bar.true_range(bars[i - 1].close),
        })
        .collect();

    mask_warmup(ewm(&tr, 1.0 / period as f64), period - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn make_bar(day: u32, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            open: close,
            high,
            low,
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn atr_warmup() {
        let bars: Vec<Bar> = (1..=5).map(|d| make_bar(d, 110.0, 90.0, 100.0)).collect();
        let series = atr(&bars, 3);
        assert_eq!(series.len(), 5);
        assert!(series[0].is_none());
        assert!(series[1].is_none());
        assert!(series[2].is_some());
    }

    #[test]
    fn atr_constant_range() {
        let bars: Vec<Bar> = (1..=5).map(|d| make_bar(d, 110.0, 90.0, 100.0)).collect();
        let series = atr(&bars, 3);
        assert!((series[4].unwrap() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn atr_wilder_smoothing() {
        let bars = vec![
            make_bar(1, 110.0, 100.0, 105.0),
            make_bar(2, 130.0, 120.0, 125.0),
        ];
        let series = atr(&bars, 2);
        // TR0 = 10, TR1 = max(10, 25, 15) = 25 → 0.5*25 + 0.5*10
        assert!((series[1].unwrap() - 17.5).abs() < 1e-9);
    }

    #[test]
    fn atr_flat_is_zero() {
        let bars: Vec<Bar> = (1..=20).map(|d| make_bar(d, 100.0, 100.0, 100.0)).collect();
        let series = atr(&bars, 14);
        assert_eq!(series[19], Some(0.0));
    }

    #[test]
    fn atr_empty() {
        assert!(atr(&[], 14).is_empty());
    }
}
