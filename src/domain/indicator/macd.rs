//! MACD histogram.
//!
//! line = EMA(fast) - EMA(slow), signal = EMA(signal) of line,
//! histogram = line - signal. The EWMs run unmasked from the first bar;
//! warmup: first (slow - 1) + (signal - 1) values are undefined.

use super::{ewm, mask_warmup, Series};

pub const FAST: usize = 12;
pub const SLOW: usize = 26;
pub const SIGNAL: usize = 9;

pub fn macd_histogram(values: &[f64]) -> Series {
    macd_histogram_with(values, FAST, SLOW, SIGNAL)
}

pub fn macd_histogram_with(values: &[f64], fast: usize, slow: usize, signal: usize) -> Series {
    if fast == 0 || slow == 0 || signal == 0 {
        return vec![None; values.len()];
    }
    let alpha = |span: usize| 2.0 / (span as f64 + 1.0);

    let fast_ema = ewm(values, alpha(fast));
    let slow_ema = ewm(values, alpha(slow));
    let line: Vec<f64> = fast_ema
        .iter()
        .zip(slow_ema.iter())
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ewm(&line, alpha(signal));

    let hist: Vec<f64> = line
        .iter()
        .zip(signal_line.iter())
        .map(|(l, s)| l - s)
        .collect();

    let warmup = fast.max(slow) - 1 + signal - 1;
    mask_warmup(hist, warmup)
}
