//! Trailing-window helpers: mean, sample standard deviation, extrema.
//!
//! Windows include the current element. Warmup: first (n-1) values are
//! undefined.

use super::Series;

pub fn rolling_mean(values: &[f64], period: usize) -> Series {
    rolling(values, period, |w| w.iter().sum::<f64>() / w.len() as f64)
}

/// Sample standard deviation (divides by n-1); undefined for n < 2.
pub fn rolling_std(values: &[f64], period: usize) -> Series {
    if period < 2 {
        return vec![None; values.len()];
    }
    rolling(values, period, |w| {
        let n = w.len() as f64;
        let mean = w.iter().sum::<f64>() / n;
        let ss: f64 = w.iter().map(|x| (x - mean).powi(2)).sum();
        (ss / (n - 1.0)).sqrt()
    })
}

/// Trailing (max, min) over `period` elements, current element included.
/// The feature compiler shifts both one bar so breakouts compare against
/// prior bars only; keep that shift when touching either side.
pub fn rolling_extrema(values: &[f64], period: usize) -> (Series, Series) {
    let max = rolling(values, period, |w| {
        w.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    });
    let min = rolling(values, period, |w| w.iter().copied().fold(f64::INFINITY, f64::min));
    (max, min)
}

/// Rolling mean over an already partially defined series; a window with any
/// undefined member is undefined.
pub fn rolling_mean_defined(series: &[Option<f64>], period: usize) -> Series {
    if period == 0 {
        return vec![None; series.len()];
    }
    (0..series.len())
        .map(|i| {
            if i + 1 < period {
                return None;
            }
            let window = &series[i + 1 - period..=i];
            let sum = window.iter().copied().sum::<Option<f64>>()?;
            Some(sum / period as f64)
        })
        .collect()
}

fn rolling<F>(values: &[f64], period: usize, f: F) -> Series
where
    F: Fn(&[f64]) -> f64,
{
    if period == 0 {
        return vec![None; values.len()];
    }
    (0..values.len())
        .map(|i| {
            if i + 1 < period {
                return None;
            }
            let v = f(&values[i + 1 - period..=i]);
            v.is_finite().then_some(v)
        })
        .collect()
}
