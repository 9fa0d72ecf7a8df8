//! Bollinger band width.
//!
//! Middle: SMA over n periods; upper/lower: middle ± k × sample StdDev.
//! Width = (upper - lower) / close, undefined when close is zero.
//!
//! Default parameters: period=20, k=2.0
//! Warmup: first (period-1) values are undefined.

use super::rolling::{rolling_mean, rolling_std};
use super::Series;

pub fn bollinger_width(values: &[f64], period: usize, k: f64) -> Series {
    let middle = rolling_mean(values, period);
    let stddev = rolling_std(values, period);

    values
        .iter()
        .zip(middle.iter().zip(stddev.iter()))
        .map(|(&close, (mid, sd))| {
            let (mid, sd) = ((*mid)?, (*sd)?);
            if close == 0.0 {
                return None;
            }
            let upper = mid + k * sd;
            let lower = mid - k * sd;
            Some((upper - lower) / close)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_warmup() {
        let out = bollinger_width(&[10.0, 20.0, 30.0, 40.0], 3, 2.0);
        assert!(out[0].is_none());
        assert!(out[1].is_none());
        assert!(out[2].is_some());
    }

    #[test]
    fn width_constant_is_zero() {
        let out = bollinger_width(&[100.0; 5], 3, 2.0);
        assert_eq!(out[4], Some(0.0));
    }

    #[test]
    fn width_basic() {
        let out = bollinger_width(&[10.0, 20.0, 30.0], 3, 2.0);
        // sample sd = 10 → (4 * 10) / 30
        assert!((out[2].unwrap() - 40.0 / 30.0).abs() < 1e-12);
    }

    #[test]
    fn width_zero_close_undefined() {
        let out = bollinger_width(&[1.0, 2.0, 0.0], 3, 2.0);
        assert!(out[2].is_none());
    }
}
