//! Exponential Moving Average.
//!
//! alpha = 2/(span+1), seeded with the first value and no bias correction:
//! EMA[t] = alpha*x[t] + (1-alpha)*EMA[t-1].
//! Warmup: first (span-1) values are undefined.

use super::{ewm, mask_warmup, Series};

pub fn ema(values: &[f64], span: usize) -> Series {
    if span == 0 {
        return vec![None; values.len()];
    }
    let alpha = 2.0 / (span as f64 + 1.0);
    mask_warmup(ewm(values, alpha), span - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_warmup() {
        let series = ema(&[10.0, 20.0, 30.0, 40.0, 50.0], 3);

        assert!(series[0].is_none());
        assert!(series[1].is_none());
        assert!(series[2].is_some());
        assert!(series[4].is_some());
    }

    #[test]
    fn ema_period_1_is_identity() {
        let series = ema(&[10.0, 20.0, 30.0], 1);
        assert_eq!(series, vec![Some(10.0), Some(20.0), Some(30.0)]);
    }

    #[test]
    fn ema_seeded_by_first_value() {
        let series = ema(&[10.0, 20.0, 30.0], 3);
        let k = 0.5;
        let e1 = 20.0 * k + 10.0 * (1.0 - k);
        let e2 = 30.0 * k + e1 * (1.0 - k);
        assert!((series[2].unwrap() - e2).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_equal_prices() {
        let series = ema(&[100.0; 10], 4);
        for v in series.iter().skip(3) {
            assert!((v.unwrap() - 100.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn ema_empty_and_zero_span() {
        assert!(ema(&[], 3).is_empty());
        assert_eq!(ema(&[1.0, 2.0], 0), vec![None, None]);
    }

    #[test]
    fn ema_shorter_than_span_is_all_undefined() {
        assert!(ema(&[1.0, 2.0], 5).iter().all(Option::is_none));
    }
}
