//! Technical indicator library.
//!
//! Every indicator is a pure function over a time-ordered float slice and
//! returns one `Option<f64>` per input element, aligned by index. `None`
//! marks a value that is undefined, either because the warm-up window has
//! not filled yet or because the arithmetic has no answer (e.g. a zero
//! divisor).

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rolling;
pub mod rsi;
pub mod volume;

pub use atr::atr;
pub use bollinger::bollinger_width;
pub use ema::ema;
pub use macd::macd_histogram;
pub use rolling::{rolling_extrema, rolling_mean, rolling_mean_defined};
pub use rsi::rsi;
pub use volume::volume_zscore;

/// Indicator output: one optional value per input bar.
pub type Series = Vec<Option<f64>>;

/// Exponentially weighted mean without bias correction, seeded by the
/// first element: `y[0] = x[0]`, `y[t] = alpha*x[t] + (1-alpha)*y[t-1]`.
pub(crate) fn ewm(values: &[f64], alpha: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for &x in values {
        let y = match prev {
            None => x,
            Some(p) => alpha * x + (1.0 - alpha) * p,
        };
        out.push(y);
        prev = Some(y);
    }
    out
}

/// Marks the first `warmup` elements, and any non-finite value, undefined.
pub(crate) fn mask_warmup(raw: Vec<f64>, warmup: usize) -> Series {
    raw.into_iter()
        .enumerate()
        .map(|(i, v)| (i >= warmup && v.is_finite()).then_some(v))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ewm_seeds_with_first_value() {
        let out = ewm(&[10.0, 20.0], 0.5);
        assert!((out[0] - 10.0).abs() < f64::EPSILON);
        assert!((out[1] - 15.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ewm_empty() {
        assert!(ewm(&[], 0.5).is_empty());
    }

    #[test]
    fn mask_warmup_hides_prefix_and_nan() {
        let out = mask_warmup(vec![1.0, 2.0, f64::NAN, 4.0], 1);
        assert_eq!(out, vec![None, Some(2.0), None, Some(4.0)]);
    }
}
