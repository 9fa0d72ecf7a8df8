//! RSI (Relative Strength Index).
//!
//! Up and down moves of consecutive closes are smoothed with Wilder's
//! weighting (alpha = 1/n, seeded by the first move, no bias correction).
//!
//! Formula: RSI = 100 - (100 / (1 + avg_up / avg_down))
//! If avg_down == 0: RSI = 100, including the flat case where avg_up is 0 too.
//!
//! Warmup: first n values are undefined (n moves are needed).

use super::{ewm, Series};

pub fn rsi(values: &[f64], period: usize) -> Series {
    let n = values.len();
    if period == 0 || n < 2 {
        return vec![None; n];
    }

    let (ups, downs): (Vec<f64>, Vec<f64>) = values
        .windows(2)
        .map(|w| {
            let change = w[1] - w[0];
            (change.max(0.0), (-change).max(0.0))
        })
        .unzip();

    let alpha = 1.0 / period as f64;
    let avg_up = ewm(&ups, alpha);
    let avg_down = ewm(&downs, alpha);

    let mut out = Vec::with_capacity(n);
    out.push(None);
    for (j, (&up, &down)) in avg_up.iter().zip(avg_down.iter()).enumerate() {
        if j + 1 < period {
            out.push(None);
            continue;
        }
        let value = if down == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + up / down)
        };
        out.push(value.is_finite().then_some(value));
    }
    out
}
