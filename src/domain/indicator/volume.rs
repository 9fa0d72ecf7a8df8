//! Volume expansion: (volume - rolling mean) / rolling mean.
//!
//! A zero mean leaves the value undefined. Warmup: first (period-1).

use super::rolling::rolling_mean;
use super::Series;

pub fn volume_zscore(volume: &[f64], period: usize) -> Series {
    volume_zscore_from_mean(volume, &rolling_mean(volume, period))
}

/// Same as [`volume_zscore`] when the caller already holds the mean.
pub fn volume_zscore_from_mean(volume: &[f64], mean: &[Option<f64>]) -> Series {
    volume
        .iter()
        .zip(mean.iter())
        .map(|(&v, &m)| match m {
            Some(m) if m != 0.0 => Some((v - m) / m),
            _ => None,
        })
        .collect()
}
