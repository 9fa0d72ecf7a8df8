//! Feature compiler: applies the indicator library to a bar series once and
//! keeps only the rows where every derived column is defined.

use crate::domain::config::FeatureConfig;
use crate::domain::indicator::{
    atr, bollinger_width, ema, macd_histogram, rolling_extrema, rolling_mean,
    rolling_mean_defined, rsi, volume::volume_zscore_from_mean, Series,
};
use crate::domain::ohlcv::{Bar, BarSeries};
use serde::Serialize;

pub const ATR_PERIOD: usize = 14;
pub const VOLUME_PERIOD: usize = 20;
pub const BOLLINGER_K: f64 = 2.0;

/// A bar plus every derived indicator column.
///
/// `rolling_max` / `rolling_min` are the closing extremes of the
/// `breakout_period` bars before this one, so a close above `rolling_max`
/// is a fresh breakout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    #[serde(flatten)]
    pub bar: Bar,
    pub ema8: f64,
    pub ema21: f64,
    pub ema50: f64,
    pub ema_long: f64,
    pub rsi: f64,
    pub macd_hist: f64,
    pub atr: f64,
    pub bb_width: f64,
    pub bb_width_ma: f64,
    pub vol_ma: f64,
    pub vol_z: f64,
    pub rolling_max: f64,
    pub rolling_min: f64,
}

impl FeatureRow {
    /// ATR as a fraction of close; `None` when close is zero.
    pub fn atr_pct(&self) -> Option<f64> {
        if self.bar.close == 0.0 {
            return None;
        }
        let pct = self.atr / self.bar.close;
        pct.is_finite().then_some(pct)
    }
}

/// Compiles every feature column for `series`. Rows lacking full lookback
/// are dropped, so the result is a suffix of the input bars.
pub fn compile_features(series: &BarSeries, config: &FeatureConfig) -> Vec<FeatureRow> {
    let bars = series.bars();
    let closes = series.closes();
    let volumes = series.volumes();

    let ema8 = ema(&closes, 8);
    let ema21 = ema(&closes, 21);
    let ema50 = ema(&closes, 50);
    let ema_long = ema(&closes, config.ema_long_span);
    let rsi = rsi(&closes, config.rsi_period);
    let macd_hist = macd_histogram(&closes);
    let atr = atr(bars, ATR_PERIOD);
    let bb_width = bollinger_width(&closes, config.bb_period, BOLLINGER_K);
    let bb_width_ma = rolling_mean_defined(&bb_width, config.bb_period);
    let vol_ma = rolling_mean(&volumes, VOLUME_PERIOD);
    let vol_z = volume_zscore_from_mean(&volumes, &vol_ma);
    // shifted: a bar never counts toward its own breakout level
    let (rolling_max, rolling_min) = rolling_extrema(&closes, config.breakout_period);
    let rolling_max = shift_forward(rolling_max);
    let rolling_min = shift_forward(rolling_min);

    let rows: Vec<FeatureRow> = bars
        .iter()
        .enumerate()
        .filter_map(|(i, bar)| {
            Some(FeatureRow {
                bar: bar.clone(),
                ema8: ema8[i]?,
                ema21: ema21[i]?,
                ema50: ema50[i]?,
                ema_long: ema_long[i]?,
                rsi: rsi[i]?,
                macd_hist: macd_hist[i]?,
                atr: atr[i]?,
                bb_width: bb_width[i]?,
                bb_width_ma: bb_width_ma[i]?,
                vol_ma: vol_ma[i]?,
                vol_z: vol_z[i]?,
                rolling_max: rolling_max[i]?,
                rolling_min: rolling_min[i]?,
            })
        })
        .collect();

    tracing::debug!(
        symbol = %series.symbol,
        bars = bars.len(),
        rows = rows.len(),
        "compiled features"
    );
    rows
}

/// Moves every value one position later; the first slot becomes undefined.
fn shift_forward(series: Series) -> Series {
    let len = series.len();
    std::iter::once(None).chain(series).take(len).collect()
}
