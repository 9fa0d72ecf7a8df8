//! ATR-based position sizing.

use crate::domain::config::SizingConfig;
use crate::domain::features::FeatureRow;
use crate::domain::scoring::Direction;
use serde::Serialize;

/// Fraction of close used as the stop basis when ATR is unusable.
pub const ATR_FALLBACK_PCT: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SizingResult {
    pub stop_price: f64,
    pub per_unit_risk: f64,
    pub risk_dollars: f64,
    pub size_units: u64,
    pub notional_dollars: f64,
}

pub fn size_position(row: &FeatureRow, direction: Direction, config: &SizingConfig) -> SizingResult {
    size_from_price(row.bar.close, row.atr, direction, config)
}

/// Sizing from a raw entry price and ATR. `size_units` is the whole number
/// of units whose stop-out loss stays within `risk_dollars`.
pub fn size_from_price(
    close: f64,
    atr: f64,
    direction: Direction,
    config: &SizingConfig,
) -> SizingResult {
    let atr_value = if atr.is_finite() && atr > 0.0 {
        atr
    } else {
        close * ATR_FALLBACK_PCT
    };
    let offset = config.stop_atr_mult * atr_value;
    let stop_price = match direction {
        Direction::Bullish => close - offset,
        Direction::Bearish => close + offset,
    };
    let per_unit_risk = (close - stop_price).abs();
    let risk_dollars = config.account_equity * config.risk_pct;

    let size_units = if per_unit_risk > 0.0 && risk_dollars > 0.0 {
        let units = (risk_dollars / per_unit_risk).floor();
        // float-to-int casts saturate, NaN maps to zero
        units as u64
    } else {
        0
    };

    SizingResult {
        stop_price,
        per_unit_risk,
        risk_dollars,
        size_units,
        notional_dollars: size_units as f64 * close,
    }
}
