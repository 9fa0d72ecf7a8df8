//! Composite opportunity score.
//!
//! Eight additive rules turn one [`FeatureRow`] into a signed score. A
//! non-finite indicator value fails every comparison, so RSI and MACD take
//! their penalty branch while the bonus-only rules contribute nothing.

use crate::domain::config::ScoringConfig;
use crate::domain::features::FeatureRow;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    Bullish,
    Bearish,
}

impl Direction {
    /// Scanner rule: zero counts as bullish.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.0 {
            Direction::Bullish
        } else {
            Direction::Bearish
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Bullish => "Bullish",
            Direction::Bearish => "Bearish",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreResult {
    pub score: f64,
    pub direction: Direction,
}

pub fn score_row(row: &FeatureRow, config: &ScoringConfig) -> ScoreResult {
    let w = &config.weights;
    let t = &config.thresholds;
    let close = row.bar.close;
    let rsi_defined = row.rsi.is_finite();

    let mut score = 0.0;

    // regime
    score += if close > row.ema_long { w.regime } else { -w.regime };

    // structure
    if close > row.rolling_max {
        score += w.structure;
    } else if close < row.rolling_min {
        score -= w.structure;
    }

    score += if rsi_defined && row.rsi > t.rsi_bull {
        w.rsi
    } else {
        -w.rsi
    };

    score += if row.macd_hist.is_finite() && row.macd_hist > 0.0 {
        w.macd
    } else {
        -w.macd
    };

    if row.vol_z.is_finite() && row.vol_z > t.volume_z {
        score += w.volume;
    }

    if row.bb_width.is_finite() && row.bb_width > row.bb_width_ma {
        score += w.volatility;
    }

    if row.atr_pct().is_some_and(|pct| pct < t.atr_pct_max) {
        score += w.tradability;
    }

    // Overextension terms are independent; a config with oversold above
    // overbought applies both.
    if rsi_defined && row.rsi > t.rsi_overbought {
        score -= w.overextension_penalty;
    }
    if rsi_defined && row.rsi < t.rsi_oversold {
        score += w.overextension_penalty;
    }

    ScoreResult {
        score,
        direction: Direction::from_score(score),
    }
}
