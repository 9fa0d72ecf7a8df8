//! Bar timeframes and their per-timeframe limits.

use chrono::Duration;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Timeframe {
    #[serde(rename = "1D")]
    Daily,
    #[serde(rename = "1h")]
    Hourly,
    #[serde(rename = "30m")]
    Min30,
    #[serde(rename = "15m")]
    Min15,
    #[serde(rename = "5m")]
    Min5,
    #[serde(rename = "1m")]
    Min1,
}

const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const TRADING_HOURS_PER_DAY: f64 = 6.5;

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Daily => "1D",
            Timeframe::Hourly => "1h",
            Timeframe::Min30 => "30m",
            Timeframe::Min15 => "15m",
            Timeframe::Min5 => "5m",
            Timeframe::Min1 => "1m",
        }
    }

    pub fn is_intraday(&self) -> bool {
        !matches!(self, Timeframe::Daily)
    }

    /// Bars a scan needs before indicators are warm, plus margin.
    pub fn min_bars_required(&self) -> usize {
        match self {
            Timeframe::Daily => 210,
            Timeframe::Hourly => 350,
            Timeframe::Min30 | Timeframe::Min15 => 500,
            Timeframe::Min5 | Timeframe::Min1 => 700,
        }
    }

    /// How far back a scan fetch reaches.
    pub fn default_lookback(&self) -> Duration {
        match self {
            Timeframe::Daily | Timeframe::Hourly => Duration::days(730),
            _ => Duration::days(60),
        }
    }

    /// Longest date range the data provider serves for this timeframe.
    pub fn max_range(&self) -> Option<Duration> {
        match self {
            Timeframe::Daily => None,
            Timeframe::Hourly => Some(Duration::days(730)),
            _ => Some(Duration::days(60)),
        }
    }

    pub fn annualization_factor(&self) -> f64 {
        match self {
            Timeframe::Hourly => TRADING_DAYS_PER_YEAR * TRADING_HOURS_PER_DAY,
            _ => TRADING_DAYS_PER_YEAR,
        }
    }

    /// Extra calendar time fetched ahead of a backtest start so that a
    /// `warmup_bars`-long indicator is defined on the first simulated bar.
    /// Intraday providers cap history, so those timeframes get none. `None`
    /// when the padding is not representable.
    pub fn warmup_padding(&self, warmup_bars: usize) -> Option<Duration> {
        let days = match self {
            // 5 sessions per 7 calendar days, plus a fortnight for holidays
            Timeframe::Daily => warmup_bars.checked_mul(7)?.div_ceil(5).checked_add(14)?,
            Timeframe::Hourly => {
                let sessions = (warmup_bars as f64 / TRADING_HOURS_PER_DAY).ceil() as usize;
                sessions.checked_mul(7)?.div_ceil(5).checked_add(7)?
            }
            _ => 0,
        };
        Duration::try_days(i64::try_from(days).ok()?)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unknown timeframe '{0}' (expected 1D, 1h, 30m, 15m, 5m or 1m)")]
pub struct UnknownTimeframe(pub String);

impl FromStr for Timeframe {
    type Err = UnknownTimeframe;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1D" | "1d" => Ok(Timeframe::Daily),
            "1h" | "1H" => Ok(Timeframe::Hourly),
            "30m" => Ok(Timeframe::Min30),
            "15m" => Ok(Timeframe::Min15),
            "5m" => Ok(Timeframe::Min5),
            "1m" => Ok(Timeframe::Min1),
            other => Err(UnknownTimeframe(other.to_string())),
        }
    }
}
