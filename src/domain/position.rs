//! Open backtest positions and the trades they close into.

use crate::domain::ohlcv::Bar;
use crate::domain::scoring::Direction;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    ScoreExit,
    TimeExit,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::StopLoss => "stop_loss",
            ExitReason::ScoreExit => "score_exit",
            ExitReason::TimeExit => "time_exit",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestPosition {
    pub symbol: String,
    pub direction: Direction,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    pub stop_price: f64,
    /// Fractional units.
    pub position_size: f64,
    pub position_value: f64,
    /// Loss at the stop when the position was opened.
    pub risk_dollars: f64,
}

impl BacktestPosition {
    /// Intrabar stop check against the bar's extreme, not its close.
    pub fn stop_hit(&self, bar: &Bar) -> bool {
        match self.direction {
            Direction::Bullish => bar.low <= self.stop_price,
            Direction::Bearish => bar.high >= self.stop_price,
        }
    }

    pub fn return_at(&self, exit_price: f64) -> f64 {
        let raw = (exit_price - self.entry_price) / self.entry_price;
        match self.direction {
            Direction::Bullish => raw,
            Direction::Bearish => -raw,
        }
    }

    pub fn holding_days(&self, at: DateTime<Utc>) -> i64 {
        (at - self.entry_time).num_days()
    }

    pub fn close(
        self,
        exit_time: DateTime<Utc>,
        exit_price: f64,
        exit_reason: ExitReason,
    ) -> BacktestTrade {
        let trade_return = self.return_at(exit_price);
        let trade_pnl = trade_return * self.position_value;
        let r_multiple = if self.risk_dollars > 0.0 {
            trade_pnl / self.risk_dollars
        } else {
            0.0
        };
        BacktestTrade {
            holding_days: self.holding_days(exit_time),
            symbol: self.symbol,
            direction: self.direction,
            entry_time: self.entry_time,
            entry_price: self.entry_price,
            exit_time,
            exit_price,
            position_size: self.position_size,
            position_value: self.position_value,
            trade_return,
            trade_pnl,
            r_multiple,
            exit_reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestTrade {
    pub symbol: String,
    pub direction: Direction,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    pub exit_time: DateTime<Utc>,
    pub exit_price: f64,
    pub position_size: f64,
    pub position_value: f64,
    pub trade_return: f64,
    pub trade_pnl: f64,
    pub r_multiple: f64,
    pub exit_reason: ExitReason,
    pub holding_days: i64,
}

impl BacktestTrade {
    pub fn is_win(&self) -> bool {
        self.trade_pnl > 0.0
    }
}
