//! Mutable state of one backtest run: equity, drawdown, open positions,
//! equity curve and trade log.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use super::position::{BacktestPosition, BacktestTrade};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
    /// Equity change since the previous point (or since the start).
    pub daily_pnl: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestState {
    pub initial_equity: f64,
    pub current_equity: f64,
    pub max_equity: f64,
    pub max_drawdown: f64,
    pub positions: HashMap<String, BacktestPosition>,
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<BacktestTrade>,
    last_recorded_equity: f64,
}

impl BacktestState {
    pub fn new(initial_equity: f64) -> Self {
        BacktestState {
            initial_equity,
            current_equity: initial_equity,
            max_equity: initial_equity,
            max_drawdown: 0.0,
            positions: HashMap::new(),
            equity_curve: Vec::new(),
            trades: Vec::new(),
            last_recorded_equity: initial_equity,
        }
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn open(&mut self, position: BacktestPosition) {
        self.positions.insert(position.symbol.clone(), position);
    }

    /// Removes the position, realizes its PnL into equity and logs the trade.
    pub fn close(&mut self, trade: BacktestTrade) {
        self.positions.remove(&trade.symbol);
        self.current_equity += trade.trade_pnl;
        self.trades.push(trade);
    }

    /// Appends a curve point if equity moved since the last one, updating
    /// the running peak and maximum drawdown.
    pub fn mark(&mut self, timestamp: DateTime<Utc>) {
        if self.current_equity == self.last_recorded_equity {
            return;
        }
        let daily_pnl = self.current_equity - self.last_recorded_equity;
        self.last_recorded_equity = self.current_equity;
        self.equity_curve.push(EquityPoint {
            timestamp,
            equity: self.current_equity,
            daily_pnl,
        });

        if self.current_equity > self.max_equity {
            self.max_equity = self.current_equity;
        }
        if self.max_equity > 0.0 {
            let drawdown = (self.max_equity - self.current_equity) / self.max_equity;
            if drawdown > self.max_drawdown {
                self.max_drawdown = drawdown;
            }
        }
    }
}
