//! Portfolio- and symbol-level performance statistics of a backtest.

use super::portfolio::BacktestState;
use super::position::BacktestTrade;
use serde::Serialize;

/// Aggregate statistics. `profit_factor` is `f64::INFINITY` when there are
/// winning trades and no losing ones; JSON output renders it as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioMetrics {
    pub initial_equity: f64,
    pub final_equity: f64,
    pub total_return: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub profit_factor: f64,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub avg_holding_days: f64,
    pub avg_r_multiple: f64,
}

impl PortfolioMetrics {
    pub fn compute(state: &BacktestState, annualization_factor: f64) -> Self {
        let trades = &state.trades;
        let initial_equity = state.initial_equity;
        let final_equity = state.current_equity;

        let total_return = if initial_equity > 0.0 {
            (final_equity - initial_equity) / initial_equity
        } else {
            0.0
        };

        let mut winning_trades = 0usize;
        let mut losing_trades = 0usize;
        let mut gross_profit = 0.0_f64;
        let mut gross_loss = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut total_holding_days = 0i64;
        let mut total_r = 0.0_f64;

        for trade in trades {
            let pnl = trade.trade_pnl;
            if pnl > 0.0 {
                winning_trades += 1;
                gross_profit += pnl;
                largest_win = largest_win.max(pnl);
            } else if pnl < 0.0 {
                losing_trades += 1;
                gross_loss += pnl.abs();
                largest_loss = largest_loss.max(pnl.abs());
            }
            total_holding_days += trade.holding_days;
            total_r += trade.r_multiple;
        }

        let total_trades = trades.len();
        let per_trade = |total: f64| {
            if total_trades > 0 {
                total / total_trades as f64
            } else {
                0.0
            }
        };

        let profit_factor = if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else if gross_profit > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        PortfolioMetrics {
            initial_equity,
            final_equity,
            total_return,
            total_trades,
            winning_trades,
            losing_trades,
            win_rate: per_trade(winning_trades as f64),
            avg_win: if winning_trades > 0 {
                gross_profit / winning_trades as f64
            } else {
                0.0
            },
            avg_loss: if losing_trades > 0 {
                gross_loss / losing_trades as f64
            } else {
                0.0
            },
            largest_win,
            largest_loss,
            profit_factor,
            max_drawdown: state.max_drawdown,
            sharpe_ratio: sharpe_ratio(state, annualization_factor),
            avg_holding_days: per_trade(total_holding_days as f64),
            avg_r_multiple: per_trade(total_r),
        }
    }
}

/// Mean over sample standard deviation of point-to-point equity returns,
/// starting from the initial equity, scaled by `sqrt(annualization_factor)`.
fn sharpe_ratio(state: &BacktestState, annualization_factor: f64) -> f64 {
    let equities: Vec<f64> = std::iter::once(state.initial_equity)
        .chain(state.equity_curve.iter().map(|p| p.equity))
        .collect();

    let returns: Vec<f64> = equities
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect();

    if returns.len() < 2 {
        return 0.0;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let stddev = variance.sqrt();

    if stddev > 0.0 {
        mean / stddev * annualization_factor.sqrt()
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolPerformance {
    pub symbol: String,
    pub trades: usize,
    pub wins: usize,
    pub total_pnl: f64,
    pub avg_return: f64,
    pub win_rate: f64,
}

impl SymbolPerformance {
    /// One entry per symbol, in the given order, including symbols that
    /// never traded.
    pub fn compute_all(symbols: &[String], trades: &[BacktestTrade]) -> Vec<Self> {
        symbols
            .iter()
            .map(|symbol| {
                let mine: Vec<&BacktestTrade> =
                    trades.iter().filter(|t| &t.symbol == symbol).collect();
                let count = mine.len();
                let wins = mine.iter().filter(|t| t.is_win()).count();
                let total_pnl = mine.iter().map(|t| t.trade_pnl).sum();
                let (avg_return, win_rate) = if count > 0 {
                    (
                        mine.iter().map(|t| t.trade_return).sum::<f64>() / count as f64,
                        wins as f64 / count as f64,
                    )
                } else {
                    (0.0, 0.0)
                };
                SymbolPerformance {
                    symbol: symbol.clone(),
                    trades: count,
                    wins,
                    total_pnl,
                    avg_return,
                    win_rate,
                }
            })
            .collect()
    }
}
