//! Core domain types and logic.

pub mod backtest;
pub mod cancel;
pub mod config;
pub mod error;
pub mod features;
pub mod indicator;
pub mod metrics;
pub mod ohlcv;
pub mod portfolio;
pub mod position;
pub mod scanner;
pub mod scoring;
pub mod sizing;
pub mod timeframe;
pub mod universe;
