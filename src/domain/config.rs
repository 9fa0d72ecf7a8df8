//! Typed configuration for feature compilation, scoring, sizing, scans and
//! backtests.
//!
//! Each struct carries the documented defaults through `Default` and is
//! checked once by `validate`. `from_port` builds a validated value from an
//! INI-backed [`ConfigPort`], falling back to defaults for missing keys. A
//! key that is present but does not parse is an error, never a default.

use crate::domain::error::ScanError;
use crate::domain::timeframe::Timeframe;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use serde::Serialize;

pub const MAX_CONCURRENT_POSITIONS: usize = 5;
/// Longest indicator window accepted, in bars.
pub const MAX_INDICATOR_PERIOD: usize = 5_000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureConfig {
    pub rsi_period: usize,
    pub ema_long_span: usize,
    pub bb_period: usize,
    pub breakout_period: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        FeatureConfig {
            rsi_period: 14,
            ema_long_span: 200,
            bb_period: 20,
            breakout_period: 20,
        }
    }
}

impl FeatureConfig {
    pub fn validate(&self) -> Result<(), ScanError> {
        positive_period("features", "rsi_period", self.rsi_period)?;
        positive_period("features", "ema_long_span", self.ema_long_span)?;
        positive_period("features", "breakout_period", self.breakout_period)?;
        if self.bb_period < 2 {
            return Err(ScanError::invalid_config(
                "features",
                "bb_period",
                "bb_period must be at least 2",
            ));
        }
        positive_period("features", "bb_period", self.bb_period)
    }

    pub fn from_port(port: &dyn ConfigPort) -> Result<Self, ScanError> {
        let d = Self::default();
        let config = FeatureConfig {
            rsi_period: get_usize(port, "features", "rsi_period", d.rsi_period)?,
            ema_long_span: get_usize(port, "features", "ema_long_span", d.ema_long_span)?,
            bb_period: get_usize(port, "features", "bb_period", d.bb_period)?,
            breakout_period: get_usize(port, "features", "breakout_period", d.breakout_period)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Number of leading rows the feature compiler drops before every
    /// column is defined.
    pub fn warmup_rows(&self) -> usize {
        use crate::domain::features::{ATR_PERIOD, VOLUME_PERIOD};
        use crate::domain::indicator::macd::{SIGNAL, SLOW};
        [
            self.ema_long_span.saturating_sub(1),
            self.rsi_period,
            (2 * self.bb_period).saturating_sub(2),
            self.breakout_period,
            SLOW - 1 + SIGNAL - 1,
            ATR_PERIOD - 1,
            VOLUME_PERIOD - 1,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreWeights {
    pub regime: f64,
    pub structure: f64,
    pub rsi: f64,
    pub macd: f64,
    pub volume: f64,
    pub volatility: f64,
    pub tradability: f64,
    pub overextension_penalty: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        ScoreWeights {
            regime: 25.0,
            structure: 25.0,
            rsi: 10.0,
            macd: 10.0,
            volume: 8.0,
            volatility: 7.0,
            tradability: 5.0,
            overextension_penalty: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreThresholds {
    pub rsi_bull: f64,
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
    pub volume_z: f64,
    pub atr_pct_max: f64,
}

impl Default for ScoreThresholds {
    fn default() -> Self {
        ScoreThresholds {
            rsi_bull: 50.0,
            rsi_overbought: 80.0,
            rsi_oversold: 20.0,
            volume_z: 0.5,
            atr_pct_max: 0.04,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoringConfig {
    pub weights: ScoreWeights,
    pub thresholds: ScoreThresholds,
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), ScanError> {
        let w = &self.weights;
        let weights = [
            ("regime", w.regime),
            ("structure", w.structure),
            ("rsi", w.rsi),
            ("macd", w.macd),
            ("volume", w.volume),
            ("volatility", w.volatility),
            ("tradability", w.tradability),
            ("overextension_penalty", w.overextension_penalty),
        ];
        for (key, value) in weights {
            if !value.is_finite() {
                return Err(ScanError::invalid_config("weights", key, "weight must be finite"));
            }
        }

        let t = &self.thresholds;
        for (key, value) in [
            ("rsi_bull", t.rsi_bull),
            ("rsi_overbought", t.rsi_overbought),
            ("rsi_oversold", t.rsi_oversold),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ScanError::invalid_config(
                    "thresholds",
                    key,
                    "RSI thresholds must be between 0 and 100",
                ));
            }
        }
        if !t.volume_z.is_finite() {
            return Err(ScanError::invalid_config(
                "thresholds",
                "volume_z",
                "volume_z must be finite",
            ));
        }
        if !(t.atr_pct_max > 0.0) {
            return Err(ScanError::invalid_config(
                "thresholds",
                "atr_pct_max",
                "atr_pct_max must be positive",
            ));
        }
        Ok(())
    }

    pub fn from_port(port: &dyn ConfigPort) -> Result<Self, ScanError> {
        let dw = ScoreWeights::default();
        let dt = ScoreThresholds::default();
        let config = ScoringConfig {
            weights: ScoreWeights {
                regime: port.get_double("weights", "regime", dw.regime)?,
                structure: port.get_double("weights", "structure", dw.structure)?,
                rsi: port.get_double("weights", "rsi", dw.rsi)?,
                macd: port.get_double("weights", "macd", dw.macd)?,
                volume: port.get_double("weights", "volume", dw.volume)?,
                volatility: port.get_double("weights", "volatility", dw.volatility)?,
                tradability: port.get_double("weights", "tradability", dw.tradability)?,
                overextension_penalty: port.get_double(
                    "weights",
                    "overextension_penalty",
                    dw.overextension_penalty,
                )?,
            },
            thresholds: ScoreThresholds {
                rsi_bull: port.get_double("thresholds", "rsi_bull", dt.rsi_bull)?,
                rsi_overbought: port.get_double("thresholds", "rsi_overbought", dt.rsi_overbought)?,
                rsi_oversold: port.get_double("thresholds", "rsi_oversold", dt.rsi_oversold)?,
                volume_z: port.get_double("thresholds", "volume_z", dt.volume_z)?,
                atr_pct_max: port.get_double("thresholds", "atr_pct_max", dt.atr_pct_max)?,
            },
        };
        config.validate()?;
        Ok(config)
    }
}

/// Account parameters for the position sizer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizingConfig {
    pub account_equity: f64,
    pub risk_pct: f64,
    pub stop_atr_mult: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        SizingConfig {
            account_equity: 10_000.0,
            risk_pct: 0.01,
            stop_atr_mult: 1.5,
        }
    }
}

impl SizingConfig {
    pub fn validate(&self, section: &str) -> Result<(), ScanError> {
        if !(self.account_equity > 0.0) {
            return Err(ScanError::invalid_config(
                section,
                "account_equity",
                "account_equity must be positive",
            ));
        }
        validate_fraction(section, "risk_pct", self.risk_pct)?;
        if !(self.stop_atr_mult > 0.0) {
            return Err(ScanError::invalid_config(
                section,
                "stop_atr_mult",
                "stop_atr_mult must be positive",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanConfig {
    pub timeframe: Timeframe,
    pub is_crypto: bool,
    pub sizing: SizingConfig,
    pub min_dollar_volume: f64,
    pub features: FeatureConfig,
    pub scoring: ScoringConfig,
    pub parallel: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            timeframe: Timeframe::Daily,
            is_crypto: false,
            sizing: SizingConfig::default(),
            min_dollar_volume: 5_000_000.0,
            features: FeatureConfig::default(),
            scoring: ScoringConfig::default(),
            parallel: true,
        }
    }
}

impl ScanConfig {
    pub fn validate(&self) -> Result<(), ScanError> {
        self.sizing.validate("scan")?;
        if !(self.min_dollar_volume >= 0.0) {
            return Err(ScanError::invalid_config(
                "scan",
                "min_dollar_volume",
                "min_dollar_volume must be non-negative",
            ));
        }
        self.features.validate()?;
        self.scoring.validate()
    }

    pub fn from_port(port: &dyn ConfigPort) -> Result<Self, ScanError> {
        let d = Self::default();
        let config = ScanConfig {
            timeframe: get_timeframe(port, "scan", d.timeframe)?,
            is_crypto: port.get_bool("scan", "is_crypto", d.is_crypto)?,
            sizing: SizingConfig {
                account_equity: port.get_double("scan", "account_equity", d.sizing.account_equity)?,
                risk_pct: port.get_double("scan", "risk_pct", d.sizing.risk_pct)?,
                stop_atr_mult: port.get_double("scan", "stop_atr_mult", d.sizing.stop_atr_mult)?,
            },
            min_dollar_volume: port.get_double("scan", "min_dollar_volume", d.min_dollar_volume)?,
            features: FeatureConfig::from_port(port)?,
            scoring: ScoringConfig::from_port(port)?,
            parallel: port.get_bool("scan", "parallel", d.parallel)?,
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub timeframe: Timeframe,
    pub initial_equity: f64,
    pub risk_per_trade: f64,
    pub stop_atr_mult: f64,
    pub min_score: f64,
    pub max_positions: usize,
    pub is_crypto: bool,
    pub features: FeatureConfig,
    pub scoring: ScoringConfig,
    pub parallel: bool,
}

impl BacktestConfig {
    /// Defaults for everything except the date range.
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        BacktestConfig {
            start_date,
            end_date,
            timeframe: Timeframe::Daily,
            initial_equity: 10_000.0,
            risk_per_trade: 0.01,
            stop_atr_mult: 1.5,
            min_score: 50.0,
            max_positions: MAX_CONCURRENT_POSITIONS,
            is_crypto: false,
            features: FeatureConfig::default(),
            scoring: ScoringConfig::default(),
            parallel: true,
        }
    }

    /// Checks parameters. The date range is checked separately by the
    /// simulator so that it surfaces as a range error.
    pub fn validate(&self) -> Result<(), ScanError> {
        if !(self.initial_equity > 0.0) {
            return Err(ScanError::invalid_config(
                "backtest",
                "initial_equity",
                "initial_equity must be positive",
            ));
        }
        validate_fraction("backtest", "risk_per_trade", self.risk_per_trade)?;
        if !(self.stop_atr_mult > 0.0) {
            return Err(ScanError::invalid_config(
                "backtest",
                "stop_atr_mult",
                "stop_atr_mult must be positive",
            ));
        }
        if !self.min_score.is_finite() {
            return Err(ScanError::invalid_config(
                "backtest",
                "min_score",
                "min_score must be finite",
            ));
        }
        if self.max_positions == 0 {
            return Err(ScanError::invalid_config(
                "backtest",
                "max_positions",
                "max_positions must be at least 1",
            ));
        }
        self.features.validate()?;
        self.scoring.validate()
    }

    pub fn from_port(port: &dyn ConfigPort) -> Result<Self, ScanError> {
        Self::from_port_with_dates(port, None, None)
    }

    /// Like [`BacktestConfig::from_port`], with dates given here taking
    /// precedence over the `[backtest]` keys.
    pub fn from_port_with_dates(
        port: &dyn ConfigPort,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Self, ScanError> {
        let start_date = match start {
            Some(date) => date,
            None => get_date(port, "backtest", "start_date")?,
        };
        let end_date = match end {
            Some(date) => date,
            None => get_date(port, "backtest", "end_date")?,
        };
        let d = Self::new(start_date, end_date);
        let config = BacktestConfig {
            timeframe: get_timeframe(port, "backtest", d.timeframe)?,
            initial_equity: port.get_double("backtest", "initial_equity", d.initial_equity)?,
            risk_per_trade: port.get_double("backtest", "risk_per_trade", d.risk_per_trade)?,
            stop_atr_mult: port.get_double("backtest", "stop_atr_mult", d.stop_atr_mult)?,
            min_score: port.get_double("backtest", "min_score", d.min_score)?,
            max_positions: get_usize(port, "backtest", "max_positions", d.max_positions)?,
            is_crypto: port.get_bool("backtest", "is_crypto", d.is_crypto)?,
            features: FeatureConfig::from_port(port)?,
            scoring: ScoringConfig::from_port(port)?,
            parallel: port.get_bool("backtest", "parallel", d.parallel)?,
            ..d
        };
        config.validate()?;
        Ok(config)
    }
}

/// Parses a comma-separated `symbols` key from `section`.
pub fn symbols_from_port(port: &dyn ConfigPort, section: &str) -> Option<String> {
    port.get_string(section, "symbols")
        .filter(|s| !s.trim().is_empty())
}

pub fn parse_date(value: &str, section: &str, key: &str) -> Result<NaiveDate, ScanError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        ScanError::invalid_config(section, key, "invalid date format (expected YYYY-MM-DD)")
    })
}

fn get_date(port: &dyn ConfigPort, section: &str, key: &str) -> Result<NaiveDate, ScanError> {
    let raw = port
        .get_string(section, key)
        .ok_or_else(|| ScanError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        })?;
    parse_date(&raw, section, key)
}

fn get_timeframe(
    port: &dyn ConfigPort,
    section: &str,
    default: Timeframe,
) -> Result<Timeframe, ScanError> {
    match port.get_string(section, "timeframe") {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|e: crate::domain::timeframe::UnknownTimeframe| {
                ScanError::invalid_config(section, "timeframe", e.to_string())
            }),
    }
}

fn get_usize(
    port: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, ScanError> {
    let value = port.get_int(section, key, default as i64)?;
    usize::try_from(value)
        .map_err(|_| ScanError::invalid_config(section, key, "value must be non-negative"))
}

fn positive_period(section: &str, key: &str, value: usize) -> Result<(), ScanError> {
    if value == 0 {
        return Err(ScanError::invalid_config(section, key, "period must be at least 1"));
    }
    if value > MAX_INDICATOR_PERIOD {
        return Err(ScanError::invalid_config(
            section,
            key,
            format!("period must be at most {MAX_INDICATOR_PERIOD}"),
        ));
    }
    Ok(())
}

fn validate_fraction(section: &str, key: &str, value: f64) -> Result<(), ScanError> {
    if !(value > 0.0 && value <= 1.0) {
        return Err(ScanError::invalid_config(
            section,
            key,
            format!("{key} must be a fraction in (0, 1]"),
        ));
    }
    Ok(())
}
