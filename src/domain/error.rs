//! Domain error types.
//!
//! Per-symbol failures (`DataUnavailable`, `DataInsufficient`,
//! `LiquidityFiltered`, `ComputationUndefined`) are wrapped in a
//! [`SymbolError`] and returned next to successful results. Range errors
//! abort a whole backtest call.

use serde::Serialize;

/// Top-level error type for marketscan.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no data for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    #[error("insufficient data for {symbol}: have {bars} bars, need {minimum}")]
    DataInsufficient {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error("{symbol} filtered for liquidity: dollar volume {dollar_volume:.0} below {minimum:.0}")]
    LiquidityFiltered {
        symbol: String,
        dollar_volume: f64,
        minimum: f64,
    },

    #[error("invalid date range: {reason}")]
    InvalidRange { reason: String },

    #[error("no defined values for {symbol}: {reason}")]
    ComputationUndefined { symbol: String, reason: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ScanError {
    pub fn invalid_config(section: &str, key: &str, reason: impl Into<String>) -> Self {
        ScanError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invalid_range(reason: impl Into<String>) -> Self {
        ScanError::InvalidRange {
            reason: reason.into(),
        }
    }

    /// Short machine-readable tag used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            ScanError::ConfigParse { .. }
            | ScanError::ConfigMissing { .. }
            | ScanError::ConfigInvalid { .. } => "config",
            ScanError::DataUnavailable { .. } => "data_unavailable",
            ScanError::DataInsufficient { .. } => "data_insufficient",
            ScanError::LiquidityFiltered { .. } => "liquidity_filtered",
            ScanError::InvalidRange { .. } => "invalid_range",
            ScanError::ComputationUndefined { .. } => "computation_undefined",
            ScanError::Cancelled => "cancelled",
            ScanError::Csv(_) | ScanError::Io(_) => "io",
        }
    }
}

impl From<&ScanError> for std::process::ExitCode {
    fn from(err: &ScanError) -> Self {
        let code: u8 = match err {
            ScanError::Io(_) | ScanError::Csv(_) => 1,
            ScanError::ConfigParse { .. }
            | ScanError::ConfigMissing { .. }
            | ScanError::ConfigInvalid { .. } => 2,
            ScanError::InvalidRange { .. } => 3,
            ScanError::DataUnavailable { .. }
            | ScanError::DataInsufficient { .. }
            | ScanError::LiquidityFiltered { .. }
            | ScanError::ComputationUndefined { .. } => 5,
            ScanError::Cancelled => 130,
        };
        std::process::ExitCode::from(code)
    }
}

/// A failure isolated to one symbol of a batch.
#[derive(Debug, thiserror::Error)]
#[error("{symbol}: {error}")]
pub struct SymbolError {
    pub symbol: String,
    #[source]
    pub error: ScanError,
}

impl SymbolError {
    pub fn new(symbol: impl Into<String>, error: ScanError) -> Self {
        Self {
            symbol: symbol.into(),
            error,
        }
    }
}

/// Serializable view of a [`SymbolError`] for reports.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolErrorRecord {
    pub symbol: String,
    pub kind: &'static str,
    pub reason: String,
}

impl From<&SymbolError> for SymbolErrorRecord {
    fn from(err: &SymbolError) -> Self {
        SymbolErrorRecord {
            symbol: err.symbol.clone(),
            kind: err.error.kind(),
            reason: err.error.to_string(),
        }
    }
}
