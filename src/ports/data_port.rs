//! Data access port trait.

use crate::domain::error::ScanError;
use crate::domain::ohlcv::Bar;
use crate::domain::timeframe::Timeframe;
use chrono::{DateTime, Duration, Utc};

/// Which slice of history to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchRange {
    /// The most recent `Duration` of history available to the source.
    Lookback(Duration),
    /// Every bar with `start <= timestamp <= end`.
    Between {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Source of historical bars. Implementations must be shareable across the
/// worker threads that prepare symbols in parallel.
pub trait DataPort: Send + Sync {
    /// Raw bars for `symbol`; an empty history is `ScanError::DataUnavailable`.
    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        range: FetchRange,
    ) -> Result<Vec<Bar>, ScanError>;

    fn list_symbols(&self, timeframe: Timeframe) -> Result<Vec<String>, ScanError>;
}
