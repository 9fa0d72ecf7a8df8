//! Symbol universe: parsing symbol lists and classifying symbols by the
//! suffix conventions of the data provider.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Equity,
    Crypto,
    Commodity,
    Forex,
}

impl AssetClass {
    /// `=F` futures, `=X` forex pairs, `-USD`/`-USDT` crypto pairs.
    pub fn classify(symbol: &str) -> Self {
        let upper = symbol.to_ascii_uppercase();
        if upper.ends_with("=F") {
            AssetClass::Commodity
        } else if upper.ends_with("=X") {
            AssetClass::Forex
        } else if upper.ends_with("-USD") || upper.ends_with("-USDT") {
            AssetClass::Crypto
        } else {
            AssetClass::Equity
        }
    }

    /// Forex and futures volume is not comparable to equity dollar volume.
    pub fn skips_liquidity_filter(&self) -> bool {
        matches!(self, AssetClass::Commodity | AssetClass::Forex)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::Equity => "equity",
            AssetClass::Crypto => "crypto",
            AssetClass::Commodity => "commodity",
            AssetClass::Forex => "forex",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),
}

/// Uppercases a symbol; with `is_crypto`, a bare ticker becomes `TICKER-USD`.
pub fn normalize_symbol(symbol: &str, is_crypto: bool) -> String {
    let upper = symbol.trim().to_ascii_uppercase();
    if is_crypto && !upper.contains('-') && !upper.contains('=') {
        format!("{upper}-USD")
    } else {
        upper
    }
}

/// Parses a comma-separated symbol list, preserving order.
pub fn parse_symbols(input: &str, is_crypto: bool) -> Result<Vec<String>, UniverseError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let symbol = normalize_symbol(trimmed, is_crypto);
        if !seen.insert(symbol.clone()) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}
