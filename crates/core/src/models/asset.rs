use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::CoreError;

/// The class of an investable asset.
/// Determines which price provider is asked for market data and which
/// bucket of the valuation breakdown a holding lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssetClass {
    /// Listed equities (AAPL, ENI.MI, ...): Yahoo Finance, Alpha Vantage fallback
    Stock,
    /// Exchange-traded funds (VWCE.DE, SPY, ...): same providers as stocks
    #[serde(rename = "ETF", alias = "Etf")]
    Etf,
    /// Cryptocurrencies (BTC, ETH, ...): CoinCap
    Crypto,
}

impl AssetClass {
    pub const ALL: [AssetClass; 3] = [AssetClass::Stock, AssetClass::Etf, AssetClass::Crypto];
}

impl std::fmt::Display for AssetClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetClass::Stock => write!(f, "Stock"),
            AssetClass::Etf => write!(f, "ETF"),
            AssetClass::Crypto => write!(f, "Crypto"),
        }
    }
}

impl FromStr for AssetClass {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stock" | "stocks" => Ok(AssetClass::Stock),
            "etf" | "etfs" => Ok(AssetClass::Etf),
            "crypto" | "cryptocurrency" => Ok(AssetClass::Crypto),
            other => Err(CoreError::ValidationError(format!(
                "Unknown asset class '{other}' (expected Stock, ETF or Crypto)"
            ))),
        }
    }
}

/// Upper-case and trim a ticker symbol.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Validate and normalize an ISO-4217-style currency code (3 ASCII letters).
pub fn normalize_currency(code: &str) -> Result<String, CoreError> {
    let trimmed = code.trim().to_uppercase();
    if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(CoreError::ValidationError(format!(
            "Invalid currency code '{code}': must be exactly 3 ASCII letters (e.g., EUR, USD)"
        )));
    }
    Ok(trimmed)
}
