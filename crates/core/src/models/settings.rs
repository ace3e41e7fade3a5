use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::errors::CoreError;

use super::asset::normalize_currency;

/// Default lookback window for prices and FX rates, in days.
pub const DEFAULT_LOOKBACK_DAYS: u32 = 7;

/// Default reporting currency.
pub const DEFAULT_REPORTING_CURRENCY: &str = "EUR";

/// USD→EUR rate used when the FX provider cannot be reached at all.
pub const DEFAULT_USD_EUR_FALLBACK: Decimal = Decimal::from_parts(85, 0, 0, false, 2);

/// A fixed exchange rate used only when the FX provider is unreachable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackRate {
    pub from: String,
    pub to: String,
    pub rate: Decimal,
}

/// Engine configuration. Every field has a default, so a partial JSON
/// document (or none at all) is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// The currency all valuations are expressed in.
    pub reporting_currency: String,

    /// How far back a missing price or rate may be filled from.
    pub lookback_days: u32,

    /// Rates used when the FX provider is down. Inverses are derived.
    pub fallback_fx_rates: Vec<FallbackRate>,

    /// Optional API keys, by provider name (e.g., "alphavantage").
    pub api_keys: HashMap<String, String>,

    /// Longest history range accepted, in days.
    pub max_history_days: i64,

    /// Upper bound for one valuation / history computation. `None` disables it.
    pub computation_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            reporting_currency: DEFAULT_REPORTING_CURRENCY.to_string(),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            fallback_fx_rates: vec![FallbackRate {
                from: "USD".to_string(),
                to: "EUR".to_string(),
                rate: DEFAULT_USD_EUR_FALLBACK,
            }],
            api_keys: HashMap::new(),
            max_history_days: 3650,
            computation_timeout_secs: Some(60),
        }
    }
}

impl Settings {
    /// Parse settings from JSON and validate them.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validated()
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize settings: {e}")))
    }

    /// Normalize currency codes and reject impossible values.
    pub fn validated(mut self) -> Result<Self, CoreError> {
        self.reporting_currency = normalize_currency(&self.reporting_currency)?;
        for fallback in &mut self.fallback_fx_rates {
            fallback.from = normalize_currency(&fallback.from)?;
            fallback.to = normalize_currency(&fallback.to)?;
            if fallback.rate <= Decimal::ZERO {
                return Err(CoreError::ValidationError(format!(
                    "Fallback rate {}→{} must be positive",
                    fallback.from, fallback.to
                )));
            }
        }
        if self.max_history_days <= 0 {
            return Err(CoreError::ValidationError(
                "max_history_days must be positive".into(),
            ));
        }
        Ok(self)
    }

    /// Set the reporting currency (e.g., "EUR", "USD").
    pub fn set_reporting_currency(&mut self, currency: &str) -> Result<(), CoreError> {
        self.reporting_currency = normalize_currency(currency)?;
        Ok(())
    }

    /// Fixed rate for `from`→`to`, taking configured inverses into account.
    pub fn fallback_rate(&self, from: &str, to: &str) -> Option<Decimal> {
        find_fallback_rate(&self.fallback_fx_rates, from, to)
    }
}

/// Look `from`→`to` up in a list of fixed rates, deriving the inverse when
/// only `to`→`from` is configured.
pub fn find_fallback_rate(rates: &[FallbackRate], from: &str, to: &str) -> Option<Decimal> {
    let from = from.to_uppercase();
    let to = to.to_uppercase();
    rates.iter().find_map(|f| {
        if f.from == from && f.to == to {
            Some(f.rate)
        } else if f.from == to && f.to == from && !f.rate.is_zero() {
            Some(Decimal::ONE / f.rate)
        } else {
            None
        }
    })
}
