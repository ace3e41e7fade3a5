use thiserror::Error;

/// Unified error type for the entire mr-tracker-core library.
/// Every public function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Storage / File ──────────────────────────────────────────────
    #[error("File I/O error: {0}")]
    FileIO(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ── API / Network ───────────────────────────────────────────────
    #[error("API error ({provider}): {message}")]
    Api {
        provider: String,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("No provider available for {0}")]
    NoProvider(String),

    #[error("Market data provider unavailable for {target}: {reason}")]
    ProviderUnavailable {
        target: String,
        reason: String,
    },

    #[error("Price not available for {symbol} in {currency} on {date}")]
    PriceNotAvailable {
        symbol: String,
        currency: String,
        date: String,
    },

    // ── Business Logic ──────────────────────────────────────────────
    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Invalid date '{value}': expected ISO-8601 (YYYY-MM-DD)")]
    InvalidDateFormat { value: String },

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Computation timed out after {0}s")]
    Timeout(u64),
}

impl CoreError {
    /// True for failures that mean "the market data source could not be reached",
    /// as opposed to "it answered but had nothing for that date".
    pub fn is_provider_failure(&self) -> bool {
        matches!(
            self,
            CoreError::Api { .. }
                | CoreError::Network(_)
                | CoreError::NoProvider(_)
                | CoreError::ProviderUnavailable { .. }
        )
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::FileIO(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest errors carry the full URL; drop the query so API keys stay out of logs.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        CoreError::Network(sanitized)
    }
}
