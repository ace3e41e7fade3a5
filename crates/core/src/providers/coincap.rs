use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use super::price_from_str;
use super::traits::PriceProvider;
use crate::errors::CoreError;
use crate::models::asset::{normalize_symbol, AssetClass};
use crate::models::price::PricePoint;

const BASE_URL: &str = "https://api.coincap.io/v2";
const PROVIDER: &str = "CoinCap";

/// CoinCap API provider for cryptocurrency prices.
///
/// - **Free**: No API key required.
/// - **Endpoints**: `/assets/{id}/history`, `/assets?search={symbol}`
/// - **Currency**: always USD.
///
/// CoinCap addresses assets by slug ("bitcoin"); common tickers are mapped
/// up front, anything else is resolved through the search endpoint once and
/// remembered.
pub struct CoinCapProvider {
    client: Client,
    symbol_map: Mutex<HashMap<String, String>>,
}

impl CoinCapProvider {
    pub fn new() -> Self {
        let common = [
            ("BTC", "bitcoin"),
            ("ETH", "ethereum"),
            ("USDT", "tether"),
            ("USDC", "usd-coin"),
            ("BNB", "binance-coin"),
            ("XRP", "xrp"),
            ("ADA", "cardano"),
            ("SOL", "solana"),
            ("DOGE", "dogecoin"),
            ("DOT", "polkadot"),
            ("MATIC", "polygon"),
            ("LTC", "litecoin"),
            ("AVAX", "avalanche"),
            ("LINK", "chainlink"),
            ("XLM", "stellar"),
            ("XMR", "monero"),
        ];
        let symbol_map = common
            .iter()
            .map(|(sym, id)| (sym.to_string(), id.to_string()))
            .collect();

        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
            symbol_map: Mutex::new(symbol_map),
        }
    }

    /// CoinCap slug for a known ticker, without touching the network.
    pub fn known_id(&self, symbol: &str) -> Option<String> {
        let map = self.symbol_map.lock().unwrap_or_else(|e| e.into_inner());
        map.get(&normalize_symbol(symbol)).cloned()
    }

    /// Resolve a ticker to a CoinCap slug, searching the API when unknown.
    /// `Ok(None)` means CoinCap answered and has no such asset.
    async fn resolve_id(&self, symbol: &str) -> Result<Option<String>, CoreError> {
        let upper = normalize_symbol(symbol);
        if let Some(id) = self.known_id(&upper) {
            return Ok(Some(id));
        }

        let resp: AssetsSearchResponse = self
            .client
            .get(format!("{BASE_URL}/assets"))
            .query(&[("search", upper.as_str()), ("limit", "5")])
            .send()
            .await?
            .json()
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to search for {upper}: {e}"),
            })?;

        let Some(matched) = resp
            .data
            .into_iter()
            .find(|a| a.symbol.eq_ignore_ascii_case(&upper))
        else {
            return Ok(None);
        };

        let mut map = self.symbol_map.lock().unwrap_or_else(|e| e.into_inner());
        map.insert(upper, matched.id.clone());
        Ok(Some(matched.id))
    }

    fn day_bounds_millis(from: NaiveDate, to: NaiveDate) -> Option<(i64, i64)> {
        let start = from.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis();
        let end = to.and_hms_opt(23, 59, 59)?.and_utc().timestamp_millis();
        Some((start, end))
    }
}

impl Default for CoinCapProvider {
    fn default() -> Self {
        Self::new()
    }
}

// ── CoinCap API response types ──────────────────────────────────────

#[derive(Deserialize)]
struct HistoryResponse {
    data: Vec<HistoryPoint>,
}

#[derive(Deserialize)]
struct HistoryPoint {
    #[serde(rename = "priceUsd")]
    price_usd: String,
    time: i64, // unix timestamp in milliseconds
}

#[derive(Deserialize)]
struct AssetsSearchResponse {
    data: Vec<AssetSearchEntry>,
}

#[derive(Deserialize)]
struct AssetSearchEntry {
    id: String,
    symbol: String,
}

#[async_trait]
impl PriceProvider for CoinCapProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn supported_asset_classes(&self) -> Vec<AssetClass> {
        vec![AssetClass::Crypto]
    }

    async fn get_price_history(
        &self,
        symbol: &str,
        _asset_class: AssetClass,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let id = self
            .resolve_id(symbol)
            .await?
            .ok_or_else(|| CoreError::PriceNotAvailable {
                symbol: normalize_symbol(symbol),
                currency: "USD".into(),
                date: format!("{from}..{to}"),
            })?;

        let (start, end) = Self::day_bounds_millis(from, to).ok_or_else(|| {
            CoreError::ValidationError(format!("Invalid history range {from}..{to}"))
        })?;

        let resp: HistoryResponse = self
            .client
            .get(format!("{BASE_URL}/assets/{id}/history"))
            .query(&[
                ("interval", "d1".to_string()),
                ("start", start.to_string()),
                ("end", end.to_string()),
            ])
            .send()
            .await?
            .json()
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to parse history for {symbol}: {e}"),
            })?;

        let mut points: Vec<PricePoint> = resp
            .data
            .iter()
            .filter_map(|p| {
                let dt = chrono::DateTime::from_timestamp_millis(p.time)?;
                Some(PricePoint {
                    date: dt.date_naive(),
                    price: price_from_str(&p.price_usd)?,
                    currency: "USD".to_string(),
                })
            })
            .collect();

        points.sort_by_key(|p| p.date);
        Ok(points)
    }

    async fn validate_symbol(
        &self,
        symbol: &str,
        _asset_class: AssetClass,
    ) -> Result<bool, CoreError> {
        Ok(self.resolve_id(symbol).await?.is_some())
    }
}
