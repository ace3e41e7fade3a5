use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::price_from_str;
use super::traits::PriceProvider;
use crate::errors::CoreError;
use crate::models::asset::{normalize_symbol, AssetClass};
use crate::models::price::PricePoint;

const BASE_URL: &str = "https://www.alphavantage.co/query";
const PROVIDER: &str = "Alpha Vantage";

/// Alpha Vantage API provider for stocks and ETFs.
///
/// - **Free tier**: 25 requests/day (across ALL endpoints).
/// - **Requires**: API key (settings key "alphavantage").
/// - **Role**: fallback behind Yahoo Finance.
///
/// The daily series does not state a currency; the symbol search does, and
/// USD is assumed when it cannot be determined.
pub struct AlphaVantageProvider {
    client: Client,
    api_key: String,
}

impl AlphaVantageProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_key,
        }
    }
}

// ── Alpha Vantage API response types ────────────────────────────────

#[derive(Deserialize)]
struct TimeSeriesResponse {
    #[serde(rename = "Time Series (Daily)")]
    time_series: Option<HashMap<String, DailyData>>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct DailyData {
    #[serde(rename = "4. close")]
    close: String,
}

#[derive(Deserialize)]
struct SymbolSearchResponse {
    #[serde(rename = "bestMatches", default)]
    best_matches: Vec<SymbolMatch>,
}

#[derive(Deserialize)]
struct SymbolMatch {
    #[serde(rename = "1. symbol")]
    symbol: String,
    #[serde(rename = "8. currency", default)]
    currency: Option<String>,
}

impl AlphaVantageProvider {
    async fn search(&self, symbol: &str) -> Result<Vec<SymbolMatch>, CoreError> {
        let resp: SymbolSearchResponse = self
            .client
            .get(BASE_URL)
            .query(&[
                ("function", "SYMBOL_SEARCH"),
                ("keywords", symbol),
                ("apikey", &self.api_key),
            ])
            .send()
            .await?
            .json()
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to parse symbol search for {symbol}: {e}"),
            })?;
        Ok(resp.best_matches)
    }
}

#[async_trait]
impl PriceProvider for AlphaVantageProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn supported_asset_classes(&self) -> Vec<AssetClass> {
        vec![AssetClass::Stock, AssetClass::Etf]
    }

    async fn get_price_history(
        &self,
        symbol: &str,
        _asset_class: AssetClass,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let symbol = normalize_symbol(symbol);
        let resp: TimeSeriesResponse = self
            .client
            .get(BASE_URL)
            .query(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", symbol.as_str()),
                ("outputsize", "full"),
                ("apikey", &self.api_key),
            ])
            .send()
            .await?
            .json()
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to parse time series for {symbol}: {e}"),
            })?;

        if let Some(message) = resp.error_message {
            // Unknown ticker: the API answered, there is just nothing to price.
            log::debug!("{PROVIDER} has no series for {symbol}: {message}");
            return Err(CoreError::PriceNotAvailable {
                symbol,
                currency: "USD".into(),
                date: format!("{from}..{to}"),
            });
        }

        let time_series = resp.time_series.ok_or_else(|| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("No time series data for {symbol}. API limit may be exceeded."),
        })?;

        let currency = self
            .search(&symbol)
            .await
            .ok()
            .and_then(|matches| {
                matches
                    .into_iter()
                    .find(|m| m.symbol.eq_ignore_ascii_case(&symbol))
                    .and_then(|m| m.currency)
            })
            .map(|c| c.to_uppercase())
            .unwrap_or_else(|| "USD".to_string());

        let mut points: Vec<PricePoint> = time_series
            .iter()
            .filter_map(|(date_str, data)| {
                let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").ok()?;
                if date < from || date > to {
                    return None;
                }
                Some(PricePoint {
                    date,
                    price: price_from_str(&data.close)?,
                    currency: currency.clone(),
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
        let symbol = normalize_symbol(symbol);
        let matches = self.search(&symbol).await?;
        Ok(matches.iter().any(|m| m.symbol.eq_ignore_ascii_case(&symbol)))
    }
}
