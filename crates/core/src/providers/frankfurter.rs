use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::price_from_f64;
use super::traits::FxProvider;
use crate::errors::CoreError;
use crate::models::price::FxPoint;

const BASE_URL: &str = "https://api.frankfurter.dev/v1";
const PROVIDER: &str = "Frankfurter";

/// Frankfurter API provider for fiat exchange rates.
///
/// - **Free**: No API key, no rate limits, open-source.
/// - **Source**: European Central Bank reference rates, published on TARGET
///   business days only. Weekends and holidays are gaps that the lookback
///   window fills.
pub struct FrankfurterProvider {
    client: Client,
}

impl FrankfurterProvider {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }
}

impl Default for FrankfurterProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct TimeSeriesResponse {
    rates: HashMap<String, HashMap<String, f64>>,
}

#[async_trait]
impl FxProvider for FrankfurterProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn get_fx_history(
        &self,
        base: &str,
        quote: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<FxPoint>, CoreError> {
        let base = base.to_uppercase();
        let target = quote.to_uppercase();

        if base == target {
            return Ok(from
                .iter_days()
                .take_while(|d| *d <= to)
                .map(|date| FxPoint {
                    date,
                    rate: Decimal::ONE,
                })
                .collect());
        }

        let url = format!(
            "{BASE_URL}/{}..{}",
            from.format("%Y-%m-%d"),
            to.format("%Y-%m-%d")
        );

        let resp: TimeSeriesResponse = self
            .client
            .get(&url)
            .query(&[("base", base.as_str()), ("symbols", target.as_str())])
            .send()
            .await?
            .json()
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to parse time series for {base}/{target}: {e}"),
            })?;

        let mut points: Vec<FxPoint> = resp
            .rates
            .iter()
            .filter_map(|(date_str, rates)| {
                let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").ok()?;
                let rate = price_from_f64(*rates.get(&target)?)?;
                Some(FxPoint { date, rate })
            })
            .collect();

        points.sort_by_key(|p| p.date);
        Ok(points)
    }
}
