use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use time::OffsetDateTime;

use super::price_from_f64;
use super::traits::PriceProvider;
use crate::errors::CoreError;
use crate::models::asset::{normalize_symbol, AssetClass};
use crate::models::price::PricePoint;

const PROVIDER: &str = "Yahoo Finance";

/// Yahoo Finance provider for stocks and ETFs.
///
/// - **Free**: No API key required (unofficial public API).
/// - **Coverage**: Global equities and ETFs, exchange suffixes included
///   (`ENI.MI`, `VWCE.DE`).
/// - **Currency**: Each chart response carries the listing currency in its
///   metadata, so prices come back tagged with their native currency.
pub struct YahooFinanceProvider {
    connector: yahoo_finance_api::YahooConnector,
}

impl YahooFinanceProvider {
    pub fn new() -> Result<Self, CoreError> {
        let connector = yahoo_finance_api::YahooConnector::new().map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Failed to create connector: {e}"),
        })?;
        Ok(Self { connector })
    }

    /// Midnight UTC of `date` as a `time::OffsetDateTime`.
    fn to_offset_datetime(date: NaiveDate) -> Result<OffsetDateTime, CoreError> {
        let month = time::Month::try_from(date.month() as u8).map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Invalid month in {date}: {e}"),
        })?;

        let odt = time::Date::from_calendar_date(date.year(), month, date.day() as u8)
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Invalid date {date}: {e}"),
            })?
            .midnight()
            .assume_utc();
        Ok(odt)
    }

    fn timestamp_to_naive_date(ts: i64) -> Option<NaiveDate> {
        chrono::DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive())
    }

    /// ISO code for a Yahoo currency, and what a quote must be divided by to
    /// be in it. Some exchanges quote in minor units: London in pence
    /// (`GBp`/`GBX`), Johannesburg in cents (`ZAc`), Tel Aviv in agorot (`ILA`).
    pub fn listing_currency(code: &str) -> (String, Decimal) {
        let hundred = Decimal::ONE_HUNDRED;
        match code.trim() {
            "GBp" | "GBX" | "GBx" => ("GBP".to_string(), hundred),
            "ZAc" | "ZAC" => ("ZAR".to_string(), hundred),
            "ILA" | "ILa" => ("ILS".to_string(), hundred),
            other => (other.to_uppercase(), Decimal::ONE),
        }
    }
}

#[async_trait]
impl PriceProvider for YahooFinanceProvider {
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
        let start = Self::to_offset_datetime(from)?;
        let end = Self::to_offset_datetime(to + chrono::Duration::days(1))?; // inclusive end

        let resp = self
            .connector
            .get_quote_history(&symbol, start, end)
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to fetch history for {symbol}: {e}"),
            })?;

        let (currency, divisor) = resp
            .metadata()
            .ok()
            .and_then(|m| m.currency)
            .map(|c| Self::listing_currency(&c))
            .unwrap_or_else(|| ("USD".to_string(), Decimal::ONE));

        // An empty chart is "no data", not an outage.
        let quotes = resp.quotes().map_err(|_| CoreError::PriceNotAvailable {
            symbol: symbol.clone(),
            currency: currency.clone(),
            date: format!("{from}..{to}"),
        })?;

        let mut points: Vec<PricePoint> = quotes
            .iter()
            .filter_map(|q| {
                let date = Self::timestamp_to_naive_date(q.timestamp)?;
                if date < from || date > to {
                    return None;
                }
                Some(PricePoint {
                    date,
                    price: price_from_f64(q.close)? / divisor,
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
        let resp = self
            .connector
            .search_ticker(&symbol)
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to search ticker {symbol}: {e}"),
            })?;

        Ok(resp
            .quotes
            .iter()
            .any(|q| q.symbol.eq_ignore_ascii_case(&symbol)))
    }
}
