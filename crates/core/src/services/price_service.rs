use chrono::NaiveDate;
use futures::future::join_all;
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::errors::CoreError;
use crate::models::asset::{normalize_symbol, AssetClass};
use crate::models::price::{lookback_start, Lookup, PriceCache, PricePoint};
use crate::providers::registry::ProviderRegistry;

/// Fetches asset price histories from the registered providers.
///
/// Fallback strategy:
/// - Providers for an asset class are tried in registration order.
/// - The first provider that returns points wins.
/// - A provider that answers with nothing (unknown ticker, empty range)
///   counts as an answer: if no later provider has data, the result is an
///   empty history, which reads as a data gap.
/// - Only when every provider fails to answer is the symbol unavailable.
pub struct PriceService {
    registry: Arc<ProviderRegistry>,
}

impl PriceService {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self { registry }
    }

    /// Check if at least one provider is available for a given asset class.
    pub fn has_provider_for(&self, asset_class: AssetClass) -> bool {
        self.registry.has_provider_for(asset_class)
    }

    /// Get the names of all providers available for a given asset class.
    pub fn get_provider_names(&self, asset_class: AssetClass) -> Vec<String> {
        self.registry.provider_names(asset_class)
    }

    /// Daily closes for `symbol` within `[from, to]`, with provider fallback.
    ///
    /// Returns `ProviderUnavailable` only if no provider could be used.
    pub async fn fetch_history(
        &self,
        symbol: &str,
        asset_class: AssetClass,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let providers = self.registry.get_providers_for(asset_class);
        if providers.is_empty() {
            return Err(CoreError::NoProvider(asset_class.to_string()));
        }

        let mut answered = false;
        let mut last_error = None;

        for provider in &providers {
            match provider
                .get_price_history(symbol, asset_class, from, to)
                .await
            {
                Ok(points) => {
                    // Reject the whole answer if any price is negative
                    if let Some(bad) = points.iter().find(|p| p.price < Decimal::ZERO) {
                        log::warn!(
                            "{} returned invalid price {} for {symbol} on {}",
                            provider.name(),
                            bad.price,
                            bad.date
                        );
                        last_error = Some(CoreError::Api {
                            provider: provider.name().to_string(),
                            message: format!(
                                "Invalid price returned for {symbol}: {} (must be non-negative)",
                                bad.price
                            ),
                        });
                        continue;
                    }
                    if !points.is_empty() {
                        log::debug!(
                            "{} returned {} prices for {symbol} in {from}..{to}",
                            provider.name(),
                            points.len()
                        );
                        return Ok(points);
                    }
                    answered = true;
                }
                Err(CoreError::PriceNotAvailable { .. }) => {
                    log::debug!("{} has no prices for {symbol}", provider.name());
                    answered = true;
                }
                Err(e) => {
                    log::warn!("{} failed for {symbol}: {e}", provider.name());
                    last_error = Some(e);
                }
            }
        }

        if answered {
            return Ok(Vec::new());
        }

        Err(CoreError::ProviderUnavailable {
            target: symbol.to_string(),
            reason: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no provider answered".to_string()),
        })
    }

    /// Fetch every symbol's history concurrently and load it into `cache`.
    ///
    /// Symbols whose providers are all down are marked unavailable; nothing
    /// here fails the computation.
    pub async fn prefetch(
        &self,
        cache: &mut PriceCache,
        symbols: &[(String, AssetClass)],
        from: NaiveDate,
        to: NaiveDate,
    ) {
        let fetches = symbols.iter().map(|(symbol, asset_class)| async move {
            let result = self.fetch_history(symbol, *asset_class, from, to).await;
            (symbol, *asset_class, result)
        });

        for (symbol, asset_class, result) in join_all(fetches).await {
            match result {
                Ok(points) => cache.set_prices(symbol, asset_class, points),
                Err(e) => {
                    log::warn!("Prices for {symbol} ({asset_class}) unavailable: {e}");
                    cache.mark_prices_unavailable(symbol, asset_class);
                }
            }
        }
    }

    /// One-off backward-filled price lookup.
    pub async fn price_on(
        &self,
        symbol: &str,
        asset_class: AssetClass,
        date: NaiveDate,
        lookback_days: u32,
    ) -> Lookup<PricePoint> {
        let symbol = normalize_symbol(symbol);
        let mut cache = PriceCache::new();
        self.prefetch(
            &mut cache,
            &[(symbol.clone(), asset_class)],
            lookback_start(date, lookback_days),
            date,
        )
        .await;
        cache
            .price_on(&symbol, asset_class, date, lookback_days)
            .map(Clone::clone)
    }

    /// Ask the providers whether a ticker exists. The first positive answer wins.
    pub async fn validate_symbol(
        &self,
        symbol: &str,
        asset_class: AssetClass,
    ) -> Result<bool, CoreError> {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            return Ok(false);
        }

        let providers = self.registry.get_providers_for(asset_class);
        if providers.is_empty() {
            return Err(CoreError::NoProvider(asset_class.to_string()));
        }

        let mut answered = false;
        let mut last_error = None;

        for provider in &providers {
            match provider.validate_symbol(&symbol, asset_class).await {
                Ok(true) => return Ok(true),
                Ok(false) => answered = true,
                Err(e) => {
                    log::warn!("{} could not validate {symbol}: {e}", provider.name());
                    last_error = Some(e);
                }
            }
        }

        if answered {
            return Ok(false);
        }

        Err(CoreError::ProviderUnavailable {
            target: symbol,
            reason: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no provider answered".to_string()),
        })
    }
}
