use chrono::NaiveDate;
use futures::future::join_all;
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::errors::CoreError;
use crate::models::price::{lookback_start, FxPoint, Lookup, PriceCache};
use crate::models::settings::{find_fallback_rate, FallbackRate};
use crate::providers::registry::ProviderRegistry;

/// A conversion rate, and whether it came from market data or a fixed fallback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FxRate {
    pub rate: Decimal,
    /// True when the FX provider was unreachable and a configured rate was used.
    pub estimated: bool,
}

impl FxRate {
    pub fn market(rate: Decimal) -> Self {
        Self {
            rate,
            estimated: false,
        }
    }
}

/// Converts native-currency values into the reporting currency.
///
/// Rates come from the FX providers, backward-filled like prices. The
/// configured fallback rates are used only when no FX provider could be
/// reached; a gap in data that was fetched stays a gap.
pub struct CurrencyService {
    registry: Arc<ProviderRegistry>,
    fallback_rates: Vec<FallbackRate>,
}

impl CurrencyService {
    pub fn new(registry: Arc<ProviderRegistry>, fallback_rates: Vec<FallbackRate>) -> Self {
        Self {
            registry,
            fallback_rates,
        }
    }

    /// Daily `base`→`quote` rates within `[from, to]`, trying FX providers in order.
    pub async fn fetch_history(
        &self,
        base: &str,
        quote: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<FxPoint>, CoreError> {
        let providers = self.registry.fx_providers();
        if providers.is_empty() {
            return Err(CoreError::NoProvider(format!("FX {base}/{quote}")));
        }

        let mut last_error = None;
        for provider in &providers {
            match provider.get_fx_history(base, quote, from, to).await {
                Ok(points) if points.iter().all(|p| p.rate > Decimal::ZERO) => {
                    return Ok(points);
                }
                Ok(_) => {
                    last_error = Some(CoreError::Api {
                        provider: provider.name().to_string(),
                        message: format!("Non-positive rate returned for {base}/{quote}"),
                    });
                }
                Err(e) => {
                    log::warn!("{} failed for {base}/{quote}: {e}", provider.name());
                    last_error = Some(e);
                }
            }
        }

        Err(CoreError::ProviderUnavailable {
            target: format!("{base}/{quote}"),
            reason: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no provider answered".to_string()),
        })
    }

    /// Fetch every `(base, quote)` pair concurrently into `cache`.
    /// Identity pairs need no data and are skipped.
    pub async fn prefetch(
        &self,
        cache: &mut PriceCache,
        pairs: &[(String, String)],
        from: NaiveDate,
        to: NaiveDate,
    ) {
        let fetches = pairs
            .iter()
            .filter(|(base, quote)| !base.eq_ignore_ascii_case(quote))
            .map(|(base, quote)| async move {
                let result = self.fetch_history(base, quote, from, to).await;
                (base, quote, result)
            });

        for (base, quote, result) in join_all(fetches).await {
            match result {
                Ok(points) => cache.set_rates(base, quote, points),
                Err(e) => {
                    match find_fallback_rate(&self.fallback_rates, base, quote) {
                        Some(rate) => log::warn!(
                            "FX {base}/{quote} unavailable ({e}); using fallback rate {rate}"
                        ),
                        None => log::warn!(
                            "FX {base}/{quote} unavailable ({e}) and no fallback rate configured"
                        ),
                    }
                    cache.mark_rates_unavailable(base, quote);
                }
            }
        }
    }

    /// Rate to convert `from` into `to` on `date`.
    ///
    /// - same currency: 1;
    /// - market rate within the lookback window: that rate;
    /// - fetched but nothing in the window: `DataGap`;
    /// - provider unreachable: the fallback rate flagged as estimated, or
    ///   `ProviderUnavailable` when none is configured.
    pub fn rate_on(
        &self,
        cache: &PriceCache,
        date: NaiveDate,
        from: &str,
        to: &str,
        lookback_days: u32,
    ) -> Lookup<FxRate> {
        if from.eq_ignore_ascii_case(to) {
            return Lookup::Found(FxRate::market(Decimal::ONE));
        }

        match cache.rate_on(from, to, date, lookback_days) {
            Lookup::Found(point) => Lookup::Found(FxRate::market(point.rate)),
            Lookup::DataGap => Lookup::DataGap,
            Lookup::ProviderUnavailable => {
                match find_fallback_rate(&self.fallback_rates, from, to) {
                    Some(rate) => Lookup::Found(FxRate {
                        rate,
                        estimated: true,
                    }),
                    None => Lookup::ProviderUnavailable,
                }
            }
        }
    }

    /// One-off rate lookup that fetches just the lookback window.
    pub async fn fetch_rate_on(
        &self,
        date: NaiveDate,
        from: &str,
        to: &str,
        lookback_days: u32,
    ) -> Lookup<FxRate> {
        let mut cache = PriceCache::new();
        self.prefetch(
            &mut cache,
            &[(from.to_uppercase(), to.to_uppercase())],
            lookback_start(date, lookback_days),
            date,
        )
        .await;
        self.rate_on(&cache, date, from, to, lookback_days)
    }
}
