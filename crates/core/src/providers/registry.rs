use std::collections::HashMap;

use crate::models::asset::AssetClass;

use super::alphavantage::AlphaVantageProvider;
use super::coincap::CoinCapProvider;
use super::frankfurter::FrankfurterProvider;
use super::traits::{FxProvider, PriceProvider};
use super::yahoo_finance::YahooFinanceProvider;

/// Registry of all available market data providers.
///
/// Routes price requests to providers by `AssetClass`, in registration
/// order (the first is primary, the rest are fallbacks), and holds the FX
/// providers. Built once and shared by every computation.
pub struct ProviderRegistry {
    providers: Vec<Box<dyn PriceProvider>>,
    fx_providers: Vec<Box<dyn FxProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            fx_providers: Vec::new(),
        }
    }

    /// Create a registry with all default providers pre-configured.
    pub fn new_with_defaults(api_keys: &HashMap<String, String>) -> Self {
        let mut registry = Self::new();

        // Yahoo Finance: stocks and ETFs, no API key (primary)
        match YahooFinanceProvider::new() {
            Ok(yahoo) => registry.register(Box::new(yahoo)),
            Err(e) => log::warn!("Yahoo Finance provider disabled: {e}"),
        }

        // Alpha Vantage: stocks and ETFs, requires API key (fallback)
        if let Some(key) = api_keys.get("alphavantage") {
            registry.register(Box::new(AlphaVantageProvider::new(key.clone())));
        }

        // CoinCap: crypto, no API key
        registry.register(Box::new(CoinCapProvider::new()));

        // Frankfurter: ECB reference rates, no API key
        registry.register_fx(Box::new(FrankfurterProvider::new()));

        registry
    }

    /// Register a new price provider.
    pub fn register(&mut self, provider: Box<dyn PriceProvider>) {
        self.providers.push(provider);
    }

    /// Register a new FX provider.
    pub fn register_fx(&mut self, provider: Box<dyn FxProvider>) {
        self.fx_providers.push(provider);
    }

    /// All providers that support the given asset class, by priority.
    pub fn get_providers_for(&self, asset_class: AssetClass) -> Vec<&dyn PriceProvider> {
        self.providers
            .iter()
            .filter(|p| p.supported_asset_classes().contains(&asset_class))
            .map(|p| p.as_ref())
            .collect()
    }

    pub fn fx_providers(&self) -> Vec<&dyn FxProvider> {
        self.fx_providers.iter().map(|p| p.as_ref()).collect()
    }

    pub fn has_provider_for(&self, asset_class: AssetClass) -> bool {
        self.providers
            .iter()
            .any(|p| p.supported_asset_classes().contains(&asset_class))
    }

    pub fn provider_names(&self, asset_class: AssetClass) -> Vec<String> {
        self.get_providers_for(asset_class)
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
