use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::CoreError;
use crate::models::asset::AssetClass;
use crate::models::price::{FxPoint, PricePoint};

/// Source of daily asset prices (Yahoo Finance, CoinCap, Alpha Vantage, ...).
///
/// Implementations are stateless capability objects: build one, wrap it in
/// the registry, share it. Error convention:
/// - `PriceNotAvailable` means the source answered but had no data;
/// - `Api` / `Network` mean the source could not be used at all.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors).
    fn name(&self) -> &str;

    /// Which asset classes this provider can price.
    fn supported_asset_classes(&self) -> Vec<AssetClass>;

    /// Daily closes for `symbol` within `[from, to]`, oldest first, each in
    /// the asset's native currency.
    async fn get_price_history(
        &self,
        symbol: &str,
        asset_class: AssetClass,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError>;

    /// Whether the ticker exists on this provider.
    async fn validate_symbol(&self, symbol: &str, asset_class: AssetClass)
        -> Result<bool, CoreError>;
}

/// Source of daily fiat exchange rates.
#[async_trait]
pub trait FxProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Daily `base`→`quote` rates within `[from, to]`, oldest first.
    async fn get_fx_history(
        &self,
        base: &str,
        quote: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<FxPoint>, CoreError>;
}
