use chrono::NaiveDate;
use log::Level;
use rust_decimal::Decimal;

use crate::models::position::PositionTable;
use crate::models::price::{Lookup, PriceCache};
use crate::models::valuation::{HoldingValue, Valuation};
use crate::services::currency_service::CurrencyService;

/// Values a position table at a date in one reporting currency.
///
/// Reads only from a prefetched [`PriceCache`]; it never calls a provider.
/// A symbol without a usable price or rate is skipped, so one bad symbol
/// cannot blank the whole valuation.
pub struct ValuationService {
    lookback_days: u32,
}

impl ValuationService {
    pub fn new(lookback_days: u32) -> Self {
        Self { lookback_days }
    }

    /// Total and per-asset-class value of the held positions on `as_of`.
    ///
    /// Positions with a net quantity ≤ 0 contribute nothing and do not show
    /// up in the breakdown. Skipped symbols are logged as warnings.
    pub fn value_positions(
        &self,
        positions: &PositionTable,
        as_of: NaiveDate,
        reporting_currency: &str,
        cache: &PriceCache,
        fx: &CurrencyService,
    ) -> Valuation {
        self.value_with(positions, as_of, reporting_currency, cache, fx, Level::Warn)
    }

    /// Same as [`value_positions`](Self::value_positions), logging skips at
    /// debug level. Used by the day-by-day replay, where a gap repeats for
    /// every day it lasts.
    pub(crate) fn value_positions_quiet(
        &self,
        positions: &PositionTable,
        as_of: NaiveDate,
        reporting_currency: &str,
        cache: &PriceCache,
        fx: &CurrencyService,
    ) -> Valuation {
        self.value_with(positions, as_of, reporting_currency, cache, fx, Level::Debug)
    }

    fn value_with(
        &self,
        positions: &PositionTable,
        as_of: NaiveDate,
        reporting_currency: &str,
        cache: &PriceCache,
        fx: &CurrencyService,
        skip_level: Level,
    ) -> Valuation {
        let mut valuation = Valuation::empty(as_of, reporting_currency);

        for position in positions.held() {
            let price = match cache.price_on(
                &position.symbol,
                position.asset_class,
                as_of,
                self.lookback_days,
            ) {
                Lookup::Found(p) => p,
                Lookup::DataGap => {
                    log::log!(
                        skip_level,
                        "No price for {} within {} days of {as_of}; counted as 0",
                        position.symbol,
                        self.lookback_days
                    );
                    valuation.skipped.push(position.symbol.clone());
                    continue;
                }
                Lookup::ProviderUnavailable => {
                    log::log!(
                        skip_level,
                        "Price provider unavailable for {}; skipped on {as_of}",
                        position.symbol
                    );
                    valuation.skipped.push(position.symbol.clone());
                    continue;
                }
            };

            let rate = match fx.rate_on(
                cache,
                as_of,
                &price.currency,
                reporting_currency,
                self.lookback_days,
            ) {
                Lookup::Found(rate) => rate,
                Lookup::DataGap | Lookup::ProviderUnavailable => {
                    log::log!(
                        skip_level,
                        "No {}/{reporting_currency} rate for {} on {as_of}; skipped",
                        price.currency,
                        position.symbol
                    );
                    valuation.skipped.push(position.symbol.clone());
                    continue;
                }
            };

            let value = position.net_quantity * price.price * rate.rate;
            valuation.estimated_fx |= rate.estimated;
            valuation.total += value;
            *valuation
                .breakdown
                .entry(position.asset_class)
                .or_insert(Decimal::ZERO) += value;
            valuation.holdings.push(HoldingValue {
                symbol: position.symbol.clone(),
                asset_class: position.asset_class,
                quantity: position.net_quantity,
                price: price.price,
                native_currency: price.currency.clone(),
                price_date: price.date,
                value,
            });
        }

        valuation
    }
}
