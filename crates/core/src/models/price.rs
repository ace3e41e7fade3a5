use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::asset::{normalize_symbol, AssetClass};

/// A closing price on a date, in the asset's native currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: Decimal,
    pub currency: String,
}

/// An exchange rate on a date: 1 unit of base = `rate` units of quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FxPoint {
    pub date: NaiveDate,
    pub rate: Decimal,
}

/// Outcome of a dated market-data lookup.
///
/// Keeps the two ways a lookup can come back empty apart, so callers apply
/// the matching fallback instead of catching everything the same way.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    /// The source answered, but had nothing inside the lookback window.
    DataGap,
    /// The source could not be reached at all.
    ProviderUnavailable,
}

impl<T> Lookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Found(v) => Lookup::Found(f(v)),
            Lookup::DataGap => Lookup::DataGap,
            Lookup::ProviderUnavailable => Lookup::ProviderUnavailable,
        }
    }
}

/// First date a lookup on `date` may fall back to.
pub fn lookback_start(date: NaiveDate, lookback_days: u32) -> NaiveDate {
    date.checked_sub_days(Days::new(u64::from(lookback_days)))
        .unwrap_or(NaiveDate::MIN)
}

/// Date-keyed series with bounded backward-fill.
///
/// This is the single lookback implementation shared by price and FX lookups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatedSeries<T> {
    points: BTreeMap<NaiveDate, T>,
}

impl<T> DatedSeries<T> {
    pub fn new() -> Self {
        Self {
            points: BTreeMap::new(),
        }
    }

    /// Insert or replace the value for `date`.
    pub fn insert(&mut self, date: NaiveDate, value: T) {
        self.points.insert(date, value);
    }

    /// Value on `date`, or the most recent one at most `lookback_days` earlier.
    pub fn lookup(&self, date: NaiveDate, lookback_days: u32) -> Option<(NaiveDate, &T)> {
        self.points
            .range(lookback_start(date, lookback_days)..=date)
            .next_back()
            .map(|(d, v)| (*d, v))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.keys().next_back().copied()
    }
}

/// Per-symbol price cache key. Points inside carry date and currency.
pub type PriceKey = (String, AssetClass);

/// FX cache key: (base, quote).
pub type FxKey = (String, String);

#[derive(Debug, Clone, PartialEq)]
enum Slot<T> {
    Loaded(DatedSeries<T>),
    Unavailable,
}

/// Market data fetched for one computation.
///
/// Built once before a valuation or a series replay, then only read. It is
/// never shared between computations, so nothing here is locked.
#[derive(Debug, Clone, Default)]
pub struct PriceCache {
    prices: HashMap<PriceKey, Slot<PricePoint>>,
    rates: HashMap<FxKey, Slot<FxPoint>>,
}

impl PriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn price_key(symbol: &str, asset_class: AssetClass) -> PriceKey {
        (normalize_symbol(symbol), asset_class)
    }

    fn fx_key(base: &str, quote: &str) -> FxKey {
        (base.trim().to_uppercase(), quote.trim().to_uppercase())
    }

    /// Store a fetched price history. An empty history is a valid answer.
    pub fn set_prices(&mut self, symbol: &str, asset_class: AssetClass, points: Vec<PricePoint>) {
        let mut series = match self.prices.remove(&Self::price_key(symbol, asset_class)) {
            Some(Slot::Loaded(s)) => s,
            _ => DatedSeries::new(),
        };
        for p in points {
            series.insert(p.date, p);
        }
        self.prices
            .insert(Self::price_key(symbol, asset_class), Slot::Loaded(series));
    }

    /// Record that no provider could be reached for this symbol.
    pub fn mark_prices_unavailable(&mut self, symbol: &str, asset_class: AssetClass) {
        self.prices
            .insert(Self::price_key(symbol, asset_class), Slot::Unavailable);
    }

    pub fn set_rates(&mut self, base: &str, quote: &str, points: Vec<FxPoint>) {
        let key = Self::fx_key(base, quote);
        let mut series = match self.rates.remove(&key) {
            Some(Slot::Loaded(s)) => s,
            _ => DatedSeries::new(),
        };
        for p in points {
            series.insert(p.date, p);
        }
        self.rates.insert(key, Slot::Loaded(series));
    }

    pub fn mark_rates_unavailable(&mut self, base: &str, quote: &str) {
        self.rates.insert(Self::fx_key(base, quote), Slot::Unavailable);
    }

    pub fn has_prices(&self, symbol: &str, asset_class: AssetClass) -> bool {
        self.prices
            .contains_key(&Self::price_key(symbol, asset_class))
    }

    pub fn has_rates(&self, base: &str, quote: &str) -> bool {
        self.rates.contains_key(&Self::fx_key(base, quote))
    }

    /// Backward-filled price lookup. A symbol that was never fetched reads as
    /// unavailable.
    pub fn price_on(
        &self,
        symbol: &str,
        asset_class: AssetClass,
        date: NaiveDate,
        lookback_days: u32,
    ) -> Lookup<&PricePoint> {
        match self.prices.get(&Self::price_key(symbol, asset_class)) {
            Some(Slot::Loaded(series)) => match series.lookup(date, lookback_days) {
                Some((_, p)) => Lookup::Found(p),
                None => Lookup::DataGap,
            },
            Some(Slot::Unavailable) | None => Lookup::ProviderUnavailable,
        }
    }

    /// Backward-filled FX lookup, same policy as [`price_on`](Self::price_on).
    pub fn rate_on(
        &self,
        base: &str,
        quote: &str,
        date: NaiveDate,
        lookback_days: u32,
    ) -> Lookup<&FxPoint> {
        match self.rates.get(&Self::fx_key(base, quote)) {
            Some(Slot::Loaded(series)) => match series.lookup(date, lookback_days) {
                Some((_, p)) => Lookup::Found(p),
                None => Lookup::DataGap,
            },
            Some(Slot::Unavailable) | None => Lookup::ProviderUnavailable,
        }
    }

    /// Native currencies seen across all loaded price histories.
    pub fn native_currencies(&self) -> Vec<String> {
        let mut currencies: Vec<String> = self
            .prices
            .values()
            .filter_map(|slot| match slot {
                Slot::Loaded(series) => Some(series.points.values().map(|p| p.currency.clone())),
                Slot::Unavailable => None,
            })
            .flatten()
            .collect();
        currencies.sort();
        currencies.dedup();
        currencies
    }

    /// Total number of cached price and rate points.
    pub fn total_entries(&self) -> usize {
        let prices: usize = self
            .prices
            .values()
            .map(|s| match s {
                Slot::Loaded(series) => series.len(),
                Slot::Unavailable => 0,
            })
            .sum();
        let rates: usize = self
            .rates
            .values()
            .map(|s| match s {
                Slot::Loaded(series) => series.len(),
                Slot::Unavailable => 0,
            })
            .sum();
        prices + rates
    }
}
