use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap};

use crate::errors::CoreError;
use crate::models::asset::AssetClass;
use crate::models::ledger::Ledger;
use crate::models::operation::InvestmentOperation;
use crate::models::position::PositionTable;
use crate::models::price::PriceCache;
use crate::models::valuation::NetWorthPoint;
use crate::services::currency_service::CurrencyService;
use crate::services::position_service::PositionService;
use crate::services::valuation_service::ValuationService;

/// Replays a ledger day by day into a net-worth series.
///
/// For each day in `[series_start, end]`:
/// 1. Add the day's income and subtract its expenses from the running cash
///    balance (seeded with the initial balance on the earliest record date)
/// 2. Apply the day's buys and sells to the running positions, floored at 0
/// 3. Value the positions on that day from the prefetched cache
/// 4. Emit `cash + investments`
///
/// Days before the earliest record are emitted as zero. Incremental, so the
/// cost is O(days × held symbols + records).
pub struct HistoryService {
    position_service: PositionService,
    valuation_service: ValuationService,
}

impl HistoryService {
    pub fn new(lookback_days: u32) -> Self {
        Self {
            position_service: PositionService::new(),
            valuation_service: ValuationService::new(lookback_days),
        }
    }

    /// First date of the series for a request starting at `start`.
    pub fn series_start(ledger: &Ledger, start: NaiveDate) -> NaiveDate {
        ledger
            .earliest_record_date()
            .map(|earliest| earliest.min(start))
            .unwrap_or(start)
    }

    /// Every `(symbol, asset_class)` the ledger ever trades, deduplicated and sorted.
    pub fn traded_symbols(ledger: &Ledger) -> Vec<(String, AssetClass)> {
        ledger
            .operations
            .iter()
            .filter(|op| op.signed_quantity().is_some())
            .map(|op| (op.symbol.clone(), op.asset_class))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// One point per calendar day from the series start to `end`, ascending.
    ///
    /// `cache` must already hold the price and FX histories for the whole
    /// range (see [`traded_symbols`](Self::traded_symbols)); nothing is
    /// fetched here.
    pub fn build_series(
        &self,
        ledger: &Ledger,
        start: NaiveDate,
        end: NaiveDate,
        reporting_currency: &str,
        cache: &PriceCache,
        fx: &CurrencyService,
    ) -> Result<Vec<NetWorthPoint>, CoreError> {
        if start > end {
            return Err(CoreError::ValidationError(format!(
                "Start date {start} is after end date {end}"
            )));
        }

        let series_start = Self::series_start(ledger, start);
        let Some(earliest) = ledger.earliest_record_date() else {
            // No ledger yet: the whole range is zero
            return Ok(series_start
                .iter_days()
                .take_while(|d| *d <= end)
                .map(NetWorthPoint::zero)
                .collect());
        };

        // Bucket records by calendar day
        let mut cash_by_day: HashMap<NaiveDate, Decimal> = HashMap::new();
        for tx in &ledger.transactions {
            *cash_by_day.entry(tx.occurred_on).or_insert(Decimal::ZERO) += tx.signed_amount();
        }
        let mut ops_by_day: HashMap<NaiveDate, Vec<&InvestmentOperation>> = HashMap::new();
        for op in &ledger.operations {
            ops_by_day.entry(op.occurred_on).or_default().push(op);
        }

        let mut points = Vec::new();
        let mut cash = Decimal::ZERO;
        let mut positions = PositionTable::new();
        let mut skipped: BTreeSet<String> = BTreeSet::new();

        for day in series_start.iter_days().take_while(|d| *d <= end) {
            if day < earliest {
                points.push(NetWorthPoint::zero(day));
                continue;
            }
            if day == earliest {
                cash = ledger.initial_balance();
            }

            if let Some(delta) = cash_by_day.get(&day) {
                cash += *delta;
            }
            if let Some(ops) = ops_by_day.get(&day) {
                for op in ops {
                    self.position_service.apply_operation(&mut positions, op);
                }
            }

            let valuation = self.valuation_service.value_positions_quiet(
                &positions,
                day,
                reporting_currency,
                cache,
                fx,
            );
            skipped.extend(valuation.skipped.iter().cloned());

            points.push(NetWorthPoint {
                date: day,
                net_worth: cash + valuation.total,
                investment_value: valuation.total,
                estimated_fx: valuation.estimated_fx,
            });
        }

        if !skipped.is_empty() {
            log::warn!(
                "Net-worth series {series_start}..{end}: no usable price on some days for {}",
                skipped.into_iter().collect::<Vec<_>>().join(", ")
            );
        }

        Ok(points)
    }
}
