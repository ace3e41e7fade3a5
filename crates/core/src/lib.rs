pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use errors::CoreError;
use models::{
    analytics::DashboardSummary,
    asset::AssetClass,
    ledger::{
        CashTransaction, Category, Ledger, OnboardingData, TransactionInput, TransactionKind,
    },
    operation::{CashOutflow, InvestmentInput, InvestmentOperation, OperationKind},
    position::PositionTable,
    price::{lookback_start, Lookup, PriceCache, PricePoint},
    settings::Settings,
    valuation::{HistoryPoint, NetWorthPoint, Valuation},
};
use providers::registry::ProviderRegistry;
use services::{
    analytics_service::AnalyticsService,
    currency_service::{CurrencyService, FxRate},
    history_service::HistoryService,
    ledger_service::LedgerService,
    position_service::PositionService,
    price_service::PriceService,
    valuation_service::ValuationService,
};
use storage::{LedgerStore, MemoryLedgerStore};

/// Parse an ISO-8601 calendar date (`YYYY-MM-DD`).
pub fn parse_date(value: &str) -> Result<NaiveDate, CoreError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| CoreError::InvalidDateFormat {
        value: value.to_string(),
    })
}

/// Main entry point for the MR Tracker core library.
///
/// Owns the ledger store, the provider registry (built once, shared by every
/// computation) and the settings. Each valuation reads one ledger snapshot,
/// fetches the market data it needs into a fresh cache, and runs under the
/// configured timeout.
#[must_use]
pub struct FinanceTracker {
    store: Box<dyn LedgerStore>,
    registry: Arc<ProviderRegistry>,
    settings: Settings,
    ledger_service: LedgerService,
    position_service: PositionService,
    price_service: PriceService,
    currency_service: CurrencyService,
    analytics_service: AnalyticsService,
}

impl std::fmt::Debug for FinanceTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinanceTracker")
            .field("settings", &self.settings)
            .field("stock_providers", &self.registry.provider_names(AssetClass::Stock))
            .field("crypto_providers", &self.registry.provider_names(AssetClass::Crypto))
            .finish()
    }
}

impl FinanceTracker {
    /// Tracker over `store` with the default market data providers.
    pub fn new(store: Box<dyn LedgerStore>, settings: Settings) -> Result<Self, CoreError> {
        let registry = Arc::new(ProviderRegistry::new_with_defaults(&settings.api_keys));
        Self::with_registry(store, registry, settings)
    }

    /// Tracker with an explicit provider registry.
    pub fn with_registry(
        store: Box<dyn LedgerStore>,
        registry: Arc<ProviderRegistry>,
        settings: Settings,
    ) -> Result<Self, CoreError> {
        let settings = settings.validated()?;
        Ok(Self::build(store, registry, settings))
    }

    /// In-memory tracker with default providers and settings.
    pub fn in_memory() -> Self {
        let settings = Settings::default();
        let registry = Arc::new(ProviderRegistry::new_with_defaults(&settings.api_keys));
        Self::build(Box::new(MemoryLedgerStore::new()), registry, settings)
    }

    fn build(
        store: Box<dyn LedgerStore>,
        registry: Arc<ProviderRegistry>,
        settings: Settings,
    ) -> Self {
        Self {
            store,
            price_service: PriceService::new(registry.clone()),
            currency_service: CurrencyService::new(
                registry.clone(),
                settings.fallback_fx_rates.clone(),
            ),
            registry,
            settings,
            ledger_service: LedgerService::new(),
            position_service: PositionService::new(),
            analytics_service: AnalyticsService::new(),
        }
    }

    // ── Settings ────────────────────────────────────────────────────

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Set the reporting currency (e.g., "EUR", "USD").
    /// Currency code must be a 3-letter alphabetic string.
    pub fn set_reporting_currency(&mut self, currency: &str) -> Result<(), CoreError> {
        self.settings.set_reporting_currency(currency)
    }

    // ── Onboarding & ledger ─────────────────────────────────────────

    /// Set the initial balance and create the user's categories.
    pub fn complete_onboarding(
        &self,
        user_id: &str,
        data: &OnboardingData,
    ) -> Result<(), CoreError> {
        self.mutate(user_id, |service, ledger| {
            service.complete_onboarding(ledger, data)
        })
    }

    pub fn list_categories(
        &self,
        user_id: &str,
        kind: Option<TransactionKind>,
    ) -> Result<Vec<Category>, CoreError> {
        let ledger = self.store.load(user_id)?;
        Ok(self
            .ledger_service
            .list_categories(&ledger, kind)
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn add_transaction(
        &self,
        user_id: &str,
        input: &TransactionInput,
    ) -> Result<CashTransaction, CoreError> {
        self.mutate(user_id, |service, ledger| service.add_transaction(ledger, input))
    }

    pub fn update_transaction(
        &self,
        user_id: &str,
        id: Uuid,
        input: &TransactionInput,
    ) -> Result<CashTransaction, CoreError> {
        self.mutate(user_id, |service, ledger| {
            service.update_transaction(ledger, id, input)
        })
    }

    pub fn delete_transaction(&self, user_id: &str, id: Uuid) -> Result<(), CoreError> {
        self.mutate(user_id, |service, ledger| service.delete_transaction(ledger, id))
    }

    /// Cash transactions, newest first.
    pub fn list_transactions(&self, user_id: &str) -> Result<Vec<CashTransaction>, CoreError> {
        let ledger = self.store.load(user_id)?;
        Ok(self
            .ledger_service
            .list_transactions(&ledger)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Record a buy or sell (and, for a Buy, optionally its cash outflow).
    ///
    /// The outflow is booked in the reporting currency: a `total_value` in
    /// another currency is converted at the rate of the trade date.
    pub async fn add_investment(
        &self,
        user_id: &str,
        input: &InvestmentInput,
    ) -> Result<InvestmentOperation, CoreError> {
        let outflow = if input.record_cash_outflow {
            self.cash_outflow(input).await?
        } else {
            None
        };
        self.mutate(user_id, |service, ledger| {
            service.add_operation_with_outflow(ledger, input, outflow.as_ref())
        })
    }

    pub async fn update_investment(
        &self,
        user_id: &str,
        id: Uuid,
        input: &InvestmentInput,
    ) -> Result<InvestmentOperation, CoreError> {
        let linked = self
            .store
            .load(user_id)?
            .operations
            .iter()
            .any(|op| op.id == id && op.linked_transaction_id.is_some());
        let outflow = if linked || input.record_cash_outflow {
            self.cash_outflow(input).await?
        } else {
            None
        };
        self.mutate(user_id, |service, ledger| {
            service.update_operation_with_outflow(ledger, id, input, outflow.as_ref())
        })
    }

    pub fn delete_investment(&self, user_id: &str, id: Uuid) -> Result<(), CoreError> {
        self.mutate(user_id, |service, ledger| service.delete_operation(ledger, id))
    }

    /// Investment operations, newest first.
    pub fn list_investments(
        &self,
        user_id: &str,
    ) -> Result<Vec<InvestmentOperation>, CoreError> {
        let ledger = self.store.load(user_id)?;
        Ok(self
            .ledger_service
            .list_operations(&ledger)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Delete every record of the user: account, categories, transactions
    /// and operations.
    pub fn wipe(&self, user_id: &str) -> Result<(), CoreError> {
        self.store.remove(user_id)?;
        log::info!("Wiped ledger of {user_id}");
        Ok(())
    }

    // Load, apply, save. Nothing is written when `f` fails.
    fn mutate<T>(
        &self,
        user_id: &str,
        f: impl FnOnce(&LedgerService, &mut Ledger) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        let mut ledger = self.store.load(user_id)?;
        let result = f(&self.ledger_service, &mut ledger)?;
        self.store.save(&ledger)?;
        Ok(result)
    }

    // ── Market data ─────────────────────────────────────────────────

    /// Whether the providers know this ticker.
    pub async fn validate_ticker(
        &self,
        symbol: &str,
        asset_class: AssetClass,
    ) -> Result<bool, CoreError> {
        self.price_service.validate_symbol(symbol, asset_class).await
    }

    /// Price of `symbol` on `date`, backward-filled within the lookback window.
    pub async fn price_on(
        &self,
        symbol: &str,
        asset_class: AssetClass,
        date: &str,
    ) -> Result<Lookup<PricePoint>, CoreError> {
        let date = parse_date(date)?;
        Ok(self
            .price_service
            .price_on(symbol, asset_class, date, self.settings.lookback_days)
            .await)
    }

    /// `from`→`to` rate on `date`; falls back to the configured rate (flagged
    /// as estimated) only when the FX provider cannot be reached.
    pub async fn rate_on(
        &self,
        date: &str,
        from: &str,
        to: &str,
    ) -> Result<Lookup<FxRate>, CoreError> {
        let date = parse_date(date)?;
        let from = models::asset::normalize_currency(from)?;
        let to = models::asset::normalize_currency(to)?;
        Ok(self
            .currency_service
            .fetch_rate_on(date, &from, &to, self.settings.lookback_days)
            .await)
    }

    #[must_use]
    pub fn is_provider_available(&self, asset_class: AssetClass) -> bool {
        self.price_service.has_provider_for(asset_class)
    }

    #[must_use]
    pub fn get_provider_names(&self, asset_class: AssetClass) -> Vec<String> {
        self.price_service.get_provider_names(asset_class)
    }

    // ── Valuation ───────────────────────────────────────────────────

    /// Net quantity per symbol over the operations dated strictly before `cutoff`.
    pub fn positions_as_of(&self, user_id: &str, cutoff: &str) -> Result<PositionTable, CoreError> {
        let cutoff = parse_date(cutoff)?;
        let ledger = self.store.load(user_id)?;
        Ok(self
            .position_service
            .positions_as_of(&ledger.operations, cutoff))
    }

    /// Market value of the user's holdings at the end of `as_of`, operations
    /// dated `as_of` included.
    pub async fn portfolio_value(&self, user_id: &str, as_of: &str) -> Result<Valuation, CoreError> {
        let as_of = parse_date(as_of)?;
        let cutoff = Self::day_after(as_of)?;
        let ledger = self.store.load(user_id)?;
        self.with_timeout(async {
            let positions = self
                .position_service
                .positions_as_of(&ledger.operations, cutoff);
            let symbols: Vec<(String, AssetClass)> = positions
                .held()
                .map(|p| (p.symbol.clone(), p.asset_class))
                .collect();
            let cache = self.load_market_data(&symbols, as_of, as_of).await;
            Ok(ValuationService::new(self.settings.lookback_days).value_positions(
                &positions,
                as_of,
                &self.settings.reporting_currency,
                &cache,
                &self.currency_service,
            ))
        })
        .await
    }

    /// Daily net-worth series, full precision. See [`HistoryService`].
    pub async fn networth_series(
        &self,
        user_id: &str,
        start: &str,
        end: &str,
    ) -> Result<Vec<NetWorthPoint>, CoreError> {
        let start = parse_date(start)?;
        let end = parse_date(end)?;
        self.validate_range(start, end)?;
        let ledger = self.store.load(user_id)?;

        self.with_timeout(async {
            let series_start = HistoryService::series_start(&ledger, start);
            let symbols = HistoryService::traded_symbols(&ledger);
            let cache = self.load_market_data(&symbols, series_start, end).await;
            HistoryService::new(self.settings.lookback_days).build_series(
                &ledger,
                start,
                end,
                &self.settings.reporting_currency,
                &cache,
                &self.currency_service,
            )
        })
        .await
    }

    /// History endpoint: one `{date, networth, investments}` row per day,
    /// values rounded to cents.
    pub async fn networth_history(
        &self,
        user_id: &str,
        start: &str,
        end: &str,
    ) -> Result<Vec<HistoryPoint>, CoreError> {
        let series = self.networth_series(user_id, start, end).await?;
        Ok(series.iter().map(HistoryPoint::from).collect())
    }

    /// Dashboard headline figures as of today (UTC).
    pub async fn dashboard_summary(&self, user_id: &str) -> Result<DashboardSummary, CoreError> {
        let today = chrono::Utc::now().date_naive();
        self.dashboard_summary_for(user_id, today).await
    }

    /// Dashboard headline figures as of `today` (ISO date).
    pub async fn dashboard_summary_on(
        &self,
        user_id: &str,
        today: &str,
    ) -> Result<DashboardSummary, CoreError> {
        let today = parse_date(today)?;
        self.dashboard_summary_for(user_id, today).await
    }

    async fn dashboard_summary_for(
        &self,
        user_id: &str,
        today: NaiveDate,
    ) -> Result<DashboardSummary, CoreError> {
        let ledger = self.store.load(user_id)?;
        let month_ago = today
            .checked_sub_days(chrono::Days::new(services::analytics_service::PERIOD_DAYS))
            .ok_or_else(|| CoreError::InvalidDateFormat {
                value: today.to_string(),
            })?;

        self.with_timeout(async {
            let series_start = HistoryService::series_start(&ledger, month_ago);
            let symbols = HistoryService::traded_symbols(&ledger);
            let cache = self.load_market_data(&symbols, series_start, today).await;

            let series = HistoryService::new(self.settings.lookback_days).build_series(
                &ledger,
                month_ago,
                today,
                &self.settings.reporting_currency,
                &cache,
                &self.currency_service,
            )?;

            Ok::<_, CoreError>(
                self.analytics_service
                    .dashboard_summary(&ledger, today, &series),
            )
        })
        .await
    }

    // ── Internals ───────────────────────────────────────────────────

    /// Reporting-currency amount a Buy's cash outflow books, or `None` when
    /// `total_value` is already in the reporting currency.
    async fn cash_outflow(&self, input: &InvestmentInput) -> Result<Option<CashOutflow>, CoreError> {
        if input.operation != OperationKind::Buy || input.total_value <= Decimal::ZERO {
            return Ok(None);
        }
        self.position_service.validate_operation(input)?;
        self.with_timeout(async {
            let lookback = self.settings.lookback_days;
            let reporting = &self.settings.reporting_currency;
            let date = input.occurred_on;

            let currency = match &input.currency {
                Some(currency) => models::asset::normalize_currency(currency)?,
                None => {
                    let symbol = models::asset::normalize_symbol(&input.symbol);
                    match self
                        .price_service
                        .price_on(&symbol, input.asset_class, date, lookback)
                        .await
                    {
                        Lookup::Found(point) => point.currency,
                        Lookup::DataGap => {
                            return Err(CoreError::ValidationError(format!(
                                "No market price for {symbol} around {date} to tell its currency; \
                                 set the currency of the total value"
                            )))
                        }
                        Lookup::ProviderUnavailable => {
                            return Err(CoreError::ProviderUnavailable {
                                target: symbol,
                                reason: "currency of the total value is unknown".into(),
                            })
                        }
                    }
                }
            };
            if &currency == reporting {
                return Ok(None);
            }

            let fx = self
                .currency_service
                .fetch_rate_on(date, &currency, reporting, lookback)
                .await
                .found()
                .ok_or_else(|| CoreError::ProviderUnavailable {
                    target: format!("{currency}/{reporting}"),
                    reason: format!("no exchange rate around {date}"),
                })?;
            if fx.estimated {
                log::warn!("Cash outflow {currency}→{reporting} on {date} uses the fallback rate");
            }
            Ok::<_, CoreError>(Some(CashOutflow {
                amount: (input.total_value * fx.rate).round_dp(2),
                native: Some(format!("{} {currency}", input.total_value.normalize())),
            }))
        })
        .await
    }

    /// Fetch price histories for `symbols` and the FX rates their native
    /// currencies need, covering `[from - lookback, to]`.
    async fn load_market_data(
        &self,
        symbols: &[(String, AssetClass)],
        from: NaiveDate,
        to: NaiveDate,
    ) -> PriceCache {
        let mut cache = PriceCache::new();
        if symbols.is_empty() {
            return cache;
        }

        let fetch_from = lookback_start(from, self.settings.lookback_days);
        self.price_service
            .prefetch(&mut cache, symbols, fetch_from, to)
            .await;

        let reporting = &self.settings.reporting_currency;
        let pairs: Vec<(String, String)> = cache
            .native_currencies()
            .into_iter()
            .filter(|c| c != reporting)
            .map(|c| (c, reporting.clone()))
            .collect();
        self.currency_service
            .prefetch(&mut cache, &pairs, fetch_from, to)
            .await;

        log::debug!(
            "Market data for {} symbols, {fetch_from}..{to}: {} points",
            symbols.len(),
            cache.total_entries()
        );
        cache
    }

    async fn with_timeout<T>(
        &self,
        computation: impl Future<Output = Result<T, CoreError>>,
    ) -> Result<T, CoreError> {
        match self.settings.computation_timeout_secs {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), computation)
                .await
                .map_err(|_| CoreError::Timeout(secs))?,
            None => computation.await,
        }
    }

    fn validate_range(&self, start: NaiveDate, end: NaiveDate) -> Result<(), CoreError> {
        if start > end {
            return Err(CoreError::ValidationError(format!(
                "Start date {start} is after end date {end}"
            )));
        }
        let range_days = (end - start).num_days();
        if range_days > self.settings.max_history_days {
            return Err(CoreError::ValidationError(format!(
                "History range of {range_days} days exceeds maximum of {} days",
                self.settings.max_history_days
            )));
        }
        Ok(())
    }

    fn day_after(date: NaiveDate) -> Result<NaiveDate, CoreError> {
        date.succ_opt().ok_or_else(|| CoreError::InvalidDateFormat {
            value: date.to_string(),
        })
    }
}
