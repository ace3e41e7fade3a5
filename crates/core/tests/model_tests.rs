use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::str::FromStr;

use mr_tracker_core::errors::CoreError;
use mr_tracker_core::models::asset::{normalize_currency, normalize_symbol, AssetClass};
use mr_tracker_core::models::ledger::{
    CashTransaction, Ledger, TransactionInput, TransactionKind,
};
use mr_tracker_core::models::operation::{InvestmentInput, InvestmentOperation, OperationKind};
use mr_tracker_core::models::position::{Position, PositionTable};
use mr_tracker_core::models::price::{lookback_start, DatedSeries, Lookup};
use mr_tracker_core::models::settings::{find_fallback_rate, FallbackRate, Settings};
use mr_tracker_core::models::valuation::{HistoryPoint, NetWorthPoint};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn tx(kind: TransactionKind, amount: Decimal, date: NaiveDate) -> CashTransaction {
    CashTransaction::new(
        "u1",
        &TransactionInput {
            kind,
            amount,
            description: "  padded  ".into(),
            category_id: None,
            occurred_on: date,
        },
    )
}

// ═══════════════════════════════════════════════════════════════════
//  AssetClass
// ═══════════════════════════════════════════════════════════════════

mod asset_class {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(AssetClass::Stock.to_string(), "Stock");
        assert_eq!(AssetClass::Etf.to_string(), "ETF");
        assert_eq!(AssetClass::Crypto.to_string(), "Crypto");
    }

    #[test]
    fn parse_is_lenient() {
        assert_eq!(AssetClass::from_str("stock").unwrap(), AssetClass::Stock);
        assert_eq!(AssetClass::from_str(" ETF ").unwrap(), AssetClass::Etf);
        assert_eq!(AssetClass::from_str("Crypto").unwrap(), AssetClass::Crypto);
        assert!(matches!(
            AssetClass::from_str("bond"),
            Err(CoreError::ValidationError(_))
        ));
    }

    #[test]
    fn serde_names() {
        assert_eq!(serde_json::to_string(&AssetClass::Etf).unwrap(), "\"ETF\"");
        let back: AssetClass = serde_json::from_str("\"Etf\"").unwrap();
        assert_eq!(back, AssetClass::Etf);
        let stock: AssetClass = serde_json::from_str("\"Stock\"").unwrap();
        assert_eq!(stock, AssetClass::Stock);
    }

    #[test]
    fn symbols_and_currencies() {
        assert_eq!(normalize_symbol("  vwce.de "), "VWCE.DE");
        assert_eq!(normalize_currency("usd").unwrap(), "USD");
        assert!(normalize_currency("US").is_err());
        assert!(normalize_currency("US1").is_err());
        assert!(normalize_currency("EURO").is_err());
    }
}

// ═══════════════════════════════════════════════════════════════════
//  InvestmentOperation
// ═══════════════════════════════════════════════════════════════════

mod operation {
    use super::*;

    fn input(kind: OperationKind, qty: Decimal) -> InvestmentInput {
        InvestmentInput {
            operation: kind,
            asset_class: AssetClass::Stock,
            symbol: " aapl ".into(),
            display_name: " Apple Inc. ".into(),
            quantity: qty,
            total_value: dec!(100),
            occurred_on: d(2025, 1, 10),
            venue: None,
            record_cash_outflow: false,
            currency: None,
        }
    }

    #[test]
    fn new_normalizes() {
        let op = InvestmentOperation::new("u1", &input(OperationKind::Buy, dec!(1)));
        assert_eq!(op.symbol, "AAPL");
        assert_eq!(op.display_name, "Apple Inc.");
        assert!(op.linked_transaction_id.is_none());
    }

    #[test]
    fn signed_quantity() {
        let buy = InvestmentOperation::new("u1", &input(OperationKind::Buy, dec!(2)));
        let sell = InvestmentOperation::new("u1", &input(OperationKind::Sell, dec!(2)));
        let unknown = InvestmentOperation::new("u1", &input(OperationKind::Unknown, dec!(2)));
        let zero = InvestmentOperation::new("u1", &input(OperationKind::Buy, dec!(0)));
        assert_eq!(buy.signed_quantity(), Some(dec!(2)));
        assert_eq!(sell.signed_quantity(), Some(dec!(-2)));
        assert_eq!(unknown.signed_quantity(), None);
        assert_eq!(zero.signed_quantity(), None);
    }

    #[test]
    fn unknown_kind_in_stored_data() {
        let kind: OperationKind = serde_json::from_str("\"Dividend\"").unwrap();
        assert_eq!(kind, OperationKind::Unknown);
        let buy: OperationKind = serde_json::from_str("\"Buy\"").unwrap();
        assert_eq!(buy, OperationKind::Buy);
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Ledger
// ═══════════════════════════════════════════════════════════════════

mod ledger {
    use super::*;

    #[test]
    fn transaction_sign_and_trim() {
        let t = tx(TransactionKind::Expense, dec!(12.5), d(2025, 1, 1));
        assert_eq!(t.signed_amount(), dec!(-12.5));
        assert_eq!(t.description, "padded");
        assert_eq!(
            tx(TransactionKind::Income, dec!(3), d(2025, 1, 1)).signed_amount(),
            dec!(3)
        );
    }

    #[test]
    fn empty_ledger() {
        let ledger = Ledger::new("u1");
        assert!(ledger.is_empty());
        assert_eq!(ledger.initial_balance(), Decimal::ZERO);
        assert_eq!(ledger.earliest_record_date(), None);
        assert_eq!(ledger.cash_balance_as_of(d(2025, 1, 1)), Decimal::ZERO);
    }

    #[test]
    fn earliest_record_spans_both_kinds() {
        let mut ledger = Ledger::new("u1");
        ledger
            .transactions
            .push(tx(TransactionKind::Income, dec!(1), d(2025, 3, 1)));
        assert_eq!(ledger.earliest_record_date(), Some(d(2025, 3, 1)));

        ledger.operations.push(InvestmentOperation::new(
            "u1",
            &InvestmentInput {
                operation: OperationKind::Buy,
                asset_class: AssetClass::Crypto,
                symbol: "BTC".into(),
                display_name: "Bitcoin".into(),
                quantity: dec!(0.1),
                total_value: dec!(4000),
                occurred_on: d(2025, 2, 1),
                venue: None,
                record_cash_outflow: false,
                currency: None,
            },
        ));
        assert_eq!(ledger.earliest_record_date(), Some(d(2025, 2, 1)));
    }

    #[test]
    fn cash_balance_and_ranges() {
        let mut ledger = Ledger::new("u1");
        ledger.transactions = vec![
            tx(TransactionKind::Income, dec!(500), d(2025, 1, 1)),
            tx(TransactionKind::Expense, dec!(200), d(2025, 1, 6)),
            tx(TransactionKind::Income, dec!(50), d(2025, 1, 6)),
        ];
        assert_eq!(ledger.cash_balance_as_of(d(2025, 1, 5)), dec!(500));
        assert_eq!(ledger.cash_balance_as_of(d(2025, 1, 6)), dec!(350));
        assert_eq!(
            ledger.total_in_range(TransactionKind::Income, d(2025, 1, 1), d(2025, 1, 6)),
            dec!(550)
        );
        assert_eq!(
            ledger.total_in_range(TransactionKind::Income, d(2025, 1, 2), d(2025, 1, 5)),
            Decimal::ZERO
        );
        assert_eq!(
            ledger.total_in_range(TransactionKind::Expense, d(2025, 1, 6), d(2025, 1, 6)),
            dec!(200)
        );
    }

    #[test]
    fn missing_collections_default_on_load() {
        let ledger: Ledger = serde_json::from_str(r#"{"user_id":"u1"}"#).unwrap();
        assert_eq!(ledger, Ledger::new("u1"));
    }
}

// ═══════════════════════════════════════════════════════════════════
//  PositionTable
// ═══════════════════════════════════════════════════════════════════

mod position_table {
    use super::*;

    #[test]
    fn missing_symbol_reads_zero_without_inserting() {
        let table = PositionTable::new();
        assert_eq!(table.quantity_or_zero("AAPL"), Decimal::ZERO);
        assert!(table.is_empty());
    }

    #[test]
    fn held_only_positive() {
        let table: PositionTable = vec![
            Position {
                symbol: "A".into(),
                asset_class: AssetClass::Stock,
                net_quantity: dec!(1),
            },
            Position {
                symbol: "B".into(),
                asset_class: AssetClass::Stock,
                net_quantity: dec!(0),
            },
            Position {
                symbol: "C".into(),
                asset_class: AssetClass::Crypto,
                net_quantity: dec!(-1),
            },
        ]
        .into_iter()
        .collect();
        let held: Vec<&str> = table.held().map(|p| p.symbol.as_str()).collect();
        assert_eq!(held, vec!["A"]);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn floored_adjust() {
        let mut table = PositionTable::new();
        table.adjust_floored("X", AssetClass::Stock, dec!(2));
        table.adjust_floored("X", AssetClass::Stock, dec!(-5));
        assert_eq!(table.quantity_or_zero("X"), Decimal::ZERO);
        table.adjust("X", AssetClass::Stock, dec!(-1));
        assert_eq!(table.quantity_or_zero("X"), dec!(-1));
    }
}

// ═══════════════════════════════════════════════════════════════════
//  DatedSeries / Lookup
// ═══════════════════════════════════════════════════════════════════

mod dated_series {
    use super::*;

    #[test]
    fn lookup_within_window() {
        let mut series = DatedSeries::new();
        series.insert(d(2025, 1, 3), 10);
        series.insert(d(2025, 1, 6), 11);

        assert_eq!(series.lookup(d(2025, 1, 6), 7), Some((d(2025, 1, 6), &11)));
        assert_eq!(series.lookup(d(2025, 1, 5), 7), Some((d(2025, 1, 3), &10)));
        assert_eq!(series.lookup(d(2025, 1, 2), 7), None);
        assert_eq!(series.lookup(d(2025, 1, 14), 7), None);
        assert_eq!(series.lookup(d(2025, 1, 13), 7), Some((d(2025, 1, 6), &11)));
        assert_eq!(series.first_date(), Some(d(2025, 1, 3)));
        assert_eq!(series.last_date(), Some(d(2025, 1, 6)));
    }

    #[test]
    fn insert_replaces() {
        let mut series = DatedSeries::new();
        series.insert(d(2025, 1, 3), 10);
        series.insert(d(2025, 1, 3), 12);
        assert_eq!(series.len(), 1);
        assert_eq!(series.lookup(d(2025, 1, 3), 0), Some((d(2025, 1, 3), &12)));
    }

    #[test]
    fn lookback_start_saturates() {
        assert_eq!(lookback_start(d(2025, 1, 8), 7), d(2025, 1, 1));
        assert_eq!(lookback_start(NaiveDate::MIN, 7), NaiveDate::MIN);
    }

    #[test]
    fn lookup_map() {
        assert_eq!(Lookup::Found(2).map(|v| v * 2), Lookup::Found(4));
        assert_eq!(Lookup::<i32>::DataGap.map(|v| v * 2), Lookup::DataGap);
        assert!(!Lookup::<i32>::ProviderUnavailable.is_found());
        assert_eq!(Lookup::<i32>::DataGap.found(), None);
    }
}

// ═══════════════════════════════════════════════════════════════════
//  Settings
// ═══════════════════════════════════════════════════════════════════

mod settings {
    use super::*;

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(s.reporting_currency, "EUR");
        assert_eq!(s.lookback_days, 7);
        assert_eq!(s.fallback_rate("USD", "EUR"), Some(dec!(0.85)));
        assert_eq!(s.computation_timeout_secs, Some(60));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s = Settings::from_json(r#"{"reporting_currency":"usd","lookback_days":3}"#).unwrap();
        assert_eq!(s.reporting_currency, "USD");
        assert_eq!(s.lookback_days, 3);
        assert_eq!(s.max_history_days, Settings::default().max_history_days);
    }

    #[test]
    fn empty_json_is_default() {
        assert_eq!(Settings::from_json("{}").unwrap(), Settings::default());
    }

    #[test]
    fn fallback_rates_from_json() {
        let s = Settings::from_json(
            r#"{"fallback_fx_rates":[{"from":"gbp","to":"eur","rate":1.2}]}"#,
        )
        .unwrap();
        assert_eq!(s.fallback_rate("GBP", "EUR"), Some(dec!(1.2)));
        assert_eq!(s.fallback_rate("USD", "EUR"), None);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(Settings::from_json(r#"{"reporting_currency":"E"}"#).is_err());
        assert!(Settings::from_json(r#"{"max_history_days":0}"#).is_err());
        assert!(Settings::from_json(
            r#"{"fallback_fx_rates":[{"from":"USD","to":"EUR","rate":0}]}"#
        )
        .is_err());
        assert!(Settings::from_json("not json").is_err());
    }

    #[test]
    fn json_roundtrip() {
        let s = Settings::default();
        let back = Settings::from_json(&s.to_json().unwrap()).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"lookback_days":10}"#).unwrap();
        assert_eq!(Settings::load_from_file(&path).unwrap().lookback_days, 10);
        assert!(matches!(
            Settings::load_from_file(dir.path().join("missing.json")),
            Err(CoreError::FileIO(_))
        ));
    }

    #[test]
    fn inverse_fallback_is_derived() {
        let rates = vec![FallbackRate {
            from: "USD".into(),
            to: "EUR".into(),
            rate: dec!(0.8),
        }];
        assert_eq!(find_fallback_rate(&rates, "eur", "usd"), Some(dec!(1.25)));
        assert_eq!(find_fallback_rate(&rates, "USD", "GBP"), None);
    }
}

// ═══════════════════════════════════════════════════════════════════
//  HistoryPoint
// ═══════════════════════════════════════════════════════════════════

mod history_point {
    use super::*;

    #[test]
    fn rounds_to_cents_and_formats_date() {
        let p = NetWorthPoint {
            date: d(2025, 1, 5),
            net_worth: dec!(1033.337),
            investment_value: dec!(12.3449),
            estimated_fx: false,
        };
        let row = HistoryPoint::from(&p);
        assert_eq!(row.date, "2025-01-05");
        assert_eq!(row.networth, dec!(1033.34));
        assert_eq!(row.investments, dec!(12.34));
    }

    #[test]
    fn zero_point() {
        let p = NetWorthPoint::zero(d(2025, 1, 1));
        assert!(p.net_worth.is_zero() && p.investment_value.is_zero() && !p.estimated_fx);
    }
}
