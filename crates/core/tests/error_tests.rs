// ═══════════════════════════════════════════════════════════════════
// Error Tests: CoreError variants, Display formatting, From impls
// ═══════════════════════════════════════════════════════════════════

use mr_tracker_core::errors::CoreError;

// ── Display formatting ──────────────────────────────────────────────

mod display {
    use super::*;

    #[test]
    fn file_io() {
        let err = CoreError::FileIO("disk full".into());
        assert_eq!(err.to_string(), "File I/O error: disk full");
    }

    #[test]
    fn api() {
        let err = CoreError::Api {
            provider: "CoinCap".into(),
            message: "HTTP 429".into(),
        };
        assert_eq!(err.to_string(), "API error (CoinCap): HTTP 429");
    }

    #[test]
    fn no_provider() {
        let err = CoreError::NoProvider("Crypto".into());
        assert_eq!(err.to_string(), "No provider available for Crypto");
    }

    #[test]
    fn provider_unavailable() {
        let err = CoreError::ProviderUnavailable {
            target: "BTC".into(),
            reason: "Network error: timeout".into(),
        };
        assert_eq!(
            err.to_string(),
            "Market data provider unavailable for BTC: Network error: timeout"
        );
    }

    #[test]
    fn price_not_available() {
        let err = CoreError::PriceNotAvailable {
            symbol: "AAPL".into(),
            currency: "USD".into(),
            date: "2025-01-10".into(),
        };
        assert_eq!(
            err.to_string(),
            "Price not available for AAPL in USD on 2025-01-10"
        );
    }

    #[test]
    fn invalid_date_format() {
        let err = CoreError::InvalidDateFormat {
            value: "10/01/2025".into(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid date '10/01/2025': expected ISO-8601 (YYYY-MM-DD)"
        );
    }

    #[test]
    fn validation() {
        let err = CoreError::ValidationError("Amount must be positive, got 0".into());
        assert_eq!(
            err.to_string(),
            "Validation failed: Amount must be positive, got 0"
        );
    }

    #[test]
    fn record_not_found() {
        let err = CoreError::RecordNotFound("transaction 42".into());
        assert_eq!(err.to_string(), "Record not found: transaction 42");
    }

    #[test]
    fn timeout() {
        assert_eq!(
            CoreError::Timeout(30).to_string(),
            "Computation timed out after 30s"
        );
    }
}

// ── Provider failure classification ─────────────────────────────────

mod provider_failure {
    use super::*;

    #[test]
    fn unreachable_sources_count() {
        let failures = [
            CoreError::Api {
                provider: "Yahoo Finance".into(),
                message: "503".into(),
            },
            CoreError::Network("connection reset".into()),
            CoreError::NoProvider("Stock".into()),
            CoreError::ProviderUnavailable {
                target: "AAPL".into(),
                reason: "all down".into(),
            },
        ];
        for err in failures {
            assert!(err.is_provider_failure(), "{err:?}");
        }
    }

    #[test]
    fn missing_data_is_not_a_failure() {
        let not_failures = [
            CoreError::PriceNotAvailable {
                symbol: "AAPL".into(),
                currency: "USD".into(),
                date: "2025-01-10".into(),
            },
            CoreError::ValidationError("x".into()),
            CoreError::Timeout(5),
            CoreError::FileIO("x".into()),
        ];
        for err in not_failures {
            assert!(!err.is_provider_failure(), "{err:?}");
        }
    }
}

// ── From impls ──────────────────────────────────────────────────────

mod from_impls {
    use super::*;

    #[test]
    fn from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let core_err: CoreError = io_err.into();
        match &core_err {
            CoreError::FileIO(msg) => assert!(msg.contains("access denied")),
            other => panic!("Expected FileIO, got {:?}", other),
        }
    }

    #[test]
    fn from_serde_json_error() {
        let result: Result<String, _> = serde_json::from_str("{{invalid json");
        let core_err: CoreError = result.unwrap_err().into();
        match &core_err {
            CoreError::Deserialization(msg) => assert!(!msg.is_empty()),
            other => panic!("Expected Deserialization, got {:?}", other),
        }
    }

    #[test]
    fn question_mark_converts() {
        fn read_missing() -> Result<String, CoreError> {
            Ok(std::fs::read_to_string(
                "/definitely/not/here/mr-tracker.json",
            )?)
        }
        assert!(matches!(read_missing(), Err(CoreError::FileIO(_))));
    }
}

// ── Error is std::error::Error ──────────────────────────────────────

mod std_error {
    use super::*;

    #[test]
    fn boxes_as_dyn_error() {
        let err: Box<dyn std::error::Error + Send + Sync> =
            Box::new(CoreError::Network("timeout".into()));
        assert_eq!(err.to_string(), "Network error: timeout");
    }
}
