pub mod analytics_service;
pub mod currency_service;
pub mod history_service;
pub mod ledger_service;
pub mod position_service;
pub mod price_service;
pub mod valuation_service;
