pub mod analytics;
pub mod asset;
pub mod ledger;
pub mod operation;
pub mod position;
pub mod price;
pub mod settings;
pub mod valuation;
