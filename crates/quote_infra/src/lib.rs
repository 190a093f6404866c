#![forbid(unsafe_code)]

pub mod config;
pub mod health;
pub mod ledger;
pub mod seed;
pub mod store;

pub use config::{ConfigError, ConfigParam, LedgerConfig};
pub use ledger::{LedgerError, LedgerMetrics, LedgerStatus, QuoteLedger};
