//! Durable storage: JSONL mutation log.

pub mod log;

pub use log::{MutationLog, PersistedQuote};
