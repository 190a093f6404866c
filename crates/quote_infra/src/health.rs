//! Health report for the quote ledger.
//!
//! Minimum fields: ok, build_id, schema_version, plus the two ledger
//! counters so a monitor can spot a stalled or full ledger. Everything is read
//! from one snapshot, so `ok` always agrees with the counters.

use crate::ledger::QuoteLedger;

/// Version of the mutation log line format.
pub const SCHEMA_VERSION: &str = "1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthResponse {
    /// False when the ledger is full or its log refuses writes.
    pub ok: bool,
    /// Git commit SHA or build identifier.
    pub build_id: String,
    pub schema_version: String,
    pub total_quotes: u64,
    pub active_quotes: u64,
}

/// Check the ledger and report.
pub fn check_health(build_id: &str, ledger: &QuoteLedger) -> HealthResponse {
    let status = ledger.status();
    HealthResponse {
        ok: !status.at_capacity && status.log_writable,
        build_id: build_id.to_string(),
        schema_version: SCHEMA_VERSION.to_string(),
        total_quotes: status.stats.total,
        active_quotes: status.stats.active,
    }
}

/// Exit code for healthy system.
pub const EXIT_HEALTHY: i32 = 0;
/// Exit code for unhealthy system.
pub const EXIT_UNHEALTHY: i32 = 1;

/// Process exit code for `response`.
pub fn exit_code(response: &HealthResponse) -> i32 {
    if response.ok {
        EXIT_HEALTHY
    } else {
        EXIT_UNHEALTHY
    }
}
