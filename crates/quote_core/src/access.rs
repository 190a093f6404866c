//! Ownership gate for mutating operations.
//!
//! One rule: a caller may update or deactivate a record only if it is the
//! record's submitter. No admin override, no delegation. The check is a pure
//! function of `(caller, record.submitter)` and runs before any state changes.

use crate::error::QuoteError;
use crate::quote::{Identity, Quote};

/// Mutating operations subject to the ownership rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardedOp {
    Update,
    Deactivate,
}

/// Fail-closed ownership check.
pub fn authorize(op: GuardedOp, caller: &Identity, record: &Quote) -> Result<(), QuoteError> {
    if caller == &record.submitter {
        return Ok(());
    }
    tracing::debug!(
        "AccessDenied op={:?} id={} caller={} submitter={}",
        op,
        record.id,
        caller,
        record.submitter
    );
    Err(QuoteError::Unauthorized {
        id: record.id,
        caller: caller.clone(),
    })
}
