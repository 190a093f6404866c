//! Quote ledger service: single-writer sequencer around the core store.
//!
//! Mutation pipeline (all under the write lock):
//! 1. Plan: validation + ownership check against current state (pure).
//! 2. Capacity check (inserts only).
//! 3. Append to the mutation log, if durable. Failure aborts here.
//! 4. Commit to the store: record, indexes and counters together.
//! 5. Queue the `QuoteAdded` event (inserts only).
//!
//! Queued events are dispatched after the write lock is released, in commit
//! order. Reads take the read lock once, so every view is a consistent
//! snapshot: a read sees a mutation entirely or not at all.

use std::collections::VecDeque;
use std::fmt;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use quote_core::{
    EventEmitter, Identity, LedgerStats, Planned, QueryEngine, Quote, QuoteAdded, QuoteError,
    QuoteErrorKind, QuoteEventSink, QuoteId, RecordStore, SubscriptionId,
};

use crate::config::LedgerConfig;
use crate::store::MutationLog;

// --- Errors -------------------------------------------------------------

/// Failure of a ledger operation. State is unchanged on every variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Rejected by validation, lookup or ownership rules.
    Rejected(QuoteError),
    /// The ledger holds `capacity` records and accepts no more inserts.
    CapacityFull { capacity: usize },
    /// The mutation log could not be written.
    WriteFailed { reason: String },
}

impl LedgerError {
    /// Stable token for the failure.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::Rejected(err) => err.kind().as_str(),
            LedgerError::CapacityFull { .. } => "CapacityFull",
            LedgerError::WriteFailed { .. } => "WriteFailed",
        }
    }

    /// Display-ready reason.
    pub fn reason(&self) -> String {
        match self {
            LedgerError::Rejected(err) => err.reason(),
            LedgerError::CapacityFull { capacity } => {
                format!("Ledger is full ({capacity} quotes)")
            }
            LedgerError::WriteFailed { .. } => "Quote could not be stored".to_string(),
        }
    }

    pub fn as_rejection(&self) -> Option<&QuoteError> {
        match self {
            LedgerError::Rejected(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::Rejected(err) => write!(f, "{err}"),
            LedgerError::CapacityFull { .. } => write!(f, "CapacityFull: {}", self.reason()),
            LedgerError::WriteFailed { reason } => write!(f, "WriteFailed: {reason}"),
        }
    }
}

impl std::error::Error for LedgerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LedgerError::Rejected(err) => Some(err),
            _ => None,
        }
    }
}

impl From<QuoteError> for LedgerError {
    fn from(err: QuoteError) -> Self {
        LedgerError::Rejected(err)
    }
}

// --- Metrics ------------------------------------------------------------

/// Ledger counters. Updated only by mutating operations.
#[derive(Debug, Default)]
pub struct LedgerMetrics {
    commits_total: AtomicU64,
    wal_write_errors: AtomicU64,
    rejected_validation: AtomicU64,
    rejected_not_found: AtomicU64,
    rejected_inactive: AtomicU64,
    rejected_unauthorized: AtomicU64,
    rejected_capacity: AtomicU64,
}

impl LedgerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn record_commit(&self) {
        self.commits_total.fetch_add(1, Ordering::Relaxed);
    }

    fn record_write_error(&self) {
        self.wal_write_errors.fetch_add(1, Ordering::Relaxed);
    }

    fn record_capacity_reject(&self) {
        self.rejected_capacity.fetch_add(1, Ordering::Relaxed);
    }

    fn record_rejection(&self, kind: QuoteErrorKind) {
        let counter = match kind {
            QuoteErrorKind::ValidationError => &self.rejected_validation,
            QuoteErrorKind::NotFound => &self.rejected_not_found,
            QuoteErrorKind::InactiveRecord => &self.rejected_inactive,
            QuoteErrorKind::Unauthorized => &self.rejected_unauthorized,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Committed mutations (inserts, updates, deactivations).
    pub fn commits_total(&self) -> u64 {
        self.commits_total.load(Ordering::Relaxed)
    }

    pub fn wal_write_errors(&self) -> u64 {
        self.wal_write_errors.load(Ordering::Relaxed)
    }

    pub fn rejected(&self, kind: QuoteErrorKind) -> u64 {
        match kind {
            QuoteErrorKind::ValidationError => &self.rejected_validation,
            QuoteErrorKind::NotFound => &self.rejected_not_found,
            QuoteErrorKind::InactiveRecord => &self.rejected_inactive,
            QuoteErrorKind::Unauthorized => &self.rejected_unauthorized,
        }
        .load(Ordering::Relaxed)
    }

    pub fn rejected_capacity(&self) -> u64 {
        self.rejected_capacity.load(Ordering::Relaxed)
    }
}

// --- Ledger -------------------------------------------------------------

/// Counters and write readiness read under one lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerStatus {
    pub stats: LedgerStats,
    /// `stats.total` has reached the configured capacity.
    pub at_capacity: bool,
    /// False when the mutation log refuses appends until reopened.
    pub log_writable: bool,
}

#[derive(Debug)]
struct LedgerState {
    store: RecordStore,
    log: Option<MutationLog>,
}

/// Thread-safe quote ledger.
///
/// Invariants:
/// - Mutations are totally ordered by the write lock.
/// - A mutation that returns `Err` changed nothing: no record, index,
///   counter, log line or event.
/// - `QuoteAdded` is emitted only after its insert is committed.
#[derive(Debug)]
pub struct QuoteLedger {
    state: RwLock<LedgerState>,
    pending: Mutex<VecDeque<QuoteAdded>>,
    emitter: Mutex<EventEmitter>,
    metrics: LedgerMetrics,
    config: LedgerConfig,
}

impl QuoteLedger {
    /// In-memory ledger. `config.storage_path` is cleared.
    pub fn in_memory(mut config: LedgerConfig) -> Self {
        config.storage_path = None;
        Self::from_parts(RecordStore::new(config.limits), None, config)
    }

    /// Open a ledger, replaying its log when `config.storage_path` is set.
    pub fn open(config: LedgerConfig) -> io::Result<Self> {
        let Some(path) = config.storage_path.clone() else {
            return Ok(Self::in_memory(config));
        };

        let (log, mutations) = MutationLog::open(&path, config.fsync_on_commit)?;
        let mut store = RecordStore::new(config.limits);
        for (index, mutation) in mutations.iter().enumerate() {
            store.apply(mutation).map_err(|reason| {
                tracing::warn!(
                    "replay rejected path={} line={} reason={}",
                    path.display(),
                    index + 1,
                    reason
                );
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("replay failed at entry {} in {}: {reason}", index + 1, path.display()),
                )
            })?;
        }
        if store.total_count() as usize > config.capacity {
            let reason = format!(
                "log contains {} quotes but capacity is {}",
                store.total_count(),
                config.capacity
            );
            return Err(io::Error::new(io::ErrorKind::InvalidInput, reason));
        }

        tracing::info!(
            "ledger opened path={} entries={} total={} active={}",
            path.display(),
            mutations.len(),
            store.total_count(),
            store.active_count()
        );
        Ok(Self::from_parts(store, Some(log), config))
    }

    fn from_parts(store: RecordStore, log: Option<MutationLog>, config: LedgerConfig) -> Self {
        Self {
            state: RwLock::new(LedgerState { store, log }),
            pending: Mutex::new(VecDeque::new()),
            emitter: Mutex::new(EventEmitter::new()),
            metrics: LedgerMetrics::new(),
            config,
        }
    }

    /// Configuration the ledger was built with.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Lock-free counters for commits and rejections.
    pub fn metrics(&self) -> &LedgerMetrics {
        &self.metrics
    }

    /// Log path if this ledger is durable.
    pub fn storage_path(&self) -> Option<&Path> {
        self.config.storage_path.as_deref()
    }

    /// True when mutations are written to a log.
    pub fn is_durable(&self) -> bool {
        self.config.storage_path.is_some()
    }

    /// True when no further insert fits.
    pub fn is_at_capacity(&self) -> bool {
        self.status().at_capacity
    }

    /// Snapshot of counters, capacity and log state.
    pub fn status(&self) -> LedgerStatus {
        let state = self.read_state();
        let stats = QueryEngine::new(&state.store).stats();
        LedgerStatus {
            stats,
            at_capacity: stats.total as usize >= self.config.capacity,
            log_writable: state.log.as_ref().is_none_or(MutationLog::is_writable),
        }
    }

    // --- Events ---------------------------------------------------------

    /// Register a sink for `QuoteAdded` events.
    pub fn subscribe(&self, sink: Box<dyn QuoteEventSink>) -> SubscriptionId {
        self.emitter
            .lock()
            .expect("quote ledger emitter mutex poisoned")
            .subscribe(sink)
    }

    /// Remove a sink. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.emitter
            .lock()
            .expect("quote ledger emitter mutex poisoned")
            .unsubscribe(id)
    }

    // --- Mutations ------------------------------------------------------

    /// Insert a quote on behalf of `caller`. Returns the new id.
    pub fn add_quote(
        &self,
        caller: &Identity,
        text: &str,
        author: &str,
        category: &str,
    ) -> Result<QuoteId, LedgerError> {
        self.add_quote_at(caller, text, author, category, now_ms())
    }

    /// Insert with an explicit creation timestamp (ms since epoch).
    pub fn add_quote_at(
        &self,
        caller: &Identity,
        text: &str,
        author: &str,
        category: &str,
        timestamp: u64,
    ) -> Result<QuoteId, LedgerError> {
        let id = {
            let mut state = self.write_state();
            let planned = state
                .store
                .plan_insert(text, author, category, caller, timestamp)
                .map_err(|err| self.reject("add", err))?;

            if state.store.total_count() as usize >= self.config.capacity {
                self.metrics.record_capacity_reject();
                tracing::debug!(
                    "QuoteRejected op=add kind=CapacityFull capacity={}",
                    self.config.capacity
                );
                return Err(LedgerError::CapacityFull {
                    capacity: self.config.capacity,
                });
            }

            let event = planned.inserted().map(QuoteAdded::from);
            let id = self.persist_and_commit(&mut state, planned)?;
            if let Some(event) = event {
                self.pending
                    .lock()
                    .expect("quote ledger pending mutex poisoned")
                    .push_back(event);
            }
            tracing::info!(
                "QuoteAdded id={} submitter={} category={:?} text_len={}",
                id,
                caller,
                category,
                text.len()
            );
            id
        };

        self.dispatch_pending();
        Ok(id)
    }

    /// Replace `text`/`author` of a record owned by `caller`.
    pub fn update_quote(
        &self,
        caller: &Identity,
        id: QuoteId,
        text: &str,
        author: &str,
    ) -> Result<(), LedgerError> {
        let mut state = self.write_state();
        let planned = state
            .store
            .plan_update(id, text, author, caller)
            .map_err(|err| self.reject("update", err))?;
        self.persist_and_commit(&mut state, planned)?;
        tracing::info!("QuoteUpdated id={} submitter={}", id, caller);
        Ok(())
    }

    /// Soft-delete a record owned by `caller`. Repeating it is a no-op.
    pub fn deactivate_quote(&self, caller: &Identity, id: QuoteId) -> Result<(), LedgerError> {
        let mut state = self.write_state();
        let planned = state
            .store
            .plan_deactivate(id, caller)
            .map_err(|err| self.reject("deactivate", err))?;
        match planned {
            Some(planned) => {
                self.persist_and_commit(&mut state, planned)?;
                tracing::info!("QuoteDeactivated id={} submitter={}", id, caller);
            }
            None => tracing::debug!("QuoteDeactivate noop id={} already inactive", id),
        }
        Ok(())
    }

    // --- Reads ----------------------------------------------------------

    /// Active-only lookup.
    pub fn get_quote(&self, id: QuoteId) -> Result<Quote, LedgerError> {
        Ok(self.query(|q| q.get_quote(id))?)
    }

    /// Audit lookup, including deactivated records.
    pub fn get_quote_record(&self, id: QuoteId) -> Result<Quote, LedgerError> {
        Ok(self.query(|q| q.get_quote_record(id))?)
    }

    /// Every active quote, in id order.
    pub fn get_all_quotes(&self) -> Vec<Quote> {
        self.query(|q| q.get_all_quotes())
    }

    /// Active quotes in `category` (exact match), oldest first.
    pub fn get_quotes_by_category(&self, category: &str) -> Vec<Quote> {
        self.query(|q| q.get_quotes_by_category(category))
    }

    /// Active quotes submitted by `submitter`, oldest first.
    pub fn get_user_quotes(&self, submitter: &Identity) -> Vec<Quote> {
        self.query(|q| q.get_user_quotes(submitter))
    }

    /// Quotes ever inserted, active or not.
    pub fn get_total_quote_count(&self) -> u64 {
        self.query(|q| q.get_total_quote_count())
    }

    /// Quotes not yet deactivated.
    pub fn get_active_quote_count(&self) -> u64 {
        self.query(|q| q.get_active_quote_count())
    }

    /// Id the next successful insert will receive.
    pub fn next_quote_id(&self) -> QuoteId {
        self.query(|q| q.next_quote_id())
    }

    /// Distinct categories in first-seen order.
    pub fn categories(&self) -> Vec<String> {
        self.query(|q| q.categories())
    }

    /// Counters and index sizes from one snapshot.
    pub fn stats(&self) -> LedgerStats {
        self.query(|q| q.stats())
    }

    /// Run `f` against one consistent snapshot of the ledger.
    pub fn query<T>(&self, f: impl FnOnce(QueryEngine<'_>) -> T) -> T {
        let state = self.read_state();
        f(QueryEngine::new(&state.store))
    }

    // --- Internals ------------------------------------------------------

    fn persist_and_commit(
        &self,
        state: &mut LedgerState,
        planned: Planned,
    ) -> Result<QuoteId, LedgerError> {
        let id = planned.mutation().quote_id();
        // Planned under this same write guard, so it fits; checked before
        // the append so the log never holds a line the store refuses.
        state
            .store
            .verify(planned.mutation())
            .map_err(|reason| stale_plan(id, reason))?;
        if let Some(log) = state.log.as_mut() {
            log.append(planned.mutation()).map_err(|reason| {
                self.metrics.record_write_error();
                tracing::warn!("log append failed id={} reason={}", id, reason);
                LedgerError::WriteFailed { reason }
            })?;
        }
        state
            .store
            .commit(planned)
            .map_err(|reason| stale_plan(id, reason))?;
        self.metrics.record_commit();
        Ok(id)
    }

    fn reject(&self, op: &str, err: QuoteError) -> LedgerError {
        self.metrics.record_rejection(err.kind());
        tracing::debug!(
            "QuoteRejected op={} kind={} id={:?}",
            op,
            err.kind().as_str(),
            err.quote_id()
        );
        LedgerError::Rejected(err)
    }

    /// Emit queued events in commit order. Whoever holds the emitter drains
    /// everything queued so far, including other writers' events.
    fn dispatch_pending(&self) {
        let mut emitter = self
            .emitter
            .lock()
            .expect("quote ledger emitter mutex poisoned");
        loop {
            let next = self
                .pending
                .lock()
                .expect("quote ledger pending mutex poisoned")
                .pop_front();
            match next {
                Some(event) => emitter.emit(&event),
                None => break,
            }
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, LedgerState> {
        self.state.read().expect("quote ledger lock poisoned")
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, LedgerState> {
        self.state.write().expect("quote ledger lock poisoned")
    }
}

impl Default for QuoteLedger {
    fn default() -> Self {
        Self::in_memory(LedgerConfig::default())
    }
}

/// Ledger over `store` whose log handle rejects every write.
#[cfg(test)]
pub(crate) fn ledger_with_unwritable_log(path: &Path, store: RecordStore) -> QuoteLedger {
    let next_seq = store.total_count() + 1;
    let log = crate::store::log::read_only_log(path, next_seq)
        .expect("log file must exist before opening it read-only");
    let config = LedgerConfig::default().with_storage_path(path);
    QuoteLedger::from_parts(store, Some(log), config)
}

fn stale_plan(id: QuoteId, reason: String) -> LedgerError {
    tracing::warn!("planned mutation no longer fits id={} reason={}", id, reason);
    LedgerError::WriteFailed { reason }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
