//! Read-only views over a [`RecordStore`].
//!
//! Bulk views return active records only, in id order. Deactivated rows
//! remain reachable through [`QueryEngine::get_quote_record`].

use crate::error::QuoteError;
use crate::quote::{Identity, Quote, QuoteId};
use crate::store::RecordStore;

/// Counters and index sizes at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerStats {
    pub total: u64,
    pub active: u64,
    pub categories: usize,
    pub submitters: usize,
}

/// Borrowed view; holds no state of its own.
#[derive(Debug, Clone, Copy)]
pub struct QueryEngine<'a> {
    store: &'a RecordStore,
}

impl<'a> QueryEngine<'a> {
    /// View over `store`.
    pub fn new(store: &'a RecordStore) -> Self {
        Self { store }
    }

    /// Active-only single lookup.
    pub fn get_quote(&self, id: QuoteId) -> Result<Quote, QuoteError> {
        self.store.get(id).cloned()
    }

    /// Audit lookup: returns deactivated rows too.
    pub fn get_quote_record(&self, id: QuoteId) -> Result<Quote, QuoteError> {
        self.store.record(id).cloned()
    }

    /// Every active record, in id order.
    pub fn get_all_quotes(&self) -> Vec<Quote> {
        self.store
            .records()
            .iter()
            .filter(|q| q.is_active)
            .cloned()
            .collect()
    }

    /// Active records filed under `category` (exact match), oldest first.
    /// Empty when the category was never used.
    pub fn get_quotes_by_category(&self, category: &str) -> Vec<Quote> {
        self.resolve(self.store.categories().bucket(category))
    }

    /// Active records submitted by `submitter`, oldest first.
    pub fn get_user_quotes(&self, submitter: &Identity) -> Vec<Quote> {
        self.resolve(self.store.submitters().bucket(submitter))
    }

    /// Records ever inserted, active or not.
    pub fn get_total_quote_count(&self) -> u64 {
        self.store.total_count()
    }

    /// Records not yet deactivated.
    pub fn get_active_quote_count(&self) -> u64 {
        self.store.active_count()
    }

    /// Id the next successful insert will receive.
    pub fn next_quote_id(&self) -> QuoteId {
        self.store.next_id()
    }

    /// Distinct categories in first-seen order.
    pub fn categories(&self) -> Vec<String> {
        self.store.categories().keys().to_vec()
    }

    /// Counters and index sizes, read together.
    pub fn stats(&self) -> LedgerStats {
        LedgerStats {
            total: self.store.total_count(),
            active: self.store.active_count(),
            categories: self.store.categories().key_count(),
            submitters: self.store.submitters().key_count(),
        }
    }

    /// Map a bucket back to current rows, keeping bucket order.
    fn resolve(&self, ids: &[QuoteId]) -> Vec<Quote> {
        ids.iter()
            .filter_map(|id| self.store.record(*id).ok())
            .filter(|q| q.is_active)
            .cloned()
            .collect()
    }
}
