//! Record store: the canonical, append-only sequence of quotes.
//!
//! The store is the sole writer of record state, counters and both secondary
//! indexes. Every mutation is split into two phases:
//!
//! 1. `plan_*` validates and authorizes against the current state without
//!    touching it, returning a [`Planned`] mutation.
//! 2. [`RecordStore::commit`] applies a planned mutation.
//!
//! A durable shell writes the planned mutation to its log between the two
//! phases, so a rejected or unlogged mutation never reaches the store.
//! `commit` and replay ([`RecordStore::apply`]) share one structural check
//! ([`RecordStore::verify`]): an insert must carry the next id and an update
//! or deactivate must target an active row. A plan that went stale because
//! the store moved on is refused instead of corrupting ids or counters.

use crate::access::{GuardedOp, authorize};
use crate::error::{QuoteError, ValidationRule};
use crate::index::{CategoryIndex, SubmitterIndex};
use crate::quote::{FieldLimits, Identity, Quote, QuoteField, QuoteId};

/// A state change, as recorded in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Insert(Quote),
    Update {
        id: QuoteId,
        text: String,
        author: String,
    },
    Deactivate {
        id: QuoteId,
    },
}

impl Mutation {
    /// Record the mutation creates or targets.
    pub fn quote_id(&self) -> QuoteId {
        match self {
            Mutation::Insert(record) => record.id,
            Mutation::Update { id, .. } | Mutation::Deactivate { id } => *id,
        }
    }
}

/// A mutation that passed validation and authorization against the store
/// that produced it. Consumed by [`RecordStore::commit`]; not `Clone`, so a
/// plan commits at most once.
#[derive(Debug, PartialEq, Eq)]
#[must_use]
pub struct Planned(Mutation);

impl Planned {
    /// The mutation to log before committing.
    pub fn mutation(&self) -> &Mutation {
        &self.0
    }

    /// The new row, if this is an insert.
    pub fn inserted(&self) -> Option<&Quote> {
        match &self.0 {
            Mutation::Insert(record) => Some(record),
            _ => None,
        }
    }
}

/// Canonical rows plus the counters and indexes derived from them.
#[derive(Debug, Clone)]
pub struct RecordStore {
    /// `records[i].id == i + 1`.
    records: Vec<Quote>,
    categories: CategoryIndex,
    submitters: SubmitterIndex,
    active_count: u64,
    limits: FieldLimits,
}

impl RecordStore {
    /// Empty store enforcing `limits` on new content.
    pub fn new(limits: FieldLimits) -> Self {
        Self {
            records: Vec::new(),
            categories: CategoryIndex::new(),
            submitters: SubmitterIndex::new(),
            active_count: 0,
            limits,
        }
    }

    // --- Planning -------------------------------------------------------

    /// Validate an insert and assign it the next id.
    pub fn plan_insert(
        &self,
        text: &str,
        author: &str,
        category: &str,
        submitter: &Identity,
        timestamp: u64,
    ) -> Result<Planned, QuoteError> {
        self.validate_content(text, author)?;
        check_len(QuoteField::Category, category, &self.limits)?;

        Ok(Planned(Mutation::Insert(Quote {
            id: self.next_id(),
            text: text.to_string(),
            author: author.to_string(),
            category: category.to_string(),
            submitter: submitter.clone(),
            timestamp,
            is_active: true,
        })))
    }

    /// Check an owner update of `text`/`author`.
    ///
    /// Precedence: NotFound, Unauthorized, InactiveRecord, Validation.
    pub fn plan_update(
        &self,
        id: QuoteId,
        text: &str,
        author: &str,
        caller: &Identity,
    ) -> Result<Planned, QuoteError> {
        let record = self.record(id)?;
        authorize(GuardedOp::Update, caller, record)?;
        if !record.is_active {
            return Err(QuoteError::InactiveRecord { id });
        }
        self.validate_content(text, author)?;

        Ok(Planned(Mutation::Update {
            id,
            text: text.to_string(),
            author: author.to_string(),
        }))
    }

    /// Check a soft delete. `Ok(None)` when the record is already inactive.
    pub fn plan_deactivate(
        &self,
        id: QuoteId,
        caller: &Identity,
    ) -> Result<Option<Planned>, QuoteError> {
        let record = self.record(id)?;
        authorize(GuardedOp::Deactivate, caller, record)?;
        if !record.is_active {
            return Ok(None);
        }
        Ok(Some(Planned(Mutation::Deactivate { id })))
    }

    // --- Applying -------------------------------------------------------

    /// Apply a planned mutation.
    ///
    /// Fails, leaving the store unchanged, when the plan no longer fits the
    /// current state (see [`RecordStore::verify`]).
    pub fn commit(&mut self, planned: Planned) -> Result<(), String> {
        self.verify(&planned.0)?;
        self.commit_verified(planned.0);
        Ok(())
    }

    /// Apply a logged mutation. Used when rebuilding a store from its log.
    ///
    /// Ownership is not re-checked: it was enforced before the line was
    /// written.
    pub fn apply(&mut self, mutation: &Mutation) -> Result<(), String> {
        self.verify(mutation)?;
        self.commit_verified(mutation.clone());
        Ok(())
    }

    /// Check that `mutation` is structurally consistent with the current
    /// state: inserts carry the next id, an active row and non-empty
    /// fields; updates and deactivates target an existing active row.
    pub fn verify(&self, mutation: &Mutation) -> Result<(), String> {
        match mutation {
            Mutation::Insert(record) => {
                let expected = self.next_id();
                if record.id != expected {
                    return Err(format!(
                        "insert out of sequence: got id {} expected {expected}",
                        record.id
                    ));
                }
                if !record.is_active {
                    return Err(format!("insert of inactive record id {}", record.id));
                }
                if record.text.is_empty() || record.author.is_empty() {
                    return Err(format!("insert with empty field id {}", record.id));
                }
            }
            Mutation::Update { id, text, author } => {
                let current = self
                    .record(*id)
                    .map_err(|_| format!("update of missing id {id}"))?;
                if !current.is_active {
                    return Err(format!("update of inactive id {id}"));
                }
                if text.is_empty() || author.is_empty() {
                    return Err(format!("update with empty field id {id}"));
                }
            }
            Mutation::Deactivate { id } => {
                let current = self
                    .record(*id)
                    .map_err(|_| format!("deactivate of missing id {id}"))?;
                if !current.is_active {
                    return Err(format!("deactivate of inactive id {id}"));
                }
            }
        }
        Ok(())
    }

    fn commit_verified(&mut self, mutation: Mutation) {
        match mutation {
            Mutation::Insert(record) => {
                self.categories.append(&record.category, record.id);
                self.submitters.append(&record.submitter, record.id);
                self.active_count += 1;
                self.records.push(record);
            }
            Mutation::Update { id, text, author } => {
                let slot = self.slot_mut(id);
                slot.text = text;
                slot.author = author;
            }
            Mutation::Deactivate { id } => {
                self.slot_mut(id).is_active = false;
                self.active_count -= 1;
            }
        }
    }

    // --- One-shot helpers -----------------------------------------------

    /// Plan and commit an insert. Returns the new id.
    pub fn insert(
        &mut self,
        text: &str,
        author: &str,
        category: &str,
        submitter: &Identity,
        timestamp: u64,
    ) -> Result<QuoteId, QuoteError> {
        let planned = self.plan_insert(text, author, category, submitter, timestamp)?;
        let id = planned.mutation().quote_id();
        self.commit_verified(planned.0);
        Ok(id)
    }

    /// Plan and commit an owner update of `text`/`author`.
    pub fn update(
        &mut self,
        id: QuoteId,
        text: &str,
        author: &str,
        caller: &Identity,
    ) -> Result<(), QuoteError> {
        let planned = self.plan_update(id, text, author, caller)?;
        self.commit_verified(planned.0);
        Ok(())
    }

    /// Soft delete. Idempotent for the owner: a second call is a no-op.
    pub fn deactivate(&mut self, id: QuoteId, caller: &Identity) -> Result<(), QuoteError> {
        if let Some(planned) = self.plan_deactivate(id, caller)? {
            self.commit_verified(planned.0);
        }
        Ok(())
    }

    // --- Reads ----------------------------------------------------------

    /// Active-only lookup.
    pub fn get(&self, id: QuoteId) -> Result<&Quote, QuoteError> {
        let record = self.record(id)?;
        if !record.is_active {
            return Err(QuoteError::InactiveRecord { id });
        }
        Ok(record)
    }

    /// Lookup regardless of `is_active`.
    pub fn record(&self, id: QuoteId) -> Result<&Quote, QuoteError> {
        id.checked_sub(1)
            .and_then(|idx| usize::try_from(idx).ok())
            .and_then(|idx| self.records.get(idx))
            .ok_or(QuoteError::NotFound { id })
    }

    /// All rows in id order, including inactive ones.
    pub fn records(&self) -> &[Quote] {
        &self.records
    }

    /// Category buckets, including deactivated ids.
    pub fn categories(&self) -> &CategoryIndex {
        &self.categories
    }

    /// Submitter buckets, including deactivated ids.
    pub fn submitters(&self) -> &SubmitterIndex {
        &self.submitters
    }

    /// Rows ever inserted.
    pub fn total_count(&self) -> u64 {
        self.records.len() as u64
    }

    /// Rows with `is_active`, maintained incrementally.
    pub fn active_count(&self) -> u64 {
        self.active_count
    }

    /// Id the next successful insert will receive.
    pub fn next_id(&self) -> QuoteId {
        self.records.len() as u64 + 1
    }

    fn validate_content(&self, text: &str, author: &str) -> Result<(), QuoteError> {
        if text.is_empty() {
            return Err(QuoteError::Validation {
                field: QuoteField::Text,
                rule: ValidationRule::Empty,
            });
        }
        if author.is_empty() {
            return Err(QuoteError::Validation {
                field: QuoteField::Author,
                rule: ValidationRule::Empty,
            });
        }
        check_len(QuoteField::Text, text, &self.limits)?;
        check_len(QuoteField::Author, author, &self.limits)
    }

    fn slot_mut(&mut self, id: QuoteId) -> &mut Quote {
        // Only reached for ids that passed `verify` or a fresh plan.
        &mut self.records[(id - 1) as usize]
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new(FieldLimits::default())
    }
}

fn check_len(field: QuoteField, value: &str, limits: &FieldLimits) -> Result<(), QuoteError> {
    let max_bytes = limits.max_for(field);
    if value.len() > max_bytes {
        return Err(QuoteError::Validation {
            field,
            rule: ValidationRule::TooLong { max_bytes },
        });
    }
    Ok(())
}
