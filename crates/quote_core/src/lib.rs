#![forbid(unsafe_code)]

pub mod access;
pub mod error;
pub mod events;
pub mod fingerprint;
pub mod index;
pub mod query;
pub mod quote;
pub mod store;

pub use access::{GuardedOp, authorize};
pub use error::{QuoteError, QuoteErrorKind, ValidationRule};
pub use events::{ChannelSink, EventEmitter, EventLog, QuoteAdded, QuoteEventSink, SubscriptionId};
pub use fingerprint::{format_fingerprint, mutation_fingerprint};
pub use index::{BucketIndex, CategoryIndex, SubmitterIndex};
pub use query::{LedgerStats, QueryEngine};
pub use quote::{FieldLimits, Identity, Quote, QuoteField, QuoteId};
pub use store::{Mutation, Planned, RecordStore};
