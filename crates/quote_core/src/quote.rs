//! Quote record and the identities that own it.

use std::fmt;

/// Sequential quote identifier. Starts at 1, dense, never reused.
pub type QuoteId = u64;

/// Caller / submitter identity.
///
/// Compared by exact value: no case folding, no trimming. The store never
/// inspects the contents beyond equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(String);

impl Identity {
    /// Wrap a caller-supplied identity (address, account name) as is.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw identity string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Identity {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A single ledger row.
///
/// `category`, `submitter`, `timestamp` and `id` are fixed at insert.
/// `text`/`author` change only through an owner update; `is_active` only
/// ever goes `true -> false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub id: QuoteId,
    pub text: String,
    pub author: String,
    pub category: String,
    pub submitter: Identity,
    /// Creation time (ms since unix epoch), assigned by the store.
    pub timestamp: u64,
    pub is_active: bool,
}

/// Caller-editable fields, used for validation reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuoteField {
    Text,
    Author,
    Category,
}

impl QuoteField {
    /// Field name as used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            QuoteField::Text => "text",
            QuoteField::Author => "author",
            QuoteField::Category => "category",
        }
    }
}

/// Upper bounds on field sizes (bytes). Emptiness rules are separate and
/// always enforced for `text` and `author`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLimits {
    pub max_text_bytes: usize,
    pub max_author_bytes: usize,
    pub max_category_bytes: usize,
}

impl FieldLimits {
    /// Byte limit for `field`.
    pub fn max_for(&self, field: QuoteField) -> usize {
        match field {
            QuoteField::Text => self.max_text_bytes,
            QuoteField::Author => self.max_author_bytes,
            QuoteField::Category => self.max_category_bytes,
        }
    }
}

impl Default for FieldLimits {
    fn default() -> Self {
        Self {
            max_text_bytes: 4096,
            max_author_bytes: 256,
            max_category_bytes: 64,
        }
    }
}
