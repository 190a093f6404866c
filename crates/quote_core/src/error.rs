//! Closed error taxonomy for ledger operations.
//!
//! Every variant has a stable machine token (`kind`) and a stable
//! human-readable reason (`reason`) that boundary layers may show verbatim.

use std::fmt;

use crate::quote::{Identity, QuoteField, QuoteId};

/// Why a field failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationRule {
    /// Required field was empty.
    Empty,
    /// Field exceeded its configured byte limit.
    TooLong { max_bytes: usize },
}

/// Rejection of a ledger operation. State is unchanged when one is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuoteError {
    /// A required field is empty or oversized.
    Validation {
        field: QuoteField,
        rule: ValidationRule,
    },
    /// No record with this id was ever inserted.
    NotFound { id: QuoteId },
    /// The record exists but has been soft-deleted.
    InactiveRecord { id: QuoteId },
    /// Caller is not the record's submitter.
    Unauthorized { id: QuoteId, caller: Identity },
}

/// Stable token for each error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuoteErrorKind {
    ValidationError,
    NotFound,
    InactiveRecord,
    Unauthorized,
}

impl QuoteErrorKind {
    /// Machine token, e.g. `"NotFound"`.
    pub fn as_str(self) -> &'static str {
        match self {
            QuoteErrorKind::ValidationError => "ValidationError",
            QuoteErrorKind::NotFound => "NotFound",
            QuoteErrorKind::InactiveRecord => "InactiveRecord",
            QuoteErrorKind::Unauthorized => "Unauthorized",
        }
    }
}

impl QuoteError {
    /// Kind token for this error.
    pub fn kind(&self) -> QuoteErrorKind {
        match self {
            QuoteError::Validation { .. } => QuoteErrorKind::ValidationError,
            QuoteError::NotFound { .. } => QuoteErrorKind::NotFound,
            QuoteError::InactiveRecord { .. } => QuoteErrorKind::InactiveRecord,
            QuoteError::Unauthorized { .. } => QuoteErrorKind::Unauthorized,
        }
    }

    /// Display-ready reason. Stable across releases.
    pub fn reason(&self) -> String {
        match self {
            QuoteError::Validation {
                field,
                rule: ValidationRule::Empty,
            } => format!("{} cannot be empty", field_label(*field)),
            QuoteError::Validation {
                field,
                rule: ValidationRule::TooLong { max_bytes },
            } => format!("{} exceeds {max_bytes} bytes", field_label(*field)),
            QuoteError::NotFound { .. } => "Quote does not exist".to_string(),
            QuoteError::InactiveRecord { .. } => "Quote is not active".to_string(),
            QuoteError::Unauthorized { .. } => "Not the quote owner".to_string(),
        }
    }

    /// Record id the error refers to, if any.
    pub fn quote_id(&self) -> Option<QuoteId> {
        match self {
            QuoteError::Validation { .. } => None,
            QuoteError::NotFound { id }
            | QuoteError::InactiveRecord { id }
            | QuoteError::Unauthorized { id, .. } => Some(*id),
        }
    }
}

fn field_label(field: QuoteField) -> &'static str {
    match field {
        QuoteField::Text => "Quote text",
        QuoteField::Author => "Author",
        QuoteField::Category => "Category",
    }
}

impl fmt::Display for QuoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.quote_id() {
            Some(id) => write!(f, "{}: {} (id={id})", self.kind().as_str(), self.reason()),
            None => write!(f, "{}: {}", self.kind().as_str(), self.reason()),
        }
    }
}

impl std::error::Error for QuoteError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_reason_strings_are_stable() {
        let empty_text = QuoteError::Validation {
            field: QuoteField::Text,
            rule: ValidationRule::Empty,
        };
        let empty_author = QuoteError::Validation {
            field: QuoteField::Author,
            rule: ValidationRule::Empty,
        };
        assert_eq!(empty_text.reason(), "Quote text cannot be empty");
        assert_eq!(empty_author.reason(), "Author cannot be empty");
        assert_eq!(
            QuoteError::InactiveRecord { id: 1 }.reason(),
            "Quote is not active"
        );
        assert_eq!(
            QuoteError::Unauthorized {
                id: 1,
                caller: Identity::from("mallory"),
            }
            .reason(),
            "Not the quote owner"
        );
    }

    #[test]
    fn display_carries_kind_and_id() {
        let err = QuoteError::NotFound { id: 42 };
        assert_eq!(err.to_string(), "NotFound: Quote does not exist (id=42)");
        assert_eq!(err.kind().as_str(), "NotFound");
    }

    #[test]
    fn too_long_reason_names_limit() {
        let err = QuoteError::Validation {
            field: QuoteField::Author,
            rule: ValidationRule::TooLong { max_bytes: 8 },
        };
        assert_eq!(err.reason(), "Author exceeds 8 bytes");
        assert_eq!(err.quote_id(), None);
    }
}
