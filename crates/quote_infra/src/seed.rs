//! Sample quotes for bootstrapping a fresh ledger.

use quote_core::{Identity, QuoteId};

use crate::ledger::{LedgerError, QuoteLedger};

/// One bootstrap quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleQuote {
    pub text: &'static str,
    pub author: &'static str,
    pub category: &'static str,
}

const SAMPLES: &[SampleQuote] = &[
    SampleQuote {
        text: "The only way to do great work is to love what you do.",
        author: "Steve Jobs",
        category: "motivation",
    },
    SampleQuote {
        text: "Innovation distinguishes between a leader and a follower.",
        author: "Steve Jobs",
        category: "innovation",
    },
    SampleQuote {
        text: "Life is what happens to you while you're busy making other plans.",
        author: "John Lennon",
        category: "life",
    },
    SampleQuote {
        text: "The future belongs to those who believe in the beauty of their dreams.",
        author: "Eleanor Roosevelt",
        category: "inspiration",
    },
    SampleQuote {
        text: "It is during our darkest moments that we must focus to see the light.",
        author: "Aristotle",
        category: "wisdom",
    },
];

/// The bootstrap quotes in insertion order.
pub fn sample_quotes() -> &'static [SampleQuote] {
    SAMPLES
}

/// Insert the samples as `submitter` if the ledger has never held a quote.
///
/// Returns the assigned ids, or an empty list when the ledger was not empty.
/// Meant for startup, before the ledger is shared.
pub fn seed_if_empty(
    ledger: &QuoteLedger,
    submitter: &Identity,
) -> Result<Vec<QuoteId>, LedgerError> {
    if ledger.get_total_quote_count() > 0 {
        return Ok(Vec::new());
    }
    let mut ids = Vec::with_capacity(SAMPLES.len());
    for sample in SAMPLES {
        ids.push(ledger.add_quote(submitter, sample.text, sample.author, sample.category)?);
    }
    tracing::info!("seeded ledger with {} sample quotes", ids.len());
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_once() {
        let ledger = QuoteLedger::default();
        let deployer = Identity::from("deployer");

        let ids = seed_if_empty(&ledger, &deployer).unwrap();
        assert_eq!(ids, [1, 2, 3, 4, 5]);
        assert!(seed_if_empty(&ledger, &deployer).unwrap().is_empty());
        assert_eq!(ledger.get_total_quote_count(), 5);
        assert_eq!(ledger.get_user_quotes(&deployer).len(), 5);
    }

    #[test]
    fn samples_are_valid() {
        for sample in sample_quotes() {
            assert!(!sample.text.is_empty());
            assert!(!sample.author.is_empty());
        }
    }
}
