//! Secondary indexes by category and by submitter.
//!
//! Each bucket holds ids in insertion (ascending id) order. Buckets only
//! grow: update and deactivate never touch them. Callers resolve ids back
//! through the record store for current field values.

use std::collections::HashMap;
use std::hash::Hash;

use crate::quote::{Identity, QuoteId};

/// Append-only map from key to an ordered id bucket.
#[derive(Debug, Clone)]
pub struct BucketIndex<K> {
    buckets: HashMap<K, Vec<QuoteId>>,
    /// Keys in first-seen order.
    key_order: Vec<K>,
}

pub type CategoryIndex = BucketIndex<String>;
pub type SubmitterIndex = BucketIndex<Identity>;

impl<K: Clone + Eq + Hash> BucketIndex<K> {
    /// Empty index.
    pub fn new() -> Self {
        Self {
            buckets: HashMap::new(),
            key_order: Vec::new(),
        }
    }

    /// Append `id` to the bucket for `key`.
    ///
    /// Ids must arrive in strictly increasing order; the store guarantees it.
    pub fn append(&mut self, key: &K, id: QuoteId) {
        match self.buckets.get_mut(key) {
            Some(bucket) => {
                debug_assert!(bucket.last().is_none_or(|last| *last < id));
                bucket.push(id);
            }
            None => {
                self.key_order.push(key.clone());
                self.buckets.insert(key.clone(), vec![id]);
            }
        }
    }

    /// Ids for `key`, oldest first. Empty when the key was never seen.
    pub fn bucket<Q>(&self, key: &Q) -> &[QuoteId]
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.buckets.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Distinct keys in first-seen order.
    pub fn keys(&self) -> &[K] {
        &self.key_order
    }

    /// Number of distinct keys.
    pub fn key_count(&self) -> usize {
        self.key_order.len()
    }

    /// Total ids across all buckets.
    pub fn entry_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }
}

impl<K: Clone + Eq + Hash> Default for BucketIndex<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_preserve_insertion_order() {
        let mut idx = CategoryIndex::new();
        idx.append(&"motivation".to_string(), 1);
        idx.append(&"wisdom".to_string(), 2);
        idx.append(&"motivation".to_string(), 3);

        assert_eq!(idx.bucket("motivation"), &[1, 3]);
        assert_eq!(idx.bucket("wisdom"), &[2]);
        assert_eq!(idx.keys(), &["motivation".to_string(), "wisdom".to_string()]);
        assert_eq!(idx.entry_count(), 3);
    }

    #[test]
    fn unknown_key_is_empty_bucket() {
        let idx = SubmitterIndex::new();
        assert!(idx.bucket(&Identity::from("nobody")).is_empty());
        assert_eq!(idx.key_count(), 0);
    }

    #[test]
    fn keys_are_not_normalized() {
        let mut idx = CategoryIndex::new();
        idx.append(&"Wisdom".to_string(), 1);
        idx.append(&"wisdom".to_string(), 2);
        idx.append(&" wisdom".to_string(), 3);

        assert_eq!(idx.key_count(), 3);
        assert_eq!(idx.bucket("wisdom"), &[2]);
    }
}
