//! Record store, indexes and ownership rules.
//!
//! Covers id assignment, validation without side effects, single-record
//! lookup, category/submitter ordering, owner-only update and soft delete.

use quote_core::{
    Identity, QueryEngine, QuoteError, QuoteErrorKind, QuoteField, RecordStore, ValidationRule,
};

fn alice() -> Identity {
    Identity::from("0xA11CE")
}

fn bob() -> Identity {
    Identity::from("0xB0B")
}

/// Helper: store with the three reference quotes, all by alice.
fn three_quotes() -> RecordStore {
    let mut store = RecordStore::default();
    store.insert("Quote 1", "Author 1", "motivation", &alice(), 10).unwrap();
    store.insert("Quote 2", "Author 2", "wisdom", &alice(), 20).unwrap();
    store.insert("Quote 3", "Author 3", "motivation", &alice(), 30).unwrap();
    store
}

// ─── Id assignment ──────────────────────────────────────────────────────

#[test]
fn test_ids_match_call_order() {
    let mut store = RecordStore::default();
    let ids: Vec<_> = (0..20)
        .map(|i| {
            store
                .insert(&format!("q{i}"), "a", "c", &alice(), i)
                .unwrap()
        })
        .collect();

    assert_eq!(ids, (1..=20).collect::<Vec<_>>());
    assert_eq!(store.total_count(), 20);
}

#[test]
fn test_failed_inserts_do_not_consume_ids() {
    let mut store = RecordStore::default();
    store.insert("q1", "a", "c", &alice(), 1).unwrap();
    let _ = store.insert("", "a", "c", &alice(), 2);
    let id = store.insert("q2", "a", "c", &alice(), 3).unwrap();
    assert_eq!(id, 2);
}

// ─── Validation ─────────────────────────────────────────────────────────

#[test]
fn test_empty_text_rejected_without_side_effects() {
    let mut store = RecordStore::default();
    let err = store.insert("", "Author", "category", &alice(), 1).unwrap_err();

    assert_eq!(err.kind(), QuoteErrorKind::ValidationError);
    assert_eq!(err.reason(), "Quote text cannot be empty");
    assert_eq!(store.total_count(), 0);
    assert_eq!(store.active_count(), 0);
    assert!(store.categories().bucket("category").is_empty());
    assert!(store.submitters().bucket(&alice()).is_empty());
}

#[test]
fn test_empty_author_rejected_without_side_effects() {
    let mut store = RecordStore::default();
    let err = store.insert("Some text", "", "category", &alice(), 1).unwrap_err();

    assert_eq!(
        err,
        QuoteError::Validation {
            field: QuoteField::Author,
            rule: ValidationRule::Empty,
        }
    );
    assert_eq!(err.reason(), "Author cannot be empty");
    assert_eq!(store.total_count(), 0);
    assert_eq!(store.categories().entry_count(), 0);
}

// ─── Lookup ─────────────────────────────────────────────────────────────

#[test]
fn test_get_returns_inserted_fields() {
    let mut store = RecordStore::default();
    store.insert("Q1", "A1", "motivation", &alice(), 1234).unwrap();

    let q = store.get(1).unwrap();
    assert_eq!(q.id, 1);
    assert_eq!(q.text, "Q1");
    assert_eq!(q.author, "A1");
    assert_eq!(q.category, "motivation");
    assert_eq!(q.submitter, alice());
    assert_eq!(q.timestamp, 1234);
    assert!(q.is_active);
}

#[test]
fn test_get_missing_is_not_found() {
    let store = three_quotes();
    assert_eq!(store.get(4).unwrap_err(), QuoteError::NotFound { id: 4 });
}

// ─── Indexes ────────────────────────────────────────────────────────────

#[test]
fn test_category_buckets_in_insertion_order() {
    let store = three_quotes();
    let q = QueryEngine::new(&store);

    let motivation = q.get_quotes_by_category("motivation");
    assert_eq!(motivation.len(), 2);
    assert_eq!(motivation[0].id, 1);
    assert_eq!(motivation[1].id, 3);

    let wisdom = q.get_quotes_by_category("wisdom");
    assert_eq!(wisdom.len(), 1);
    assert_eq!(wisdom[0].text, "Quote 2");
}

#[test]
fn test_indexes_partition_the_store() {
    let mut store = RecordStore::default();
    let cats = ["a", "b", "a", "c", "b", "a"];
    let users = [alice(), bob(), bob(), alice(), alice(), bob()];
    for (i, (cat, user)) in cats.iter().zip(users.iter()).enumerate() {
        store.insert("q", "a", cat, user, i as u64).unwrap();
    }
    store.deactivate(2, &bob()).unwrap();

    // Every row appears in exactly one category bucket and one submitter bucket.
    for record in store.records() {
        let in_cat: usize = store
            .categories()
            .keys()
            .iter()
            .map(|k| store.categories().bucket(k).iter().filter(|id| **id == record.id).count())
            .sum();
        let in_user: usize = store
            .submitters()
            .keys()
            .iter()
            .map(|k| store.submitters().bucket(k).iter().filter(|id| **id == record.id).count())
            .sum();
        assert_eq!(in_cat, 1, "id {} category membership", record.id);
        assert_eq!(in_user, 1, "id {} submitter membership", record.id);
        assert!(store.categories().bucket(&record.category).contains(&record.id));
        assert!(store.submitters().bucket(&record.submitter).contains(&record.id));
    }
    assert_eq!(store.categories().entry_count() as u64, store.total_count());
    assert_eq!(store.submitters().entry_count() as u64, store.total_count());
}

#[test]
fn test_user_bucket_contains_each_id_once_in_order() {
    let mut store = RecordStore::default();
    let mut alice_ids = Vec::new();
    for i in 0..10u64 {
        let who = if i % 3 == 0 { bob() } else { alice() };
        let id = store.insert("q", "a", "c", &who, i).unwrap();
        if who == alice() {
            alice_ids.push(id);
        }
    }

    let q = QueryEngine::new(&store);
    let got: Vec<_> = q.get_user_quotes(&alice()).iter().map(|q| q.id).collect();
    assert_eq!(got, alice_ids);
}

// ─── Update ─────────────────────────────────────────────────────────────

#[test]
fn test_owner_update_changes_only_text_and_author() {
    let mut store = three_quotes();
    let before = store.get(2).unwrap().clone();

    store.update(2, "Updated Quote", "Updated Author", &alice()).unwrap();

    let after = store.get(2).unwrap();
    assert_eq!(after.text, "Updated Quote");
    assert_eq!(after.author, "Updated Author");
    assert_eq!(after.category, before.category);
    assert_eq!(after.submitter, before.submitter);
    assert_eq!(after.timestamp, before.timestamp);
    assert_eq!(after.is_active, before.is_active);
}

#[test]
fn test_non_owner_update_rejected_and_record_unchanged() {
    let mut store = three_quotes();
    let before = store.get(1).unwrap().clone();

    let err = store.update(1, "Hacked Quote", "Hacker", &bob()).unwrap_err();
    assert_eq!(err.kind(), QuoteErrorKind::Unauthorized);
    assert_eq!(err.reason(), "Not the quote owner");
    assert_eq!(store.get(1).unwrap(), &before);
}

#[test]
fn test_update_missing_is_not_found() {
    let mut store = three_quotes();
    assert_eq!(
        store.update(99, "t", "a", &alice()).unwrap_err(),
        QuoteError::NotFound { id: 99 }
    );
}

#[test]
fn test_update_does_not_move_index_entries() {
    let mut store = three_quotes();
    store.update(1, "x", "y", &alice()).unwrap();
    assert_eq!(store.categories().bucket("motivation"), &[1, 3]);
    assert_eq!(store.submitters().bucket(&alice()), &[1, 2, 3]);
}

// ─── Deactivate ─────────────────────────────────────────────────────────

#[test]
fn test_owner_deactivate() {
    let mut store = three_quotes();
    store.deactivate(1, &alice()).unwrap();

    assert_eq!(store.total_count(), 3);
    assert_eq!(store.active_count(), 2);
    let err = store.get(1).unwrap_err();
    assert_eq!(err, QuoteError::InactiveRecord { id: 1 });
    assert_eq!(err.reason(), "Quote is not active");
}

#[test]
fn test_non_owner_deactivate_rejected() {
    let mut store = three_quotes();
    let err = store.deactivate(1, &bob()).unwrap_err();

    assert_eq!(err.kind(), QuoteErrorKind::Unauthorized);
    assert!(store.get(1).unwrap().is_active);
    assert_eq!(store.active_count(), 3);
}

#[test]
fn test_deactivate_missing_is_not_found() {
    let mut store = three_quotes();
    assert_eq!(
        store.deactivate(0, &alice()).unwrap_err(),
        QuoteError::NotFound { id: 0 }
    );
}

#[test]
fn test_deactivated_record_cannot_be_updated() {
    let mut store = three_quotes();
    store.deactivate(3, &alice()).unwrap();
    assert_eq!(
        store.update(3, "t", "a", &alice()).unwrap_err(),
        QuoteError::InactiveRecord { id: 3 }
    );
    assert_eq!(store.record(3).unwrap().text, "Quote 3");
}

#[test]
fn test_bulk_views_exclude_deactivated() {
    let mut store = three_quotes();
    store.deactivate(2, &alice()).unwrap();
    let q = QueryEngine::new(&store);

    let all: Vec<_> = q.get_all_quotes().iter().map(|q| q.id).collect();
    assert_eq!(all, [1, 3]);
    assert!(q.get_quotes_by_category("wisdom").is_empty());
    assert_eq!(q.get_user_quotes(&alice()).len(), 2);
    assert_eq!(q.get_all_quotes().len() as u64, q.get_active_quote_count());
    // Audit access still sees the row.
    assert!(!q.get_quote_record(2).unwrap().is_active);
}
