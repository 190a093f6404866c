//! Deterministic fingerprint of a logged mutation.
//!
//! `fingerprint = xxhash64(seq + kind + fields...)`
//!
//! Used to seal each log line so replay can detect torn or edited entries.
//! The byte layout is part of the on-disk format: do not reorder fields.

use xxhash_rust::xxh64::xxh64;

use crate::store::Mutation;

const SEP: u8 = 0xFF;

const KIND_INSERT: u8 = 1;
const KIND_UPDATE: u8 = 2;
const KIND_DEACTIVATE: u8 = 3;

/// Compute the fingerprint of `mutation` at log position `seq`.
pub fn mutation_fingerprint(seq: u64, mutation: &Mutation) -> u64 {
    // 0xFF cannot appear in UTF-8, so field boundaries are unambiguous.
    let mut buf = Vec::with_capacity(128);
    buf.extend_from_slice(&seq.to_le_bytes());
    buf.push(SEP);

    match mutation {
        Mutation::Insert(record) => {
            buf.push(KIND_INSERT);
            push_u64(&mut buf, record.id);
            push_str(&mut buf, &record.text);
            push_str(&mut buf, &record.author);
            push_str(&mut buf, &record.category);
            push_str(&mut buf, record.submitter.as_str());
            push_u64(&mut buf, record.timestamp);
            buf.push(u8::from(record.is_active));
        }
        Mutation::Update { id, text, author } => {
            buf.push(KIND_UPDATE);
            push_u64(&mut buf, *id);
            push_str(&mut buf, text);
            push_str(&mut buf, author);
        }
        Mutation::Deactivate { id } => {
            buf.push(KIND_DEACTIVATE);
            push_u64(&mut buf, *id);
        }
    }

    xxh64(&buf, 0)
}

/// Format a fingerprint as 16 lowercase hex digits.
pub fn format_fingerprint(hash: u64) -> String {
    format!("{hash:016x}")
}

fn push_str(buf: &mut Vec<u8>, value: &str) {
    buf.push(SEP);
    buf.extend_from_slice(value.as_bytes());
}

fn push_u64(buf: &mut Vec<u8>, value: u64) {
    buf.push(SEP);
    buf.extend_from_slice(&value.to_le_bytes());
}
