//! Append-only JSONL mutation log.
//!
//! One line per committed mutation:
//!
//! ```text
//! {"seq":1,"fingerprint":"9b1e...","event":{"kind":"quote_inserted","record":{...}}}
//! ```
//!
//! `seq` is dense from 1. `fingerprint` is the xxhash64 of the canonical
//! mutation bytes at that `seq`. Opening a log verifies both and fails with
//! `InvalidData` on the first mismatch.
//!
//! A failed append truncates any partial bytes it wrote, so the file never
//! holds a torn line written by this process. If that truncate fails too,
//! the handle is marked broken and refuses every later append: writing after
//! a torn line would merge the two and make the log unreadable. Reopening
//! the ledger is the only way out.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use quote_core::{Identity, Mutation, Quote, format_fingerprint, mutation_fingerprint};
use serde::{Deserialize, Serialize};

// --- On-disk records ----------------------------------------------------

/// Persisted form of a quote row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedQuote {
    pub id: u64,
    pub text: String,
    pub author: String,
    pub category: String,
    pub submitter: String,
    pub timestamp: u64,
    pub is_active: bool,
}

impl From<&Quote> for PersistedQuote {
    fn from(record: &Quote) -> Self {
        Self {
            id: record.id,
            text: record.text.clone(),
            author: record.author.clone(),
            category: record.category.clone(),
            submitter: record.submitter.as_str().to_string(),
            timestamp: record.timestamp,
            is_active: record.is_active,
        }
    }
}

impl From<PersistedQuote> for Quote {
    fn from(row: PersistedQuote) -> Self {
        Self {
            id: row.id,
            text: row.text,
            author: row.author,
            category: row.category,
            submitter: Identity::new(row.submitter),
            timestamp: row.timestamp,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum LogEvent {
    QuoteInserted {
        record: PersistedQuote,
    },
    QuoteUpdated {
        id: u64,
        text: String,
        author: String,
    },
    QuoteDeactivated {
        id: u64,
    },
}

impl From<&Mutation> for LogEvent {
    fn from(mutation: &Mutation) -> Self {
        match mutation {
            Mutation::Insert(record) => LogEvent::QuoteInserted {
                record: PersistedQuote::from(record),
            },
            Mutation::Update { id, text, author } => LogEvent::QuoteUpdated {
                id: *id,
                text: text.clone(),
                author: author.clone(),
            },
            Mutation::Deactivate { id } => LogEvent::QuoteDeactivated { id: *id },
        }
    }
}

impl From<LogEvent> for Mutation {
    fn from(event: LogEvent) -> Self {
        match event {
            LogEvent::QuoteInserted { record } => Mutation::Insert(record.into()),
            LogEvent::QuoteUpdated { id, text, author } => Mutation::Update { id, text, author },
            LogEvent::QuoteDeactivated { id } => Mutation::Deactivate { id },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct LogLine {
    seq: u64,
    fingerprint: String,
    event: LogEvent,
}

// --- Log handle ---------------------------------------------------------

/// Open, verified mutation log positioned for appends.
#[derive(Debug)]
pub struct MutationLog {
    path: PathBuf,
    file: File,
    next_seq: u64,
    fsync: bool,
    /// Set when a failed append could not be rolled back.
    broken: Option<String>,
}

impl MutationLog {
    /// Open (creating if needed) the log at `path` and return its verified
    /// mutations in order.
    pub fn open(path: impl AsRef<Path>, fsync: bool) -> io::Result<(Self, Vec<Mutation>)> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mutations = read_mutations(&path)?;
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let next_seq = mutations.len() as u64 + 1;

        Ok((
            Self {
                path,
                file,
                next_seq,
                fsync,
                broken: None,
            },
            mutations,
        ))
    }

    /// Sequence number the next append will use.
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    /// False once a failed append left bytes it could not remove.
    pub fn is_writable(&self) -> bool {
        self.broken.is_none()
    }

    /// Append one mutation. On error `next_seq` is unchanged and, unless the
    /// log is now broken, nothing is retained.
    pub fn append(&mut self, mutation: &Mutation) -> Result<u64, String> {
        if let Some(reason) = &self.broken {
            return Err(format!(
                "log {} is unusable until reopened: {reason}",
                self.path.display()
            ));
        }
        let seq = self.next_seq;
        let line = LogLine {
            seq,
            fingerprint: format_fingerprint(mutation_fingerprint(seq, mutation)),
            event: LogEvent::from(mutation),
        };
        let mut bytes =
            serde_json::to_vec(&line).map_err(|e| format!("failed to encode log line: {e}"))?;
        bytes.push(b'\n');

        let start = self
            .file
            .metadata()
            .map_err(|e| format!("failed to stat log {}: {e}", self.path.display()))?
            .len();

        if let Err(reason) = self.write_line(&bytes) {
            if let Err(e) = self.file.set_len(start) {
                tracing::warn!(
                    "log truncate after failed append failed path={} seq={} error={}",
                    self.path.display(),
                    seq,
                    e
                );
                self.broken = Some(format!("partial line at seq {seq} not rolled back: {e}"));
            }
            return Err(reason);
        }

        self.next_seq += 1;
        Ok(seq)
    }

    fn write_line(&mut self, bytes: &[u8]) -> Result<(), String> {
        self.file
            .write_all(bytes)
            .map_err(|e| format!("failed to write log {}: {e}", self.path.display()))?;
        self.file
            .flush()
            .map_err(|e| format!("failed to flush log {}: {e}", self.path.display()))?;
        if self.fsync {
            self.file
                .sync_data()
                .map_err(|e| format!("failed to fsync log {}: {e}", self.path.display()))?;
        }
        Ok(())
    }
}

/// Handle over a read-only file: every write fails. Lets tests drive the
/// append failure path.
#[cfg(test)]
pub(crate) fn read_only_log(path: &Path, next_seq: u64) -> io::Result<MutationLog> {
    Ok(MutationLog {
        path: path.to_path_buf(),
        file: File::open(path)?,
        next_seq,
        fsync: false,
        broken: None,
    })
}

fn read_mutations(path: &Path) -> io::Result<Vec<Mutation>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let reader = BufReader::new(file);

    let mut mutations = Vec::new();
    for (index, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let line_no = index + 1;
        let invalid = |reason: String| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid log line {line_no} in {}: {reason}", path.display()),
            )
        };

        let parsed: LogLine = serde_json::from_str(trimmed).map_err(|e| invalid(e.to_string()))?;
        let expected_seq = mutations.len() as u64 + 1;
        if parsed.seq != expected_seq {
            return Err(invalid(format!(
                "seq {} out of order, expected {expected_seq}",
                parsed.seq
            )));
        }

        let mutation = Mutation::from(parsed.event);
        let expected = format_fingerprint(mutation_fingerprint(parsed.seq, &mutation));
        if parsed.fingerprint != expected {
            return Err(invalid(format!(
                "fingerprint mismatch: stored {} computed {expected}",
                parsed.fingerprint
            )));
        }
        mutations.push(mutation);
    }

    Ok(mutations)
}
