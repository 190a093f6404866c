//! Insert notifications for external observers.
//!
//! Only a committed insert produces an event. Updates, deactivations and
//! rejected operations are silent.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::mpsc::Sender;

use crate::quote::{Identity, Quote, QuoteId};

/// Published after an insert commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteAdded {
    pub id: QuoteId,
    pub text: String,
    pub author: String,
    pub submitter: Identity,
    pub category: String,
    pub timestamp: u64,
}

impl From<&Quote> for QuoteAdded {
    fn from(record: &Quote) -> Self {
        Self {
            id: record.id,
            text: record.text.clone(),
            author: record.author.clone(),
            submitter: record.submitter.clone(),
            category: record.category.clone(),
            timestamp: record.timestamp,
        }
    }
}

/// Receiver of insert notifications.
///
/// Called synchronously, in commit order. Implementations must not call
/// mutating ledger operations from inside the callback.
pub trait QuoteEventSink: Send + Sync {
    fn on_quote_added(&self, event: &QuoteAdded);
}

/// Handle returned by [`EventEmitter::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Fan-out to registered sinks.
#[derive(Default)]
pub struct EventEmitter {
    sinks: Vec<(SubscriptionId, Box<dyn QuoteEventSink>)>,
    next_subscription: u64,
    emitted_total: u64,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `sink`. It receives every event emitted from now on.
    pub fn subscribe(&mut self, sink: Box<dyn QuoteEventSink>) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.sinks.push((id, sink));
        id
    }

    /// Returns `false` if the subscription was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.sinks.len();
        self.sinks.retain(|(sub, _)| *sub != id);
        self.sinks.len() != before
    }

    /// Number of registered sinks.
    pub fn subscriber_count(&self) -> usize {
        self.sinks.len()
    }

    /// Number of events emitted over the emitter's lifetime.
    pub fn emitted_total(&self) -> u64 {
        self.emitted_total
    }

    /// Deliver `event` to every sink, in subscription order.
    pub fn emit(&mut self, event: &QuoteAdded) {
        self.emitted_total += 1;
        for (_, sink) in &self.sinks {
            sink.on_quote_added(event);
        }
    }
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("subscribers", &self.sinks.len())
            .field("emitted_total", &self.emitted_total)
            .finish()
    }
}

// --- Built-in sinks -----------------------------------------------------

/// Bounded in-memory append log for polling consumers.
///
/// Oldest events are dropped once `capacity` is reached; `dropped_total`
/// tells a poller it fell behind.
#[derive(Debug)]
pub struct EventLog {
    state: Mutex<EventLogState>,
    capacity: usize,
}

#[derive(Debug, Default)]
struct EventLogState {
    events: VecDeque<QuoteAdded>,
    dropped_total: u64,
}

impl EventLog {
    /// Log retaining at most `capacity` events. Zero retains nothing.
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(EventLogState::default()),
            capacity,
        }
    }

    /// Retained events with `id > after_id`, oldest first.
    pub fn events_since(&self, after_id: QuoteId) -> Vec<QuoteAdded> {
        self.state
            .lock()
            .expect("event log mutex poisoned")
            .events
            .iter()
            .filter(|e| e.id > after_id)
            .cloned()
            .collect()
    }

    /// Events currently retained.
    pub fn len(&self) -> usize {
        self.state.lock().expect("event log mutex poisoned").events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Events evicted because the log was full.
    pub fn dropped_total(&self) -> u64 {
        self.state
            .lock()
            .expect("event log mutex poisoned")
            .dropped_total
    }
}

impl QuoteEventSink for EventLog {
    fn on_quote_added(&self, event: &QuoteAdded) {
        if self.capacity == 0 {
            return;
        }
        let mut state = self.state.lock().expect("event log mutex poisoned");
        if state.events.len() >= self.capacity {
            state.events.pop_front();
            state.dropped_total += 1;
        }
        state.events.push_back(event.clone());
    }
}

impl<T: QuoteEventSink + ?Sized> QuoteEventSink for std::sync::Arc<T> {
    fn on_quote_added(&self, event: &QuoteAdded) {
        (**self).on_quote_added(event);
    }
}

/// Forwards events into an mpsc channel for reactive consumers.
///
/// A hung-up receiver is not an error: the event is dropped.
#[derive(Debug)]
pub struct ChannelSink {
    tx: Mutex<Sender<QuoteAdded>>,
}

impl ChannelSink {
    /// Forward every event into `tx`.
    pub fn new(tx: Sender<QuoteAdded>) -> Self {
        Self { tx: Mutex::new(tx) }
    }
}

impl QuoteEventSink for ChannelSink {
    fn on_quote_added(&self, event: &QuoteAdded) {
        let tx = self.tx.lock().expect("channel sink mutex poisoned");
        if tx.send(event.clone()).is_err() {
            tracing::debug!("QuoteAdded receiver disconnected id={}", event.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::mpsc;

    fn added(id: QuoteId) -> QuoteAdded {
        QuoteAdded {
            id,
            text: format!("q{id}"),
            author: "a".to_string(),
            submitter: Identity::from("alice"),
            category: "c".to_string(),
            timestamp: 0,
        }
    }

    #[test]
    fn log_returns_events_after_cursor() {
        let log = Arc::new(EventLog::new(10));
        let mut emitter = EventEmitter::new();
        emitter.subscribe(Box::new(log.clone()));

        for id in 1..=3 {
            emitter.emit(&added(id));
        }
        let ids: Vec<_> = log.events_since(1).iter().map(|e| e.id).collect();
        assert_eq!(ids, [2, 3]);
        assert_eq!(emitter.emitted_total(), 3);
    }

    #[test]
    fn log_drops_oldest_when_full() {
        let log = EventLog::new(2);
        for id in 1..=3 {
            log.on_quote_added(&added(id));
        }
        let ids: Vec<_> = log.events_since(0).iter().map(|e| e.id).collect();
        assert_eq!(ids, [2, 3]);
        assert_eq!(log.dropped_total(), 1);
    }

    #[test]
    fn unsubscribed_sink_stops_receiving() {
        let log = Arc::new(EventLog::new(10));
        let mut emitter = EventEmitter::new();
        let sub = emitter.subscribe(Box::new(log.clone()));

        emitter.emit(&added(1));
        assert!(emitter.unsubscribe(sub));
        assert!(!emitter.unsubscribe(sub));
        emitter.emit(&added(2));

        assert_eq!(log.len(), 1);
        assert_eq!(emitter.subscriber_count(), 0);
    }

    #[test]
    fn channel_sink_survives_dropped_receiver() {
        let (tx, rx) = mpsc::channel();
        let sink = ChannelSink::new(tx);
        sink.on_quote_added(&added(1));
        assert_eq!(rx.recv().unwrap().id, 1);

        drop(rx);
        sink.on_quote_added(&added(2));
    }

    #[test]
    fn event_copies_record_fields() {
        let record = Quote {
            id: 4,
            text: "t".to_string(),
            author: "a".to_string(),
            category: "wisdom".to_string(),
            submitter: Identity::from("bob"),
            timestamp: 99,
            is_active: true,
        };
        let event = QuoteAdded::from(&record);
        assert_eq!(event.id, 4);
        assert_eq!(event.submitter, Identity::from("bob"));
        assert_eq!(event.category, "wisdom");
        assert_eq!(event.timestamp, 99);
    }
}
