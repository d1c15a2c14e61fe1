//! Structured progress events.
//!
//! Producers, workers, and the coordinator narrate what they do through a
//! [`Journal`]. Events are purely observational: reporters must not block
//! and nothing in the dispatch path depends on them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::model::RequestId;

/// A structured event emitted during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic sequence number. Consumers can detect gaps.
    pub seq: u64,
    /// When this event occurred.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    WorkerStarted {
        worker: String,
    },
    WorkerStopped {
        worker: String,
        serviced: u64,
    },
    RequestPlaced {
        id: RequestId,
        origin: String,
    },
    RequestAccepted {
        id: RequestId,
        origin: String,
    },
    RequestServicing {
        id: RequestId,
        origin: String,
        worker: String,
    },
    RequestCompleted {
        id: RequestId,
        worker: String,
    },
    RequestConsumed {
        id: RequestId,
        producer: String,
        serviced_by: Option<String>,
        wait_ms: u64,
    },
    RequestAbandoned {
        id: RequestId,
        origin: String,
    },
    ProducerFinished {
        producer: String,
        completed: u32,
        abandoned: u32,
    },
    Closing,
}

/// Sink for progress events.
pub trait Reporter: Send + Sync {
    fn report(&self, event: &Event);
}

/// Writes each event as a `tracing` record.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, event: &Event) {
        let seq = event.seq;
        match &event.kind {
            EventKind::WorkerStarted { worker } => info!(seq, worker = %worker, "starting work"),
            EventKind::WorkerStopped { worker, serviced } => {
                info!(seq, worker = %worker, serviced, "worker stopped")
            }
            EventKind::RequestPlaced { id, origin } => {
                info!(seq, %id, origin = %origin, "placed request")
            }
            EventKind::RequestAccepted { id, origin } => {
                debug!(seq, %id, origin = %origin, "request accepted")
            }
            EventKind::RequestServicing { id, origin, worker } => {
                info!(seq, %id, origin = %origin, worker = %worker, "servicing request")
            }
            EventKind::RequestCompleted { id, worker } => {
                debug!(seq, %id, worker = %worker, "request completed")
            }
            EventKind::RequestConsumed {
                id,
                producer,
                serviced_by,
                wait_ms,
            } => info!(
                seq,
                %id,
                producer = %producer,
                serviced_by = serviced_by.as_deref().unwrap_or("-"),
                wait_ms,
                "consuming completed request"
            ),
            EventKind::RequestAbandoned { id, origin } => {
                warn!(seq, %id, origin = %origin, "waited too long, abandoning request")
            }
            EventKind::ProducerFinished {
                producer,
                completed,
                abandoned,
            } => info!(seq, producer = %producer, completed, abandoned, "going home"),
            EventKind::Closing => info!(seq, "dispatch closing"),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    events: Mutex<Vec<Event>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events recorded so far, in report order.
    pub fn events(&self) -> Vec<Event> {
        self.lock().clone()
    }

    /// Number of recorded events matching `pred`.
    pub fn count(&self, pred: impl Fn(&EventKind) -> bool) -> usize {
        self.lock().iter().filter(|e| pred(&e.kind)).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Event>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Reporter for MemoryReporter {
    fn report(&self, event: &Event) {
        self.lock().push(event.clone());
    }
}

/// Stamps events with a sequence number and timestamp and forwards them.
#[derive(Clone)]
pub struct Journal {
    reporter: Arc<dyn Reporter>,
    seq: Arc<AtomicU64>,
}

impl Journal {
    pub fn new(reporter: Arc<dyn Reporter>) -> Self {
        Self {
            reporter,
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn emit(&self, kind: EventKind) {
        let event = Event {
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            timestamp: Utc::now(),
            kind,
        };
        self.reporter.report(&event);
    }
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal")
            .field("seq", &self.seq.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn journal_numbers_events_in_order() {
        let memory = Arc::new(MemoryReporter::new());
        let journal = Journal::new(memory.clone());
        journal.emit(EventKind::Closing);
        journal.emit(EventKind::WorkerStarted {
            worker: "Remy".to_string(),
        });

        let seqs: Vec<u64> = memory.events().iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![0, 1]);
        assert_eq!(
            memory.count(|k| matches!(k, EventKind::WorkerStarted { .. })),
            1
        );
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let kind = EventKind::RequestAbandoned {
            id: RequestId(9),
            origin: "Eve".to_string(),
        };
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["type"], "request_abandoned");
        assert_eq!(json["id"], 9);
    }
}
