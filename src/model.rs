//! Core data model.
//!
//! A request is one submission attempt by a producer. It has identity (a
//! queue-scoped sequential id), an origin, and a single-use reply slot that
//! the servicing worker writes exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::oneshot;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Request Id
// ---------------------------------------------------------------------------

/// Newtype for request ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Source of fresh request ids.
///
/// Implementations must never hand out the same id twice, even when called
/// from many tasks at once.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> RequestId;
}

/// Monotonic id generator backed by an atomic counter.
#[derive(Debug)]
pub struct AtomicIds {
    next: AtomicU64,
}

impl AtomicIds {
    /// Ids start at 1.
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }
}

impl Default for AtomicIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for AtomicIds {
    fn next_id(&self) -> RequestId {
        RequestId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A unit of work travelling from a producer, through the queue, to a worker.
///
/// Built only by [`DispatchQueue::new_request`](crate::queue::DispatchQueue::new_request).
/// Completing a request consumes it, so a reply can be written at most once.
#[derive(Debug)]
pub struct Request {
    id: RequestId,
    origin: String,
    serviced_by: Option<String>,
    placed_at: DateTime<Utc>,
    reply: oneshot::Sender<Completion>,
}

impl Request {
    pub(crate) fn new(id: RequestId, origin: &str) -> (Self, ReplyHandle) {
        let (tx, rx) = oneshot::channel();
        let request = Self {
            id,
            origin: origin.to_string(),
            serviced_by: None,
            placed_at: Utc::now(),
            reply: tx,
        };
        (request, ReplyHandle { id, rx })
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Name of the producer that created this request.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn serviced_by(&self) -> Option<&str> {
        self.serviced_by.as_deref()
    }

    pub fn placed_at(&self) -> DateTime<Utc> {
        self.placed_at
    }

    /// Record the worker that serviced this request.
    ///
    /// Set at most once: returns `false` and keeps the first value if the
    /// request was already stamped.
    pub fn stamp(&mut self, worker: &str) -> bool {
        if self.serviced_by.is_some() {
            return false;
        }
        self.serviced_by = Some(worker.to_string());
        true
    }

    /// Deliver the completion to the waiting producer.
    ///
    /// Never blocks. Returns the undelivered completion if the producer's
    /// reply handle is gone.
    pub fn complete(self) -> std::result::Result<(), Completion> {
        let completion = Completion {
            id: self.id,
            origin: self.origin,
            serviced_by: self.serviced_by,
            placed_at: self.placed_at,
            completed_at: Utc::now(),
        };
        self.reply.send(completion)
    }
}

/// What a producer receives once its request has been serviced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub id: RequestId,
    pub origin: String,
    pub serviced_by: Option<String>,
    pub placed_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl Completion {
    /// Milliseconds between placement and completion.
    pub fn wait_ms(&self) -> u64 {
        (self.completed_at - self.placed_at)
            .num_milliseconds()
            .max(0) as u64
    }
}

/// The producer's end of a request's reply slot.
#[derive(Debug)]
pub struct ReplyHandle {
    id: RequestId,
    rx: oneshot::Receiver<Completion>,
}

impl ReplyHandle {
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Wait for the worker's completion.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReplyDropped`] if the request was dropped without
    /// being completed.
    pub async fn wait(self) -> Result<Completion> {
        self.rx.await.map_err(|_| Error::ReplyDropped(self.id))
    }
}
