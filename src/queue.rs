//! Bounded FIFO dispatch queue shared by producers and workers.
//!
//! Backed by a bounded tokio `mpsc` channel. Submission is two-phase: a
//! producer first reserves a slot (the only step that waits), then commits
//! its request into it synchronously. A deadline can therefore only cancel
//! the reservation, never a half-finished enqueue.

use opentelemetry::KeyValue;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{AtomicIds, IdGenerator, ReplyHandle, Request, RequestId};
use crate::telemetry::metrics;

/// Outcome of a deadline-bounded submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// The request is in the queue; its reply handle will resolve.
    Accepted(RequestId),
    /// The deadline elapsed before a slot freed up. The request was dropped
    /// and never entered the queue.
    Abandoned(RequestId),
}

/// A reserved queue slot. Dropping it without committing frees the slot.
#[derive(Debug)]
pub struct Slot<'a> {
    permit: mpsc::Permit<'a, Request>,
}

impl Slot<'_> {
    /// Place the request into the reserved slot. Cannot fail or wait.
    pub fn commit(self, request: Request) -> RequestId {
        let id = request.id();
        self.permit.send(request);
        record_op("commit");
        id
    }
}

/// The bounded channel between producers and workers.
pub struct DispatchQueue {
    tx: mpsc::Sender<Request>,
    rx: Mutex<mpsc::Receiver<Request>>,
    ids: Arc<dyn IdGenerator>,
    capacity: usize,
}

impl DispatchQueue {
    /// Create a queue holding at most `capacity` pending requests.
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_ids(capacity, Arc::new(AtomicIds::new()))
    }

    /// Create a queue that draws request ids from `ids`.
    pub fn with_ids(capacity: usize, ids: Arc<dyn IdGenerator>) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::Config(
                "dispatch queue capacity must be at least 1".to_string(),
            ));
        }
        let (tx, rx) = mpsc::channel(capacity);
        Ok(Self {
            tx,
            rx: Mutex::new(rx),
            ids,
            capacity,
        })
    }

    /// Build a fresh request with the next id and its reply handle.
    pub fn new_request(&self, origin: &str) -> (Request, ReplyHandle) {
        Request::new(self.ids.next_id(), origin)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Pending requests, counting reserved but uncommitted slots.
    pub fn len(&self) -> usize {
        self.capacity - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait for a free slot and hold it.
    ///
    /// Waiters are served in arrival order. Cancel-safe: dropping the
    /// future before it resolves leaves the queue untouched.
    pub async fn reserve(&self) -> Result<Slot<'_>> {
        let permit = self.tx.reserve().await.map_err(|_| Error::QueueClosed)?;
        Ok(Slot { permit })
    }

    /// Enqueue `request`, waiting as long as the queue is full.
    pub async fn submit(&self, request: Request) -> Result<()> {
        let slot = self.reserve().await?;
        slot.commit(request);
        Ok(())
    }

    /// Enqueue `request` unless `deadline` elapses first.
    ///
    /// `None` waits indefinitely. Exactly one outcome takes effect: an
    /// abandoned request is dropped here and can never reach a worker.
    pub async fn submit_within(
        &self,
        request: Request,
        deadline: Option<Duration>,
    ) -> Result<Submission> {
        let id = request.id();
        let slot = match deadline {
            None => self.reserve().await?,
            Some(deadline) => match tokio::time::timeout(deadline, self.reserve()).await {
                Ok(slot) => slot?,
                Err(_) => {
                    drop(request);
                    record_op("abandon");
                    debug!(id = %id, "reservation timed out");
                    return Ok(Submission::Abandoned(id));
                }
            },
        };
        slot.commit(request);
        Ok(Submission::Accepted(id))
    }

    /// Wait for the next request in FIFO order.
    ///
    /// Consumers queue on the receiver lock in arrival order, so idle
    /// workers take turns.
    pub async fn take(&self) -> Result<Request> {
        let mut rx = self.rx.lock().await;
        let request = rx.recv().await.ok_or(Error::QueueClosed)?;
        record_op("take");
        Ok(request)
    }

    /// Take a request if one is immediately available.
    pub fn try_take(&self) -> Option<Request> {
        let mut rx = self.rx.try_lock().ok()?;
        let request = rx.try_recv().ok()?;
        record_op("take");
        Some(request)
    }
}

impl std::fmt::Debug for DispatchQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchQueue")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

fn record_op(operation: &'static str) {
    metrics::queue_operations().add(1, &[KeyValue::new("operation", operation)]);
}
