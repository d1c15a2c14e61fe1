//! Worker loop: take a request, service it, reply.

use opentelemetry::KeyValue;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, warn};

use crate::error::Result;
use crate::event::{EventKind, Journal};
use crate::model::Request;
use crate::queue::DispatchQueue;
use crate::simulator::{Activity, WorkSimulator};
use crate::telemetry::dispatch::start_service_span;
use crate::telemetry::metrics;

/// A long-lived consumer of the dispatch queue.
pub struct Worker<S> {
    name: String,
    queue: Arc<DispatchQueue>,
    simulator: Arc<S>,
    journal: Journal,
    service_hint: u32,
}

impl<S: WorkSimulator> Worker<S> {
    pub fn new(
        name: impl Into<String>,
        queue: Arc<DispatchQueue>,
        simulator: Arc<S>,
        journal: Journal,
    ) -> Self {
        Self {
            name: name.into(),
            queue,
            simulator,
            journal,
            service_hint: 10,
        }
    }

    pub fn service_hint(mut self, hint: u32) -> Self {
        self.service_hint = hint;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Service requests until `shutdown` is cancelled.
    ///
    /// Cancellation is only observed while waiting for the next request;
    /// a request already taken is always serviced and answered. Returns the
    /// number of requests serviced.
    pub async fn run(self, shutdown: CancellationToken) -> Result<u64> {
        self.journal.emit(EventKind::WorkerStarted {
            worker: self.name.clone(),
        });

        let mut serviced = 0u64;
        loop {
            let request = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                request = self.queue.take() => request?,
            };
            self.service(request).await;
            serviced += 1;
        }

        debug!(worker = %self.name, "shutdown observed");
        self.journal.emit(EventKind::WorkerStopped {
            worker: self.name.clone(),
            serviced,
        });
        Ok(serviced)
    }

    /// Service one request and deliver its completion.
    ///
    /// Returns whether a producer was still listening. A request only
    /// reaches a worker after a committed enqueue, so this is always `true`
    /// unless the producer task itself was torn down.
    pub async fn service(&self, mut request: Request) -> bool {
        let id = request.id();
        let span = start_service_span(&self.name, id);

        async {
            self.journal.emit(EventKind::RequestServicing {
                id,
                origin: request.origin().to_string(),
                worker: self.name.clone(),
            });
            self.simulator
                .perform(
                    self.service_hint,
                    &Activity::Servicing {
                        worker: &self.name,
                        id,
                        origin: request.origin(),
                    },
                )
                .await;

            request.stamp(&self.name);
            match request.complete() {
                Ok(()) => {
                    metrics::requests_completed()
                        .add(1, &[KeyValue::new("worker", self.name.clone())]);
                    self.journal.emit(EventKind::RequestCompleted {
                        id,
                        worker: self.name.clone(),
                    });
                    true
                }
                Err(undelivered) => {
                    metrics::replies_undelivered().add(1, &[]);
                    warn!(
                        id = %undelivered.id,
                        origin = %undelivered.origin,
                        "completion has no listener, discarding"
                    );
                    false
                }
            }
        }
        .instrument(span)
        .await
    }
}
