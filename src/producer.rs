//! Producer: submit a request within a deadline, or abandon and try again.
//!
//! Each cycle races the queue reservation against the deadline. Only a
//! won reservation commits the request, so an abandoned request never
//! reaches a worker and no reply is left without a listener.

use opentelemetry::KeyValue;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

use crate::error::Result;
use crate::event::{EventKind, Journal};
use crate::model::{Completion, RequestId};
use crate::queue::{DispatchQueue, Submission};
use crate::simulator::{Activity, WorkSimulator};
use crate::telemetry::dispatch::{record_transition, start_request_span};
use crate::telemetry::metrics;

/// How a single cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed(Completion),
    Abandoned(RequestId),
}

/// What a producer did over its lifetime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProducerReport {
    pub producer: String,
    pub completed: u32,
    pub abandoned: u32,
    /// Completions in the order they were received.
    pub completions: Vec<Completion>,
}

/// Submits requests until it has completed `target` cycles.
pub struct Producer<S> {
    name: String,
    queue: Arc<DispatchQueue>,
    simulator: Arc<S>,
    journal: Journal,
    target: u32,
    deadline: Option<Duration>,
    consume_hint: u32,
    give_up_hint: u32,
}

impl<S: WorkSimulator> Producer<S> {
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
            target: 5,
            deadline: Some(Duration::from_secs(7)),
            consume_hint: 2,
            give_up_hint: 5,
        }
    }

    /// Number of successful cycles before the producer stops.
    pub fn target(mut self, target: u32) -> Self {
        self.target = target;
        self
    }

    /// Per-attempt submission deadline; `None` waits indefinitely.
    pub fn deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn hints(mut self, consume: u32, give_up: u32) -> Self {
        self.consume_hint = consume;
        self.give_up_hint = give_up;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run cycles until `target` of them completed.
    ///
    /// Abandoned cycles do not count and are retried with a fresh request.
    pub async fn run(self) -> Result<ProducerReport> {
        let mut report = ProducerReport {
            producer: self.name.clone(),
            ..Default::default()
        };

        while report.completed < self.target {
            match self.cycle().await? {
                CycleOutcome::Completed(completion) => {
                    report.completed += 1;
                    report.completions.push(completion);
                }
                CycleOutcome::Abandoned(_) => report.abandoned += 1,
            }
        }

        self.journal.emit(EventKind::ProducerFinished {
            producer: self.name.clone(),
            completed: report.completed,
            abandoned: report.abandoned,
        });
        Ok(report)
    }

    /// One submission attempt: a fresh request, raced against the deadline.
    pub async fn cycle(&self) -> Result<CycleOutcome> {
        let (request, reply) = self.queue.new_request(&self.name);
        let id = request.id();
        let span = start_request_span(&self.name, id);

        async {
            self.journal.emit(EventKind::RequestPlaced {
                id,
                origin: self.name.clone(),
            });

            match self.queue.submit_within(request, self.deadline).await? {
                Submission::Accepted(_) => {
                    record_transition(&span, "placed", "enqueued");
                    metrics::requests_submitted().add(1, &[KeyValue::new("result", "accepted")]);
                    self.journal.emit(EventKind::RequestAccepted {
                        id,
                        origin: self.name.clone(),
                    });

                    let completion = reply.wait().await?;
                    record_transition(&span, "enqueued", "completed");
                    let wait_ms = completion.wait_ms();
                    metrics::request_wait_ms().record(wait_ms as f64, &[]);
                    self.journal.emit(EventKind::RequestConsumed {
                        id,
                        producer: self.name.clone(),
                        serviced_by: completion.serviced_by.clone(),
                        wait_ms,
                    });

                    self.simulator
                        .perform(
                            self.consume_hint,
                            &Activity::Consuming {
                                producer: &self.name,
                                id,
                                serviced_by: completion.serviced_by.as_deref(),
                            },
                        )
                        .await;
                    Ok(CycleOutcome::Completed(completion))
                }
                Submission::Abandoned(_) => {
                    drop(reply);
                    record_transition(&span, "placed", "abandoned");
                    metrics::requests_submitted().add(1, &[KeyValue::new("result", "abandoned")]);
                    self.journal.emit(EventKind::RequestAbandoned {
                        id,
                        origin: self.name.clone(),
                    });

                    self.simulator
                        .perform(
                            self.give_up_hint,
                            &Activity::GivingUp {
                                producer: &self.name,
                                id,
                            },
                        )
                        .await;
                    Ok(CycleOutcome::Abandoned(id))
                }
            }
        }
        .instrument(span.clone())
        .await
    }
}
