//! Coordinator: build the queue, start workers and producers, wait for the
//! producers to finish, then stop the workers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::DispatchConfig;
use crate::error::{Error, Result};
use crate::event::{EventKind, Journal, Reporter};
use crate::model::{AtomicIds, IdGenerator};
use crate::producer::{Producer, ProducerReport};
use crate::queue::DispatchQueue;
use crate::simulator::WorkSimulator;
use crate::worker::Worker;

/// Outcome of a full run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Producer reports in the order the producers finished.
    pub producers: Vec<ProducerReport>,
    /// Requests serviced per worker.
    pub workers: BTreeMap<String, u64>,
    pub completed: u32,
    pub abandoned: u32,
    pub elapsed_ms: u64,
}

/// Drives one run of the dispatch system.
pub struct Coordinator<S> {
    config: DispatchConfig,
    simulator: Arc<S>,
    journal: Journal,
    ids: Arc<dyn IdGenerator>,
    shutdown: CancellationToken,
}

impl<S: WorkSimulator> Coordinator<S> {
    pub fn new(config: DispatchConfig, simulator: S, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            config,
            simulator: Arc::new(simulator),
            journal: Journal::new(reporter),
            ids: Arc::new(AtomicIds::new()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Use `ids` as the request id source for the run's queue.
    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Token that interrupts the run when cancelled.
    pub fn shutdown_handle(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Run until every producer reaches its target.
    ///
    /// # Errors
    ///
    /// Fails fast on invalid configuration (including an empty worker
    /// roster), returns [`Error::Interrupted`] if the shutdown handle fires
    /// first, and propagates the first producer or task failure.
    pub async fn run(&self) -> Result<RunSummary> {
        self.config.validate()?;
        let started = Instant::now();
        let queue = Arc::new(DispatchQueue::with_ids(
            self.config.capacity,
            Arc::clone(&self.ids),
        )?);

        info!(
            capacity = self.config.capacity,
            workers = self.config.workers.len(),
            producers = self.config.producers.len(),
            target = self.config.target,
            deadline_ms = self.config.deadline_ms,
            "dispatch starting"
        );

        let stop_workers = self.shutdown.child_token();
        let mut workers = JoinSet::new();
        for name in &self.config.workers {
            let worker = Worker::new(
                name.clone(),
                Arc::clone(&queue),
                Arc::clone(&self.simulator),
                self.journal.clone(),
            )
            .service_hint(self.config.service_hint);
            let token = stop_workers.clone();
            let name = name.clone();
            workers.spawn(async move { (name, worker.run(token).await) });
        }

        let mut producers = JoinSet::new();
        for name in &self.config.producers {
            let producer = Producer::new(
                name.clone(),
                Arc::clone(&queue),
                Arc::clone(&self.simulator),
                self.journal.clone(),
            )
            .target(self.config.target)
            .deadline(self.config.deadline())
            .hints(self.config.consume_hint, self.config.give_up_hint);
            producers.spawn(producer.run());
        }

        let mut reports = Vec::with_capacity(self.config.producers.len());
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    warn!(finished = reports.len(), "dispatch interrupted");
                    producers.abort_all();
                    workers.abort_all();
                    return Err(Error::Interrupted);
                }
                joined = producers.join_next() => match joined {
                    Some(report) => reports.push(report??),
                    None => break,
                },
            }
        }

        info!("all producers finished, stopping workers");
        stop_workers.cancel();
        let mut serviced = BTreeMap::new();
        while let Some(joined) = workers.join_next().await {
            let (name, count) = joined?;
            serviced.insert(name, count?);
        }

        self.journal.emit(EventKind::Closing);
        let summary = RunSummary {
            completed: reports.iter().map(|r| r.completed).sum(),
            abandoned: reports.iter().map(|r| r.abandoned).sum(),
            producers: reports,
            workers: serviced,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            completed = summary.completed,
            abandoned = summary.abandoned,
            elapsed_ms = summary.elapsed_ms,
            "dispatch closing"
        );
        Ok(summary)
    }
}
