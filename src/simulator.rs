//! Simulated work.
//!
//! Workers and producers hand each "do something for a while" step to a
//! [`WorkSimulator`]. The simulator only decides how long the caller is
//! suspended; reporting happens elsewhere.

use std::time::Duration;
use uuid::Uuid;

use crate::model::RequestId;

/// The step being simulated, with its participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity<'a> {
    /// A worker servicing a request.
    Servicing {
        worker: &'a str,
        id: RequestId,
        origin: &'a str,
    },
    /// A producer consuming a completed request.
    Consuming {
        producer: &'a str,
        id: RequestId,
        serviced_by: Option<&'a str>,
    },
    /// A producer recovering after abandoning a request.
    GivingUp { producer: &'a str, id: RequestId },
}

/// Suspends the caller for a duration derived from `hint`.
pub trait WorkSimulator: Send + Sync + 'static {
    fn perform(&self, hint: u32, activity: &Activity<'_>) -> impl Future<Output = ()> + Send;
}

/// Sleeps between `unit * hint` and `2 * unit * hint`.
#[derive(Debug, Clone, Copy)]
pub struct SleepSimulator {
    unit: Duration,
}

impl SleepSimulator {
    pub fn new(unit: Duration) -> Self {
        Self { unit }
    }

    pub fn duration_for(&self, hint: u32) -> Duration {
        let base = self.unit * hint;
        let span_ms = base.as_millis();
        if span_ms == 0 {
            return base;
        }
        let jitter_ms = Uuid::new_v4().as_u128() % span_ms;
        base + Duration::from_millis(jitter_ms as u64)
    }
}

impl WorkSimulator for SleepSimulator {
    async fn perform(&self, hint: u32, _activity: &Activity<'_>) {
        tokio::time::sleep(self.duration_for(hint)).await;
    }
}

/// Sleeps exactly `unit * hint`. Useful with paused test clocks.
#[derive(Debug, Clone, Copy)]
pub struct FixedSimulator {
    unit: Duration,
}

impl FixedSimulator {
    pub fn new(unit: Duration) -> Self {
        Self { unit }
    }
}

impl WorkSimulator for FixedSimulator {
    async fn perform(&self, hint: u32, _activity: &Activity<'_>) {
        tokio::time::sleep(self.unit * hint).await;
    }
}

/// Returns immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSimulator;

impl WorkSimulator for NoopSimulator {
    async fn perform(&self, _hint: u32, _activity: &Activity<'_>) {}
}
