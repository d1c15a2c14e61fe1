//! Metric instrument factories for dispatchq.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! Without an exporter the global provider is a no-op.

use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("dispatchq")
}

/// Counter: dispatch queue operations.
/// Labels: `operation` ("commit" | "take" | "abandon").
pub fn queue_operations() -> Counter<u64> {
    meter()
        .u64_counter("dispatchq.queue.operations")
        .with_description("Number of dispatch queue operations")
        .build()
}

/// Counter: requests placed by producers.
/// Labels: `result` ("accepted" | "abandoned").
pub fn requests_submitted() -> Counter<u64> {
    meter()
        .u64_counter("dispatchq.requests.submitted")
        .with_description("Number of submission attempts")
        .build()
}

/// Counter: requests serviced by workers.
/// Labels: `worker`.
pub fn requests_completed() -> Counter<u64> {
    meter()
        .u64_counter("dispatchq.requests.completed")
        .with_description("Number of requests serviced")
        .build()
}

/// Counter: completions that found no waiting producer.
pub fn replies_undelivered() -> Counter<u64> {
    meter()
        .u64_counter("dispatchq.replies.undelivered")
        .with_description("Completions with no listener")
        .build()
}

/// Histogram: time from placement to completion, in milliseconds.
pub fn request_wait_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("dispatchq.request.wait_ms")
        .with_description("Request placement to completion")
        .with_unit("ms")
        .build()
}
