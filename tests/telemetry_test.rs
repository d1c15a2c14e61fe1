//! Integration tests for telemetry initialization and span helpers.

use dispatchq::model::RequestId;
use dispatchq::telemetry::dispatch::{record_transition, start_request_span, start_service_span};

#[test]
fn telemetry_initializes_without_endpoint() {
    // A global subscriber can only be set once per process; a second
    // init returns Err instead of panicking, which is acceptable here.
    let config = dispatchq::telemetry::TelemetryConfig {
        endpoint: None,
        service_name: "dispatchq-test".to_string(),
        log_level: "debug".to_string(),
    };
    if let Ok(guard) = dispatchq::telemetry::init_telemetry(config) {
        assert!(!guard.is_exporting());
        guard.force_flush();
    }
}

#[test]
fn request_span_records_transitions() {
    let span = start_request_span("Ani", RequestId(1));
    record_transition(&span, "placed", "enqueued");
    record_transition(&span, "enqueued", "completed");
}

#[test]
fn service_span_creates() {
    let span = start_service_span("Remy", RequestId(2));
    span.in_scope(|| tracing::info!("servicing"));
}
