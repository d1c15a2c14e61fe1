//! Request span helpers.

use tracing::Span;

use crate::model::RequestId;

/// Start a span covering one submission attempt.
///
/// `request.state` starts empty and is filled by [`record_transition`].
pub fn start_request_span(origin: &str, id: RequestId) -> Span {
    tracing::info_span!(
        "request.submit",
        "request.origin" = origin,
        "request.id" = id.0,
        "request.state" = tracing::field::Empty,
    )
}

/// Start a span covering one worker servicing a request.
pub fn start_service_span(worker: &str, id: RequestId) -> Span {
    tracing::info_span!("request.service", "worker" = worker, "request.id" = id.0)
}

/// Record a lifecycle transition on `span`.
pub fn record_transition(span: &Span, from: &str, to: &str) {
    span.record("request.state", to);
    span.in_scope(|| {
        tracing::debug!(from = from, to = to, "state_transition");
    });
}
