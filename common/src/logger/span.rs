use std::fmt;
use std::net::SocketAddr;

use tracing::{Span, field};

use super::TraceId;

/// Root span for one client connection.
pub fn connection_span(trace_id: &TraceId, peer: SocketAddr) -> Span {
    tracing::info_span!(
        "connection",
        trace_id = %trace_id,
        peer = %peer,
        method = field::Empty
    )
}

/// Child span for a single RPC call on a connection.
///
/// Also records the method on the enclosing connection span so that
/// long-lived streams are identifiable from the root.
pub fn call_span<I: fmt::Display>(method: &'static str, request_id: Option<I>) -> Span {
    Span::current().record("method", method);

    let span = tracing::info_span!("call", method, request_id = field::Empty);
    if let Some(id) = request_id {
        span.record("request_id", field::display(id));
    }
    span
}
