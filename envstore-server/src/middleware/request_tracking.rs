//! Request IDs and header masking
//!
//! Every request gets an `x-request-id` (kept if the caller sent one) that is
//! echoed on the response. Credentials in request headers are marked
//! sensitive so the trace layer does not log them.

use http::{header::HeaderName, HeaderValue, Request};
use tower_http::{
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    sensitive_headers::SetSensitiveRequestHeadersLayer,
};
use uuid::Uuid;

/// Headers that should be masked in logs
pub const SENSITIVE_HEADERS: &[&str] = &["authorization", "cookie", "set-cookie", "x-api-key"];

/// Generates time-sortable UUIDv7 request IDs, e.g. `req_0192f3c4-...`
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeUuidRequestId;

impl MakeRequestId for MakeUuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = format!("req_{}", Uuid::now_v7());
        let header_value = HeaderValue::from_str(&id).ok()?;
        Some(RequestId::new(header_value))
    }
}

/// Set `x-request-id` on requests that lack one
pub fn request_id_layer() -> SetRequestIdLayer<MakeUuidRequestId> {
    SetRequestIdLayer::x_request_id(MakeUuidRequestId)
}

/// Copy `x-request-id` from the request to the response
pub fn request_id_propagation_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}

/// Mark [`SENSITIVE_HEADERS`] as sensitive on incoming requests
pub fn sensitive_headers_layer() -> SetSensitiveRequestHeadersLayer {
    let headers = SENSITIVE_HEADERS
        .iter()
        .filter_map(|h| HeaderName::from_bytes(h.as_bytes()).ok())
        .collect::<Vec<_>>();

    SetSensitiveRequestHeadersLayer::new(headers)
}
