//! Proxy request handler
//!
//! Entry point for every inbound viewer request. Attaching to the session
//! either joins the live upstream connection or opens it.

use std::convert::Infallible;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::stream::StreamExt;

use crate::protocol::constants::{CACHE_CONTROL, EXPIRES, PRAGMA};
use crate::session::{Admission, ProxySession};

/// Relay the upstream MJPEG stream to the requesting viewer
///
/// Headers are only committed once the boundary is known, so a failed
/// attach can still be answered with `502 Bad Gateway`.
pub async fn proxy_request(State(session): State<ProxySession>) -> Response {
    match session.attach().await {
        Ok(admission) => {
            tracing::debug!(viewer_id = %admission.id(), "Streaming to viewer");
            mjpeg_response(admission)
        }
        Err(e) => {
            tracing::warn!(
                upstream = %session.upstream_url(),
                error = %e,
                "Viewer attach failed"
            );
            (StatusCode::BAD_GATEWAY, "MJPEG source unavailable\n").into_response()
        }
    }
}

/// Build the streaming multipart response for an admitted viewer
///
/// The response body owns the viewer stream; when the client goes away
/// the body is dropped and the viewer detaches.
pub fn mjpeg_response(admission: Admission) -> Response {
    let content_type = admission.boundary().content_type();
    let stream = admission.into_stream().map(Ok::<_, Infallible>);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::EXPIRES, EXPIRES)
        .header(header::CACHE_CONTROL, CACHE_CONTROL)
        .header(header::PRAGMA, PRAGMA)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from_stream(stream))
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to build viewer response");
            StatusCode::BAD_GATEWAY.into_response()
        })
}
