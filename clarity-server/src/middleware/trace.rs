use axum::{
    body::Body,
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

pub static X_TRACE_ID: &str = "x-trace-id";

/// Wrap every request in an `http_request` span keyed by a trace ID.
///
/// The ID is taken from an incoming `x-trace-id` header when it parses as a
/// UUID, otherwise generated, and echoed on the response. Bodies are never
/// buffered here: chat and documentation responses are streams, and latency
/// is measured to the response head.
pub async fn trace_middleware(mut req: Request<Body>, next: Next) -> Response {
    let start_time = Instant::now();

    let trace_id = req
        .headers()
        .get(X_TRACE_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    let span = info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    async move {
        info!("→ request started");

        // A hyphenated UUID is always a valid header value.
        let header_value = HeaderValue::from_str(&trace_id.to_string()).ok();
        if let Some(value) = header_value.clone() {
            req.headers_mut().insert(X_TRACE_ID, value);
        }

        let mut response = next.run(req).await;

        if let Some(value) = header_value {
            response.headers_mut().insert(X_TRACE_ID, value);
        }

        info!(
            status = response.status().as_u16(),
            latency_ms = start_time.elapsed().as_millis(),
            "← response head sent"
        );

        response
    }
    .instrument(span)
    .await
}
