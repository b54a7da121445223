//! Response framing for relayed generation streams.
//!
//! Two encodings of the same [`RelayChunk`] stream:
//!
//! - `text/plain` (default): text chunks verbatim, an error as a single
//!   `Error: <message>` chunk. This is what the reference front-end reads.
//! - `text/event-stream` (when the client sends `Accept: text/event-stream`):
//!   `event: text` / `event: error` frames with JSON data, then `event: done`,
//!   so consumers can tell failures from content without string sniffing.

use std::convert::Infallible;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use clarity_core::RelayChunk;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::json;
use tracing::{Instrument, Span};

/// Whether the client asked for framed server-sent events.
pub fn wants_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|v| {
            v.split(';')
                .next()
                .is_some_and(|m| m.trim().eq_ignore_ascii_case("text/event-stream"))
        })
}

/// Encode `chunks` according to the request's `Accept` header.
///
/// The body is polled after the handler returns, so the caller's span is
/// carried along; relay events keep the request's trace ID.
pub fn respond(headers: &HeaderMap, chunks: BoxStream<'static, RelayChunk>) -> Response {
    let chunks = in_span(chunks, Span::current());
    if wants_event_stream(headers) {
        event_stream(chunks)
    } else {
        plain_text(chunks)
    }
}

fn in_span(chunks: BoxStream<'static, RelayChunk>, span: Span) -> BoxStream<'static, RelayChunk> {
    stream::unfold(chunks, move |mut chunks| {
        async move { chunks.next().await.map(|chunk| (chunk, chunks)) }.instrument(span.clone())
    })
    .boxed()
}

fn plain_text(chunks: BoxStream<'static, RelayChunk>) -> Response {
    let body = chunks.map(|chunk| Ok::<Bytes, Infallible>(Bytes::from(chunk.into_plain_text())));
    let mut response = Body::from_stream(body).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

fn event_stream(chunks: BoxStream<'static, RelayChunk>) -> Response {
    let events = chunks
        .map(to_event)
        .chain(stream::once(async { Event::default().event("done").data("{}") }))
        .map(Ok::<Event, Infallible>);
    Sse::new(events).into_response()
}

fn to_event(chunk: RelayChunk) -> Event {
    match chunk {
        RelayChunk::Text(text) => Event::default()
            .event("text")
            .data(json!({ "text": text }).to_string()),
        RelayChunk::Error(message) => Event::default()
            .event("error")
            .data(json!({ "error": message }).to_string()),
    }
}
