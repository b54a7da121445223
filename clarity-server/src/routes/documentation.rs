//! Code documentation route.
//!
//! Sends the submitted code to the documentation model in one-shot streaming
//! mode and relays the generated Markdown as it arrives.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};
use clarity_core::profile::documentation_prompt;
use clarity_core::{GenerateRequest, ModelProfile, PromptContent};
use tracing::info;
use utoipa::OpenApi;
use validator::Validate;

use crate::error::ServerError;
use crate::schemas::docs::DocRequest;
use crate::state::AppState;
use crate::streaming;

/// Maximum accepted code length in bytes.
const MAX_CODE_BYTES: usize = 128 * 1024; // 128 KiB

#[derive(OpenApi)]
#[openapi(paths(generate_docs), components(schemas(DocRequest)))]
pub struct DocumentationApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/generate-docs", post(generate_docs))
}

/// Generate Markdown documentation for a code snippet (`POST /generate-docs`).
///
/// The body is a stream: Markdown text, or a single `Error: ...` chunk
/// (framed `error` event with `Accept: text/event-stream`).
#[utoipa::path(
    post,
    path = "/generate-docs",
    tag = "documentation",
    request_body = DocRequest,
    responses(
        (status = 200, description = "Streamed Markdown documentation", body = String, content_type = "text/plain"),
        (status = 400, description = "Code too large or body not valid JSON"),
        (status = 415, description = "Body is not `application/json`"),
        (status = 422, description = "Code missing or empty"),
    )
)]
pub async fn generate_docs(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<DocRequest>, JsonRejection>,
) -> Result<Response, ServerError> {
    let Json(req) = payload?;
    req.validate()?;

    if req.code.len() > MAX_CODE_BYTES {
        return Err(ServerError::BadRequest(format!(
            "code too large ({} bytes); maximum is {} bytes",
            req.code.len(),
            MAX_CODE_BYTES,
        )));
    }

    info!(code_len = req.code.len(), "received request to generate docs");

    let request = GenerateRequest::one_shot(
        ModelProfile::Documentation,
        PromptContent::Text(documentation_prompt(&req.code)),
    );
    let chunks = state.generate(request).await;
    Ok(streaming::respond(&headers, chunks))
}
