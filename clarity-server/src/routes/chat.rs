//! Conversational chat route.
//!
//! Accepts a multipart form with the current message, the prior conversation
//! as a JSON string, and an optional attachment. The attachment is folded
//! into the prompt before the conversation model is called; the reply is
//! relayed as it streams in.

use std::sync::Arc;

use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::routing::post;
use axum::Router;
use bytes::BytesMut;
use clarity_core::history::{adapt_history, seed_history};
use clarity_core::prompt::build_prompt_blocking;
use clarity_core::{relay, AttachedFile, GenerateRequest, ModelProfile};
use tracing::{debug, info, warn};
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::chat::ChatForm;
use crate::state::{AppState, NOT_CONFIGURED_MESSAGE};
use crate::streaming;

/// Slack above the upload cap for the message and history fields and the
/// multipart framing itself.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(OpenApi)]
#[openapi(paths(chat), components(schemas(ChatForm)))]
pub struct ChatApi;

pub fn router(max_upload_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route("/chat", post(chat))
        .layer(DefaultBodyLimit::max(max_upload_bytes + FORM_OVERHEAD_BYTES))
}

/// Chat with the conversation model (`POST /chat`).
///
/// `file` may be a PDF (text is extracted page by page), a JPEG or PNG (sent
/// alongside the text as an image part) or any text-like type. Unsupported
/// or unreadable files produce a single `Error: ...` chunk instead of a
/// model reply.
#[utoipa::path(
    post,
    path = "/chat",
    tag = "chat",
    request_body(content = ChatForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Streamed model reply", body = String, content_type = "text/plain"),
        (status = 400, description = "Malformed form or missing message"),
        (status = 413, description = "Attachment too large"),
    )
)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ServerError> {
    let submission = read_submission(multipart?, state.config.max_upload_bytes()).await?;

    info!(
        message_len = submission.message.len(),
        file_name = submission.file.as_ref().map(|f| f.name.as_str()),
        "received chat message"
    );

    let history = seed_history(
        adapt_history(submission.history.as_deref()),
        &submission.message,
    );

    if state.backend.is_none() {
        warn!("chat request received but GOOGLE_API_KEY is not set");
        return Ok(streaming::respond(
            &headers,
            relay::error_only(NOT_CONFIGURED_MESSAGE),
        ));
    }

    let chunks = match build_prompt_blocking(submission.message, submission.file).await {
        Ok(prompt) => {
            let request = GenerateRequest {
                profile: ModelProfile::Conversation,
                history,
                prompt,
            };
            state.generate(request).await
        }
        Err(e) => {
            warn!(error = %e, "could not prepare attachment");
            relay::error_only(e.to_string())
        }
    };
    Ok(streaming::respond(&headers, chunks))
}

/// Drain the form into a [`ChatForm`], enforcing the upload cap while
/// the attachment is still arriving.
async fn read_submission(
    mut multipart: Multipart,
    max_upload_bytes: usize,
) -> Result<ChatForm, ServerError> {
    let mut message = None;
    let mut history = None;
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "message" => message = Some(field.text().await.map_err(multipart_error)?),
            "history" => history = Some(field.text().await.map_err(multipart_error)?),
            "file" => file = read_file(field, max_upload_bytes).await?,
            other => debug!(field = other, "ignoring unknown form field"),
        }
    }

    let message =
        message.ok_or_else(|| ServerError::BadRequest("missing form field: message".into()))?;

    Ok(ChatForm {
        message,
        history,
        file,
    })
}

async fn read_file(
    mut field: Field<'_>,
    max_upload_bytes: usize,
) -> Result<Option<AttachedFile>, ServerError> {
    let name = field.file_name().unwrap_or_default().to_owned();
    let mime_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_owned();

    let mut buf = BytesMut::new();
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        if buf.len() + chunk.len() > max_upload_bytes {
            return Err(ServerError::PayloadTooLarge(format!(
                "file too large: maximum is {} bytes",
                max_upload_bytes
            )));
        }
        buf.extend_from_slice(&chunk);
    }

    // Browsers submit an empty, unnamed part when no file was chosen.
    if name.is_empty() && buf.is_empty() {
        return Ok(None);
    }

    debug!(file_name = %name, mime_type = %mime_type, size_bytes = buf.len(), "received attachment");

    Ok(Some(AttachedFile {
        name: if name.is_empty() { "upload".to_owned() } else { name },
        mime_type,
        bytes: buf.freeze(),
    }))
}

fn multipart_error(e: MultipartError) -> ServerError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServerError::PayloadTooLarge(e.body_text())
    } else {
        ServerError::BadRequest(format!("failed to read multipart form: {}", e.body_text()))
    }
}
