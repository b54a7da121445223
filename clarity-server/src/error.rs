//! Unified server error type.
//!
//! Covers failures detected before a response stream starts (malformed
//! multipart, oversized upload, invalid JSON body). Once streaming has begun,
//! errors travel in-band as relay error chunks instead.

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ServerError {
    /// The caller sent an invalid or malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// An upload exceeded the configured size limit.
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// A JSON body failed field validation.
    #[error("validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// An extractor refused the request body before the handler ran.
    #[error("rejected request ({status}): {message}")]
    Rejected { status: StatusCode, message: String },
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, client_message) = match &self {
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ServerError::PayloadTooLarge(m) => (StatusCode::PAYLOAD_TOO_LARGE, m.clone()),
            ServerError::Validation(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
            ServerError::Rejected { status, message } => (*status, message.clone()),
        };
        (status, Json(json!({ "error": client_message }))).into_response()
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        debug!(status = %rejection.status(), "rejected JSON body");
        ServerError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<MultipartRejection> for ServerError {
    fn from(rejection: MultipartRejection) -> Self {
        debug!(status = %rejection.status(), "rejected multipart body");
        ServerError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn client_errors_expose_message() {
        let resp = ServerError::PayloadTooLarge("file too large".into()).into_response();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body_json(resp).await["error"], "file too large");
    }

    #[tokio::test]
    async fn rejections_keep_their_status() {
        let resp = ServerError::Rejected {
            status: StatusCode::UNSUPPORTED_MEDIA_TYPE,
            message: "Expected request with `Content-Type: application/json`".into(),
        }
        .into_response();
        assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(body_json(resp).await["error"]
            .as_str()
            .unwrap()
            .contains("Content-Type"));
    }
}
