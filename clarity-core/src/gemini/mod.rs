//! Gemini REST client.
//!
//! Both logical operations, one-shot generation and history-seeded chat, map
//! onto `POST {base}/models/{model}:streamGenerateContent?alt=sse`; a chat
//! simply carries its prior turns in `contents` ahead of the current one.

pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::Client;
use tracing::{debug, warn};

use crate::backend::{GenerateRequest, GenerativeBackend, UpstreamStream};
use crate::error::UpstreamError;
use crate::profile::ModelProfile;

use self::types::{decode_event, ErrorEnvelope, GenerateContentRequest};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    /// API root, without a trailing `/models`.
    pub base_url: String,
    pub documentation_model: String,
    pub conversation_model: String,
    pub connect_timeout: Duration,
}

impl GeminiConfig {
    /// Config with the default endpoint and models.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            documentation_model: ModelProfile::Documentation.default_model().to_owned(),
            conversation_model: ModelProfile::Conversation.default_model().to_owned(),
            connect_timeout: Duration::from_secs(10),
        }
    }

    pub fn model_for(&self, profile: ModelProfile) -> &str {
        match profile {
            ModelProfile::Documentation => &self.documentation_model,
            ModelProfile::Conversation => &self.conversation_model,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, UpstreamError> {
        // No overall request timeout: a healthy stream may run for minutes.
        // Stalls are caught by the relay's idle timeout instead.
        let http = Client::builder()
            .user_agent(concat!("clarity-core/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn stream_url(&self, model: &str) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.config.base_url.trim_end_matches('/'),
            model
        )
    }
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    async fn stream_generate(&self, request: GenerateRequest) -> Result<UpstreamStream, UpstreamError> {
        let model = self.config.model_for(request.profile);
        let body = GenerateContentRequest::from_generate(&request);

        debug!(
            %model,
            profile = %request.profile,
            history_turns = request.history.len(),
            prompt_len = request.prompt.text().len(),
            "opening upstream stream"
        );

        let response = self
            .http
            .post(self.stream_url(model))
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&raw)
                .map(|envelope| envelope.error.describe())
                .unwrap_or(raw);
            warn!(status = status.as_u16(), %message, "upstream rejected request");
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let chunks = response
            .bytes_stream()
            .eventsource()
            .filter_map(|event| async move {
                match event {
                    Ok(event) => decode_event(&event.data),
                    Err(e) => Some(Err(UpstreamError::Stream(e.to_string()))),
                }
            });

        Ok(chunks.boxed())
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::backend::UpstreamChunk;
    use crate::prompt::PromptContent;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::Router;

    /// Serve `router` on an ephemeral port and return its base URL.
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/v1beta")
    }

    fn client(base_url: String) -> GeminiClient {
        GeminiClient::new(GeminiConfig {
            base_url,
            ..GeminiConfig::new("test-key")
        })
        .unwrap()
    }

    async fn sse_reply(headers: HeaderMap) -> impl IntoResponse {
        if headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()) != Some("test-key") {
            return (StatusCode::UNAUTHORIZED, String::new()).into_response();
        }
        let body = concat!(
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Hel\"}]}}]}\r\n\r\n",
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"lo\"}]},\"finishReason\":\"STOP\"}]}\r\n\r\n",
        );
        ([("content-type", "text/event-stream")], body).into_response()
    }

    #[test]
    fn stream_url_targets_model() {
        let c = client("https://example.test/v1beta/".into());
        assert_eq!(
            c.stream_url("gemini-2.5-flash"),
            "https://example.test/v1beta/models/gemini-2.5-flash:streamGenerateContent?alt=sse"
        );
    }

    #[test]
    fn model_follows_profile() {
        let config = GeminiConfig {
            documentation_model: "docs-model".into(),
            ..GeminiConfig::new("k")
        };
        assert_eq!(config.model_for(ModelProfile::Documentation), "docs-model");
        assert_eq!(config.model_for(ModelProfile::Conversation), "gemini-2.5-flash");
    }

    #[tokio::test]
    async fn streams_chunks_from_sse_endpoint() {
        let router = Router::new().route(
            "/v1beta/models/{model}",
            post(|headers: HeaderMap| sse_reply(headers)),
        );
        let base = serve(router).await;

        let request = GenerateRequest::one_shot(ModelProfile::Conversation, PromptContent::Text("hi".into()));
        let stream = client(base).stream_generate(request).await.unwrap();
        let chunks: Vec<_> = stream.map(|c| c.unwrap()).collect().await;
        assert_eq!(
            chunks,
            vec![UpstreamChunk::Text("Hel".into()), UpstreamChunk::Text("lo".into())]
        );
    }

    #[tokio::test]
    async fn non_success_status_carries_api_message() {
        let router = Router::new().route(
            "/v1beta/models/{model}",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#,
                )
            }),
        );
        let base = serve(router).await;

        let request = GenerateRequest::one_shot(ModelProfile::Documentation, PromptContent::Text("x".into()));
        let err = client(base).stream_generate(request).await.err().unwrap();
        match err {
            UpstreamError::Status { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "API key not valid.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
