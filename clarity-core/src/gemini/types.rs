//! Wire types for the Gemini `generateContent` family of endpoints.
//!
//! Request types serialise exactly what we send; response types are lenient
//! (every field optional) because stream chunks carry partial objects.

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::backend::{GenerateRequest, UpstreamChunk};
use crate::error::UpstreamError;
use crate::history::Role;
use crate::prompt::PromptContent;

/// Finish reasons that mean the candidate was withheld rather than completed.
const BLOCKING_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
    "IMAGE_SAFETY",
];

// ── Request ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    /// Base64 (standard alphabet) payload.
    pub data: String,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }
}

impl GenerateContentRequest {
    /// Build the wire request: seeded history, then the current user turn.
    pub fn from_generate(request: &GenerateRequest) -> Self {
        let mut contents: Vec<Content> = request
            .history
            .iter()
            .map(|turn| Content {
                role: Some(turn.role),
                parts: vec![Part::text(turn.content.clone())],
            })
            .collect();

        let parts = match &request.prompt {
            PromptContent::Text(text) => vec![Part::text(text.clone())],
            PromptContent::Composite { text, image } => vec![
                Part::text(text.clone()),
                Part::InlineData {
                    inline_data: Blob {
                        mime_type: image.mime_type.clone(),
                        data: base64::engine::general_purpose::STANDARD.encode(&image.data),
                    },
                },
            ],
        };
        contents.push(Content {
            role: Some(Role::User),
            parts,
        });

        Self {
            contents,
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part::text(request.profile.system_instruction())],
            }),
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
    pub error: Option<ApiError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<CandidateContent>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CandidatePart {
    pub text: Option<String>,
    /// Set on reasoning summaries, which are not part of the answer.
    #[serde(default)]
    pub thought: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiError {
    pub code: Option<i64>,
    pub message: Option<String>,
    pub status: Option<String>,
}

impl ApiError {
    pub fn describe(&self) -> String {
        match (&self.message, &self.status) {
            (Some(message), _) => message.clone(),
            (None, Some(status)) => status.clone(),
            (None, None) => "unknown upstream error".to_owned(),
        }
    }
}

/// Body of a non-2xx response.
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ApiError,
}

impl GenerateContentResponse {
    /// Reduce a stream chunk to what the relay cares about.
    pub fn into_chunk(self) -> Result<UpstreamChunk, UpstreamError> {
        if let Some(err) = self.error {
            return Err(UpstreamError::Api(err.describe()));
        }

        let first = self.candidates.into_iter().next();
        let text: String = first
            .as_ref()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter(|part| !part.thought)
                    .filter_map(|part| part.text.as_deref())
                    .collect()
            })
            .unwrap_or_default();

        if !text.is_empty() {
            return Ok(UpstreamChunk::Text(text));
        }

        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Ok(UpstreamChunk::Blocked { reason });
        }

        if let Some(reason) = first
            .and_then(|c| c.finish_reason)
            .filter(|r| BLOCKING_FINISH_REASONS.contains(&r.as_str()))
        {
            return Ok(UpstreamChunk::Blocked { reason });
        }

        Ok(UpstreamChunk::Text(String::new()))
    }
}

/// Decode one SSE `data:` payload. Blank payloads produce nothing.
pub fn decode_event(data: &str) -> Option<Result<UpstreamChunk, UpstreamError>> {
    let data = data.trim();
    if data.is_empty() {
        return None;
    }
    Some(
        serde_json::from_str::<GenerateContentResponse>(data)
            .map_err(UpstreamError::from)
            .and_then(GenerateContentResponse::into_chunk),
    )
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::history::HistoryTurn;
    use crate::profile::ModelProfile;
    use crate::prompt::ImagePart;
    use bytes::Bytes;
    use serde_json::json;

    #[test]
    fn request_places_history_before_current_turn() {
        let request = GenerateRequest {
            profile: ModelProfile::Conversation,
            history: vec![
                HistoryTurn {
                    role: Role::User,
                    content: "hi".into(),
                },
                HistoryTurn {
                    role: Role::Model,
                    content: "hello!".into(),
                },
            ],
            prompt: PromptContent::Text("what's new?".into()),
        };
        let body = serde_json::to_value(GenerateContentRequest::from_generate(&request)).unwrap();
        assert_eq!(
            body["contents"],
            json!([
                {"role": "user", "parts": [{"text": "hi"}]},
                {"role": "model", "parts": [{"text": "hello!"}]},
                {"role": "user", "parts": [{"text": "what's new?"}]},
            ])
        );
        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            ModelProfile::Conversation.system_instruction()
        );
        assert!(body["systemInstruction"].get("role").is_none());
    }

    #[test]
    fn composite_prompt_sends_image_as_inline_data() {
        let request = GenerateRequest::one_shot(
            ModelProfile::Conversation,
            PromptContent::Composite {
                text: "describe".into(),
                image: ImagePart {
                    mime_type: "image/png".into(),
                    data: Bytes::from_static(b"abc"),
                    width: 1,
                    height: 1,
                },
            },
        );
        let body = serde_json::to_value(GenerateContentRequest::from_generate(&request)).unwrap();
        assert_eq!(
            body["contents"][0]["parts"],
            json!([
                {"text": "describe"},
                {"inlineData": {"mimeType": "image/png", "data": "YWJj"}},
            ])
        );
    }

    #[test]
    fn text_parts_are_concatenated() {
        let chunk = decode_event(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hel"},{"text":"lo"}]}}]}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(chunk, UpstreamChunk::Text("Hello".into()));
    }

    #[test]
    fn thought_parts_are_ignored() {
        let chunk = decode_event(
            r#"{"candidates":[{"content":{"parts":[{"text":"thinking...","thought":true},{"text":"answer"}]}}]}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(chunk, UpstreamChunk::Text("answer".into()));
    }

    #[test]
    fn safety_finish_without_text_is_blocked() {
        let chunk = decode_event(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#)
            .unwrap()
            .unwrap();
        assert_eq!(
            chunk,
            UpstreamChunk::Blocked {
                reason: "SAFETY".into()
            }
        );
    }

    #[test]
    fn prompt_feedback_block_is_blocked() {
        let chunk = decode_event(r#"{"promptFeedback":{"blockReason":"OTHER"}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(
            chunk,
            UpstreamChunk::Blocked {
                reason: "OTHER".into()
            }
        );
    }

    #[test]
    fn normal_stop_without_text_is_empty_text() {
        let chunk = decode_event(r#"{"candidates":[{"finishReason":"STOP"}],"usageMetadata":{}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(chunk, UpstreamChunk::Text(String::new()));
    }

    #[test]
    fn error_object_becomes_api_error() {
        let err = decode_event(r#"{"error":{"code":429,"message":"Resource exhausted","status":"RESOURCE_EXHAUSTED"}}"#)
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Api(ref m) if m == "Resource exhausted"));
    }

    #[test]
    fn garbage_payload_is_decode_error() {
        let err = decode_event("{not json").unwrap().unwrap_err();
        assert!(matches!(err, UpstreamError::Decode(_)));
    }

    #[test]
    fn blank_payload_is_skipped() {
        assert!(decode_event("  ").is_none());
    }
}
