//! The seam between the adaptation layer and the generative API.
//!
//! Handlers only see [`GenerativeBackend`]; the production implementation is
//! [`crate::gemini::GeminiClient`], tests use [`crate::testing::ScriptedBackend`].

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::UpstreamError;
use crate::history::HistoryTurn;
use crate::profile::ModelProfile;
use crate::prompt::PromptContent;

/// One item of the upstream token stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamChunk {
    /// Generated text; may be empty for metadata-only chunks.
    Text(String),
    /// The chunk was withheld by the API's content-safety filter.
    Blocked { reason: String },
}

pub type UpstreamStream = BoxStream<'static, Result<UpstreamChunk, UpstreamError>>;

/// Everything needed to generate one turn.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub profile: ModelProfile,
    /// Prior turns; empty for one-shot generation.
    pub history: Vec<HistoryTurn>,
    pub prompt: PromptContent,
}

impl GenerateRequest {
    /// One-shot request with no prior turns.
    pub fn one_shot(profile: ModelProfile, prompt: PromptContent) -> Self {
        Self {
            profile,
            history: Vec::new(),
            prompt,
        }
    }
}

#[async_trait]
pub trait GenerativeBackend: Send + Sync + 'static {
    /// Open a streaming generation. Errors here mean the stream never started.
    async fn stream_generate(&self, request: GenerateRequest) -> Result<UpstreamStream, UpstreamError>;
}
