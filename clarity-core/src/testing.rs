//! In-memory [`GenerativeBackend`] for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use crate::backend::{GenerateRequest, GenerativeBackend, UpstreamChunk, UpstreamStream};
use crate::error::UpstreamError;

/// One scripted upstream event.
#[derive(Debug, Clone)]
pub enum Step {
    Text(String),
    Blocked(String),
    Fail(String),
}

/// Replays a fixed script for every request and records what it was asked.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    steps: Vec<Step>,
    open_error: Option<String>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedBackend {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            ..Self::default()
        }
    }

    /// A backend whose stream never opens.
    pub fn failing_to_open(message: impl Into<String>) -> Self {
        Self {
            open_error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl GenerativeBackend for ScriptedBackend {
    async fn stream_generate(&self, request: GenerateRequest) -> Result<UpstreamStream, UpstreamError> {
        if let Ok(mut seen) = self.requests.lock() {
            seen.push(request);
        }
        if let Some(message) = &self.open_error {
            return Err(UpstreamError::Api(message.clone()));
        }
        let items: Vec<Result<UpstreamChunk, UpstreamError>> = self
            .steps
            .iter()
            .map(|step| match step {
                Step::Text(text) => Ok(UpstreamChunk::Text(text.clone())),
                Step::Blocked(reason) => Ok(UpstreamChunk::Blocked {
                    reason: reason.clone(),
                }),
                Step::Fail(message) => Err(UpstreamError::Api(message.clone())),
            })
            .collect();
        Ok(stream::iter(items).boxed())
    }
}
