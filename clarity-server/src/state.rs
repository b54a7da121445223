//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use clarity_core::relay::{self, RelayChunk};
use clarity_core::{GenerateRequest, GenerativeBackend, RelayOptions};
use futures::stream::BoxStream;

use crate::config::Config;

/// In-band message for generation requests when no API key is configured.
pub const NOT_CONFIGURED_MESSAGE: &str = "GOOGLE_API_KEY not set.";

/// State shared across all HTTP handlers. Immutable after startup.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Generative API client; `None` when `GOOGLE_API_KEY` is missing.
    pub backend: Option<Arc<dyn GenerativeBackend>>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("backend_configured", &self.backend.is_some())
            .finish()
    }
}

impl AppState {
    pub fn relay_options(&self) -> RelayOptions {
        self.config.relay_options()
    }

    /// Open a relay for `request`, or a single configuration error chunk when
    /// no backend is available.
    pub async fn generate(&self, request: GenerateRequest) -> BoxStream<'static, RelayChunk> {
        match &self.backend {
            Some(backend) => relay::start(backend.as_ref(), request, self.relay_options()).await,
            None => relay::error_only(NOT_CONFIGURED_MESSAGE),
        }
    }
}
