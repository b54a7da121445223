//! clarity-core – request adaptation layer for the ClarityAI backend.
//!
//! The crate turns what a client submits (free text, an optional uploaded
//! file, a serialized chat history) into a request for the generative API,
//! and turns the API's token stream back into chunks the HTTP layer can
//! forward:
//!
//! - [`prompt`]   – File-to-Prompt adapter (PDF / image / text uploads).
//! - [`history`]  – client history → API role vocabulary.
//! - [`relay`]    – incremental forwarding of upstream chunks.
//! - [`backend`]  – the [`GenerativeBackend`] seam and request types.
//! - [`gemini`]   – REST client for the Gemini `streamGenerateContent` API.

pub mod backend;
pub mod error;
pub mod gemini;
pub mod history;
pub mod profile;
pub mod prompt;
pub mod relay;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use backend::{GenerateRequest, GenerativeBackend, UpstreamChunk, UpstreamStream};
pub use error::{PromptError, UpstreamError};
pub use gemini::{GeminiClient, GeminiConfig};
pub use history::{ChatTurn, HistoryTurn, Role};
pub use profile::ModelProfile;
pub use prompt::{AttachedFile, ImagePart, PromptContent};
pub use relay::{RelayChunk, RelayOptions};
