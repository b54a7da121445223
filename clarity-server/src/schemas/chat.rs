//! `POST /chat` form fields.

use clarity_core::AttachedFile;
use utoipa::ToSchema;

/// Multipart form accepted by `POST /chat`.
///
/// The handler reads the fields incrementally; `file` is held in memory for
/// the duration of the request only.
#[derive(Debug, ToSchema)]
pub struct ChatForm {
    /// The user's message for this turn.
    pub message: String,
    /// JSON array of prior `{role, content}` turns; roles `user` / `assistant`.
    #[schema(example = "[]")]
    pub history: Option<String>,
    /// Optional PDF, JPEG, PNG or text attachment.
    #[schema(value_type = Option<String>, format = Binary)]
    pub file: Option<AttachedFile>,
}
