use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Request body for `POST /generate-docs`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct DocRequest {
    /// Source code to document.
    #[validate(length(min = 1, message = "code must not be empty"))]
    pub code: String,
}
