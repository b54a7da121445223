use crate::routes::{chat, documentation, health};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(info(
    title = "clarity-server",
    description = "Streaming documentation and chat proxy for the Gemini API",
    version = "0.1.0",
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(health::HealthApi::openapi());
    root.merge(documentation::DocumentationApi::openapi());
    root.merge(chat::ChatApi::openapi());
    root
}
