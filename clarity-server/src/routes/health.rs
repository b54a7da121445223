//! Health / heartbeat endpoint.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_health))]
pub struct HealthApi;

/// Register health-check routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

/// Heartbeat endpoint.
///
/// Returns `{"status": "ok", "version": "...", "upstream_configured": bool}`
/// with HTTP 200. The server stays up without an API key, so monitoring can
/// use `upstream_configured` to spot a missing credential.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Server is healthy", body = Value)
    )
)]
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status":  "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "upstream_configured": state.backend.is_some(),
    }))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Config;

    fn state() -> Arc<AppState> {
        Arc::new(AppState {
            config: Arc::new(Config::from_lookup(|_| None)),
            backend: None,
        })
    }

    #[tokio::test]
    async fn health_response_has_ok_status() {
        let Json(body) = get_health(State(state())).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn health_response_reports_missing_credential() {
        let Json(body) = get_health(State(state())).await;
        assert!(!body["version"].as_str().unwrap_or("").is_empty());
        assert_eq!(body["upstream_configured"], false);
    }
}
