//! Axum router construction.
//!
//! [`build`] assembles the complete application router, including:
//! - Middleware layers (CORS, per-request trace-ID injection)
//! - Optional Swagger UI / OpenAPI spec endpoint (disable with `CLARITY_ENABLE_SWAGGER=false`)
//! - Health / heartbeat route
//! - `/generate-docs` and `/chat` streaming routes

mod chat;
pub mod doc;
mod documentation;
mod health;

use axum::{middleware, Router};
use crate::middleware::{cors, trace};
use crate::state::AppState;
use std::sync::Arc;
use tower::ServiceBuilder;
use utoipa_swagger_ui::SwaggerUi;

// ── Router builder ────────────────────────────────────────────────────────────

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .merge(health::router())
        .merge(documentation::router())
        .merge(chat::router(state.config.max_upload_bytes()));

    let mut app = Router::new().merge(api_router);

    if state.config.enable_swagger {
        app = app.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", doc::get_docs()));
    }

    app
        // Outermost layers execute first on the way in.
        .layer(ServiceBuilder::new().layer(cors::cors_layer(&state.config)))
        .layer(middleware::from_fn(trace::trace_middleware))
        .with_state(state)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
