use crate::config::Config;
use tower_http::cors::{Any, CorsLayer};

/// CORS policy from `CLARITY_CORS_ORIGINS`.
///
/// The browser front-end is served from a different origin, so an unset or
/// unparsable list allows any origin.
pub fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<axum::http::HeaderValue> = config
        .cors_allowed_origins
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect();

    let layer = CorsLayer::new().allow_headers(Any).allow_methods(Any);
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins)
    }
}
