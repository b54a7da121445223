//! Server configuration, loaded from environment variables at startup.

use std::time::Duration;

use clarity_core::gemini::{GeminiConfig, DEFAULT_BASE_URL};
use clarity_core::{ModelProfile, RelayOptions};

/// Runtime configuration for clarity-server.
///
/// Every field has a sensible default so the server starts without any
/// environment variables set. Generation requests still need
/// `GOOGLE_API_KEY`; without it they answer with an in-band error.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:8000"`).
    pub bind_address: String,

    /// Gemini API key (`GOOGLE_API_KEY`).
    pub google_api_key: Option<String>,

    /// Gemini API root (default: the public `v1beta` endpoint).
    pub gemini_base_url: String,

    /// Model used by `/generate-docs`.
    pub docs_model: String,

    /// Model used by `/chat`.
    pub chat_model: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// When set, logs go to a daily-rolling file in this directory instead
    /// of stdout.
    pub log_dir: Option<String>,

    /// Comma-separated list of allowed CORS origins; `None` allows any.
    pub cors_allowed_origins: Option<String>,

    /// Serve Swagger UI at `/swagger-ui`.
    pub enable_swagger: bool,

    /// Largest accepted upload, in MiB.
    pub max_upload_size_mb: usize,

    /// TCP connect timeout for the Gemini API.
    pub upstream_connect_timeout_secs: u64,

    /// Longest wait for the next upstream chunk; `0` disables the limit.
    pub upstream_idle_timeout_secs: u64,

    /// Pause after each forwarded chunk, in milliseconds.
    pub chunk_pacing_ms: u64,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build [`Config`] from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        Self {
            bind_address: get("CLARITY_BIND", "0.0.0.0:8000"),
            google_api_key: non_empty("GOOGLE_API_KEY"),
            gemini_base_url: get("CLARITY_GEMINI_BASE_URL", DEFAULT_BASE_URL),
            docs_model: get("CLARITY_DOCS_MODEL", ModelProfile::Documentation.default_model()),
            chat_model: get("CLARITY_CHAT_MODEL", ModelProfile::Conversation.default_model()),
            log_level: get("CLARITY_LOG", "info"),
            log_json: parse_flag(lookup("CLARITY_LOG_JSON"), false),
            log_dir: non_empty("CLARITY_LOG_DIR"),
            cors_allowed_origins: non_empty("CLARITY_CORS_ORIGINS"),
            enable_swagger: parse_flag(lookup("CLARITY_ENABLE_SWAGGER"), true),
            max_upload_size_mb: parse_or(lookup("CLARITY_MAX_UPLOAD_SIZE_MB"), 20),
            upstream_connect_timeout_secs: parse_or(lookup("CLARITY_UPSTREAM_CONNECT_TIMEOUT_SECS"), 10),
            upstream_idle_timeout_secs: parse_or(lookup("CLARITY_UPSTREAM_IDLE_TIMEOUT_SECS"), 120),
            chunk_pacing_ms: parse_or(lookup("CLARITY_CHUNK_PACING_MS"), 10),
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_size_mb * 1024 * 1024
    }

    /// Gemini client settings, or `None` when no API key is configured.
    pub fn gemini(&self) -> Option<GeminiConfig> {
        let api_key = self.google_api_key.clone()?;
        Some(GeminiConfig {
            base_url: self.gemini_base_url.clone(),
            documentation_model: self.docs_model.clone(),
            conversation_model: self.chat_model.clone(),
            connect_timeout: Duration::from_secs(self.upstream_connect_timeout_secs),
            ..GeminiConfig::new(api_key)
        })
    }

    pub fn relay_options(&self) -> RelayOptions {
        RelayOptions {
            pacing: Duration::from_millis(self.chunk_pacing_ms),
            idle_timeout: (self.upstream_idle_timeout_secs > 0)
                .then(|| Duration::from_secs(self.upstream_idle_timeout_secs)),
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn parse_flag(value: Option<String>, default: bool) -> bool {
    match value {
        Some(v) => v == "1" || v.eq_ignore_ascii_case("true"),
        None => default,
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let cfg = config(&[]);
        assert_eq!(cfg.bind_address, "0.0.0.0:8000");
        assert!(cfg.google_api_key.is_none());
        assert!(cfg.gemini().is_none());
        assert!(cfg.enable_swagger);
        assert_eq!(cfg.max_upload_bytes(), 20 * 1024 * 1024);
        assert_eq!(cfg.docs_model, "gemini-2.5-pro");
        assert_eq!(cfg.chat_model, "gemini-2.5-flash");
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        assert!(config(&[("GOOGLE_API_KEY", "   ")]).gemini().is_none());
    }

    #[test]
    fn gemini_config_follows_overrides() {
        let cfg = config(&[
            ("GOOGLE_API_KEY", "secret"),
            ("CLARITY_CHAT_MODEL", "gemini-2.0-flash"),
            ("CLARITY_UPSTREAM_CONNECT_TIMEOUT_SECS", "3"),
        ]);
        let gemini = cfg.gemini().expect("api key set");
        assert_eq!(gemini.api_key, "secret");
        assert_eq!(gemini.conversation_model, "gemini-2.0-flash");
        assert_eq!(gemini.documentation_model, "gemini-2.5-pro");
        assert_eq!(gemini.connect_timeout, Duration::from_secs(3));
    }

    #[test]
    fn zero_idle_timeout_disables_limit() {
        let cfg = config(&[("CLARITY_UPSTREAM_IDLE_TIMEOUT_SECS", "0"), ("CLARITY_CHUNK_PACING_MS", "0")]);
        let options = cfg.relay_options();
        assert!(options.idle_timeout.is_none());
        assert!(options.pacing.is_zero());
    }

    #[test]
    fn unparsable_numbers_fall_back() {
        let cfg = config(&[("CLARITY_MAX_UPLOAD_SIZE_MB", "lots"), ("CLARITY_LOG_JSON", "TRUE")]);
        assert_eq!(cfg.max_upload_size_mb, 20);
        assert!(cfg.log_json);
    }
}
