//! clarity-server – entry point.
//!
//! Startup order:
//! 1. Parse configuration from environment variables.
//! 2. Initialise structured tracing (stdout or a daily-rolling file; JSON or pretty).
//! 3. Build the Gemini client, if an API key is configured.
//! 4. Build the Axum router and start the HTTP server with graceful shutdown.

mod config;
mod error;
mod middleware;
mod routes;
mod schemas;
mod state;
mod streaming;

use std::net::SocketAddr;
use std::sync::Arc;

use clarity_core::{GeminiClient, GenerativeBackend};
use tracing::{error, info, warn};
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    let cfg = Config::from_env();

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: CLARITY_LOG='{}' is not a valid tracing filter ({}); \
                     falling back to 'info'",
                    cfg.log_level, e
                );
                tracing_subscriber::EnvFilter::new("info")
            }
        },
    };

    // The guard flushes buffered file output on drop; hold it until exit.
    let (writer, _log_guard) = match &cfg.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "clarity-server.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(non_blocking), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stdout), None),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_target(true)
        .with_thread_ids(true);

    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "clarity-server starting");

    // ── 3. Gemini client ───────────────────────────────────────────────────────
    let backend: Option<Arc<dyn GenerativeBackend>> = match cfg.gemini() {
        Some(gemini) => {
            info!(
                base_url = %gemini.base_url,
                docs_model = %gemini.documentation_model,
                chat_model = %gemini.conversation_model,
                "Gemini client configured"
            );
            let client: Arc<dyn GenerativeBackend> = Arc::new(GeminiClient::new(gemini)?);
            Some(client)
        }
        None => {
            error!("GOOGLE_API_KEY not set; generation requests will return an error");
            None
        }
    };

    let state = Arc::new(AppState {
        config: Arc::new(cfg.clone()),
        backend,
    });

    // ── 4. HTTP server with graceful shutdown ──────────────────────────────────
    let app = routes::build(Arc::clone(&state));
    let addr: SocketAddr = cfg.bind_address.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("clarity-server stopped");
    Ok(())
}

/// Returns a future that resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}
