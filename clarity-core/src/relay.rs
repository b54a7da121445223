//! Streaming relay: upstream chunks → client chunks.
//!
//! The relay is a pull-based stream. The HTTP body polls it, it polls the
//! upstream stream; dropping the relay (client disconnect) drops the upstream
//! connection with it.
//!
//! Per chunk:
//! - non-empty text is forwarded as [`RelayChunk::Text`];
//! - empty text and safety-blocked chunks are skipped;
//! - the first upstream error becomes a single [`RelayChunk::Error`] and ends
//!   the stream.

use std::time::Duration;

use futures::stream::{self, BoxStream, StreamExt};
use tracing::{debug, error, warn};

use crate::backend::{GenerateRequest, GenerativeBackend, UpstreamChunk, UpstreamStream};
use crate::error::UpstreamError;

/// A chunk forwarded to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayChunk {
    Text(String),
    /// Terminal; nothing follows an error chunk.
    Error(String),
}

impl RelayChunk {
    /// Plain-text rendering used by the default `text/plain` response.
    pub fn into_plain_text(self) -> String {
        match self {
            RelayChunk::Text(text) => text,
            RelayChunk::Error(message) => format!("Error: {message}"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RelayOptions {
    /// Pause after each forwarded chunk, giving other tasks a turn.
    pub pacing: Duration,
    /// Maximum wait for the next upstream item; `None` waits forever.
    pub idle_timeout: Option<Duration>,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            pacing: Duration::from_millis(10),
            idle_timeout: Some(Duration::from_secs(120)),
        }
    }
}

enum State {
    Streaming { upstream: UpstreamStream, pace: bool },
    Done,
}

/// Relay an already-open upstream stream.
pub fn relay(upstream: UpstreamStream, options: RelayOptions) -> BoxStream<'static, RelayChunk> {
    let initial = State::Streaming {
        upstream,
        pace: false,
    };

    stream::unfold(initial, move |state| async move {
        let State::Streaming { mut upstream, pace } = state else {
            return None;
        };

        if pace && !options.pacing.is_zero() {
            tokio::time::sleep(options.pacing).await;
        }

        loop {
            let next = match options.idle_timeout {
                Some(limit) => match tokio::time::timeout(limit, upstream.next()).await {
                    Ok(item) => item,
                    Err(_) => {
                        let err = UpstreamError::IdleTimeout(limit);
                        warn!(error = %err, "upstream stream stalled");
                        return Some((RelayChunk::Error(err.to_string()), State::Done));
                    }
                },
                None => upstream.next().await,
            };

            match next {
                None => {
                    debug!("upstream stream finished");
                    return None;
                }
                Some(Ok(UpstreamChunk::Text(text))) if text.is_empty() => continue,
                Some(Ok(UpstreamChunk::Text(text))) => {
                    return Some((
                        RelayChunk::Text(text),
                        State::Streaming {
                            upstream,
                            pace: true,
                        },
                    ));
                }
                Some(Ok(UpstreamChunk::Blocked { reason })) => {
                    warn!(%reason, "skipped a chunk blocked by safety settings");
                    continue;
                }
                Some(Err(e)) => {
                    error!(error = %e, "error during upstream stream");
                    return Some((RelayChunk::Error(e.to_string()), State::Done));
                }
            }
        }
    })
    .boxed()
}

/// A stream holding a single error chunk.
pub fn error_only(message: impl Into<String>) -> BoxStream<'static, RelayChunk> {
    stream::once(futures::future::ready(RelayChunk::Error(message.into()))).boxed()
}

/// Open a generation on `backend` and relay it.
///
/// Failing to open the stream (including exceeding the idle window while
/// waiting for response headers) yields a single error chunk.
pub async fn start(
    backend: &dyn GenerativeBackend,
    request: GenerateRequest,
    options: RelayOptions,
) -> BoxStream<'static, RelayChunk> {
    let profile = request.profile;
    let opened = match options.idle_timeout {
        Some(limit) => match tokio::time::timeout(limit, backend.stream_generate(request)).await {
            Ok(result) => result,
            Err(_) => Err(UpstreamError::IdleTimeout(limit)),
        },
        None => backend.stream_generate(request).await,
    };

    match opened {
        Ok(upstream) => relay(upstream, options),
        Err(e) => {
            error!(%profile, error = %e, "failed to open upstream stream");
            error_only(e.to_string())
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::profile::ModelProfile;
    use crate::prompt::PromptContent;
    use crate::testing::{ScriptedBackend, Step};

    fn quick() -> RelayOptions {
        RelayOptions {
            pacing: Duration::ZERO,
            idle_timeout: Some(Duration::from_secs(5)),
        }
    }

    fn upstream(items: Vec<Result<UpstreamChunk, UpstreamError>>) -> UpstreamStream {
        stream::iter(items).boxed()
    }

    fn text(s: &str) -> Result<UpstreamChunk, UpstreamError> {
        Ok(UpstreamChunk::Text(s.into()))
    }

    #[tokio::test]
    async fn forwards_chunks_in_order_without_trailing_error() {
        let out: Vec<_> = relay(upstream(vec![text("Hel"), text("lo")]), quick()).collect().await;
        assert_eq!(out, vec![RelayChunk::Text("Hel".into()), RelayChunk::Text("lo".into())]);
    }

    #[tokio::test]
    async fn error_after_one_chunk_yields_single_error_line() {
        let items = vec![
            text("Hel"),
            Err(UpstreamError::Api("quota exceeded".into())),
            text("never sent"),
        ];
        let out: Vec<String> = relay(upstream(items), quick())
            .map(RelayChunk::into_plain_text)
            .collect()
            .await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], "Hel");
        assert!(out[1].starts_with("Error: "), "got {:?}", out[1]);
        assert!(out[1].contains("quota exceeded"));
    }

    #[tokio::test]
    async fn blocked_and_empty_chunks_are_skipped() {
        let items = vec![
            text("a"),
            Ok(UpstreamChunk::Blocked {
                reason: "SAFETY".into(),
            }),
            text(""),
            text("b"),
        ];
        let out: Vec<_> = relay(upstream(items), quick()).collect().await;
        assert_eq!(out, vec![RelayChunk::Text("a".into()), RelayChunk::Text("b".into())]);
    }

    #[tokio::test]
    async fn empty_upstream_yields_nothing() {
        let out: Vec<_> = relay(upstream(vec![]), quick()).collect().await;
        assert!(out.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_upstream_times_out_with_error() {
        let stalled = stream::iter(vec![text("first")])
            .chain(stream::pending())
            .boxed();
        let options = RelayOptions {
            pacing: Duration::ZERO,
            idle_timeout: Some(Duration::from_secs(30)),
        };
        let out: Vec<_> = relay(stalled, options).collect().await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], RelayChunk::Text("first".into()));
        assert_eq!(
            out[1],
            RelayChunk::Error("no response from upstream within 30s".into())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn sub_second_idle_timeout_is_reported_exactly() {
        let stalled: UpstreamStream = stream::pending().boxed();
        let options = RelayOptions {
            pacing: Duration::ZERO,
            idle_timeout: Some(Duration::from_millis(250)),
        };
        let out: Vec<_> = relay(stalled, options).collect().await;
        assert_eq!(
            out,
            vec![RelayChunk::Error("no response from upstream within 250ms".into())]
        );
    }

    #[tokio::test]
    async fn start_reports_open_failure_in_band() {
        let backend = ScriptedBackend::failing_to_open("upstream returned HTTP 403: API key not valid");
        let request = GenerateRequest::one_shot(ModelProfile::Documentation, PromptContent::Text("x".into()));
        let out: Vec<_> = start(&backend, request, quick()).await.collect().await;
        assert_eq!(out.len(), 1);
        assert!(matches!(&out[0], RelayChunk::Error(m) if m.contains("API key not valid")));
    }

    #[tokio::test]
    async fn start_relays_scripted_stream() {
        let backend = ScriptedBackend::new(vec![Step::Text("Hel".into()), Step::Text("lo".into())]);
        let request = GenerateRequest::one_shot(ModelProfile::Conversation, PromptContent::Text("hi".into()));
        let out: Vec<_> = start(&backend, request, quick()).await.collect().await;
        assert_eq!(out, vec![RelayChunk::Text("Hel".into()), RelayChunk::Text("lo".into())]);
        assert_eq!(backend.requests().len(), 1);
    }
}
