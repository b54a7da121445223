//! History adapter: client chat history → API role vocabulary.
//!
//! Clients send prior turns as a JSON array of `{role, content}` objects with
//! roles `"user"` / `"assistant"`. The API expects `"user"` / `"model"`.
//! Malformed input never fails a request; the conversation starts fresh.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::warn;

/// One turn as the client stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

/// Speaker role in the API's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[strum(serialize = "user")]
    User,
    #[strum(serialize = "model")]
    Model,
}

impl Role {
    /// Map a client role onto the API's vocabulary.
    ///
    /// `"assistant"` becomes [`Role::Model`]; everything else, including
    /// unrecognised roles, becomes [`Role::User`] so stored histories with
    /// odd roles still load.
    pub fn from_client(role: &str) -> Self {
        match role {
            "assistant" => Role::Model,
            "user" => Role::User,
            other => {
                warn!(role = %other, "unrecognised history role; treating as user");
                Role::User
            }
        }
    }
}

/// One turn, ready to seed an API conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: Role,
    pub content: String,
}

impl From<ChatTurn> for HistoryTurn {
    fn from(turn: ChatTurn) -> Self {
        Self {
            role: Role::from_client(&turn.role),
            content: turn.content,
        }
    }
}

/// Parse and translate a serialized history.
///
/// Absent or blank input yields an empty history. Input that is not a JSON
/// array of turns is logged and also yields an empty history.
pub fn adapt_history(raw: Option<&str>) -> Vec<HistoryTurn> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Vec::new();
    };

    match serde_json::from_str::<Vec<ChatTurn>>(raw) {
        Ok(turns) => turns.into_iter().map(HistoryTurn::from).collect(),
        Err(e) => {
            warn!(error = %e, input_len = raw.len(), "could not parse chat history; starting fresh");
            Vec::new()
        }
    }
}

/// Prepare an adapted history to seed a session before `current` is sent.
///
/// The reference front-end appends the pending user message to its history
/// before submitting; a trailing user turn equal to `current` is dropped so
/// the message is not sent twice.
pub fn seed_history(mut history: Vec<HistoryTurn>, current: &str) -> Vec<HistoryTurn> {
    if history
        .last()
        .is_some_and(|last| last.role == Role::User && last.content == current)
    {
        history.pop();
    }
    history
}

// ── Tests ──────────────────────────────────────────────────────────────────────
