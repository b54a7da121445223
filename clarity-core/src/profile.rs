//! The two fixed model configurations the backend serves.

use strum::{Display, EnumString};

const DOCUMENTATION_INSTRUCTION: &str = "You are an expert software developer. Your task is to write \
high-quality, concise, and clear documentation for the given code snippet. Respond only with the \
documentation in Markdown format.";

const CONVERSATION_INSTRUCTION: &str = "You are a helpful assistant. You can answer questions, \
calculate simple syntax, tell stories, and have a friendly conversation.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum ModelProfile {
    /// Markdown documentation for a code snippet.
    #[strum(serialize = "documentation")]
    Documentation,
    /// General multi-turn chat.
    #[strum(serialize = "conversation")]
    Conversation,
}

impl ModelProfile {
    /// Model used when configuration does not override it.
    pub fn default_model(self) -> &'static str {
        match self {
            ModelProfile::Documentation => "gemini-2.5-pro",
            ModelProfile::Conversation => "gemini-2.5-flash",
        }
    }

    pub fn system_instruction(self) -> &'static str {
        match self {
            ModelProfile::Documentation => DOCUMENTATION_INSTRUCTION,
            ModelProfile::Conversation => CONVERSATION_INSTRUCTION,
        }
    }
}

/// Wrap a code snippet into the documentation request prompt.
pub fn documentation_prompt(code: &str) -> String {
    format!("Here is the code:\n\n```\n{code}\n```")
}
