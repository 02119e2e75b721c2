//! Bounded conversational context for a prompt

use crate::conversation::{Conversation, Message};

/// Number of prior messages included in a prompt
pub const CONTEXT_WINDOW_MESSAGES: usize = 4;

/// Build the prompt for `input`, optionally prefixed with recent history.
///
/// `history` is the conversation as it was before the current user
/// message was appended.
pub fn build_prompt(history: &Conversation, input: &str, context_enabled: bool) -> String {
    if !context_enabled {
        return input.to_string();
    }

    let joined = history
        .last_n(CONTEXT_WINDOW_MESSAGES)
        .iter()
        .map(Message::text)
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("Previous conversation:\n{joined}\n\nCurrent question: {input}")
}
