use careezy_common::CoachMessage;

use crate::providers::{ChatMessage, ChatRole};

/// Prefix of the system message that carries the rolling summary.
pub const SUMMARY_PREFIX: &str = "Previous conversation context: ";

/// Default number of persisted messages replayed into each prompt.
pub const DEFAULT_HISTORY_LIMIT: usize = 15;

/// Assemble the prompt for one coach turn.
///
/// `history` is expected oldest first. Only its newest `limit` entries are
/// used. The result always ends with `new_text` as a user message and carries
/// at most one leading system message with the summary.
pub fn build_context(
    summary: Option<&str>,
    history: &[CoachMessage],
    new_text: &str,
    limit: usize,
) -> Vec<ChatMessage> {
    let start = history.len().saturating_sub(limit);
    let window = &history[start..];

    let mut messages = Vec::with_capacity(window.len() + 2);

    if let Some(summary) = summary.map(str::trim).filter(|s| !s.is_empty()) {
        messages.push(ChatMessage::system(format!("{SUMMARY_PREFIX}{summary}")));
    }

    messages.extend(window.iter().map(|m| ChatMessage {
        role: ChatRole::from(m.role),
        content: m.content.clone(),
    }));

    messages.push(ChatMessage::user(new_text));
    messages
}
