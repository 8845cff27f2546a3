use std::sync::Arc;
use std::time::Duration;

use careezy_common::{Result, SessionId};
use careezy_db::CoachRepository;
use tracing::{debug, info};

use crate::providers::{ChatMessage, LlmProvider, LlmRequest, complete_text};

/// Number of persisted messages between summary refreshes.
pub const DEFAULT_SUMMARY_INTERVAL: u64 = 20;

pub const SUMMARY_INSTRUCTION: &str = "Summarize this career coaching conversation in 2-3 sentences. \
Capture the user's career goals, the challenges they mentioned and the advice given so far. \
Reply with the summary only.";

/// Closing user turn of the summarization prompt.
pub const SUMMARY_REQUEST: &str = "Summarize the conversation above.";

/// Whether a turn that left the session at `message_count` refreshes the summary.
///
/// True iff the count is a positive multiple of `interval`.
pub fn should_summarize(message_count: u64, interval: u64) -> bool {
    interval > 0 && message_count > 0 && message_count % interval == 0
}

/// Summarization prompt: the instruction, the turn's full context and the
/// reply, closed by a user turn asking for the summary.
///
/// The prompt must not end on the assistant reply. Providers that accept a
/// trailing assistant turn treat it as a prefill and continue the reply.
pub fn summary_prompt(context: &[ChatMessage], assistant_reply: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(context.len() + 3);
    messages.push(ChatMessage::system(SUMMARY_INSTRUCTION));
    messages.extend_from_slice(context);
    messages.push(ChatMessage::assistant(assistant_reply));
    messages.push(ChatMessage::user(SUMMARY_REQUEST));
    messages
}

/// Everything the detached summarization task needs.
pub(crate) struct SummaryJob {
    pub repo: Arc<dyn CoachRepository>,
    pub provider: Arc<dyn LlmProvider>,
    pub model: String,
    pub timeout: Duration,
    pub session_id: SessionId,
    pub prompt: Vec<ChatMessage>,
}

impl SummaryJob {
    /// Ask the provider for a fresh summary and store it.
    pub async fn run(self) -> Result<()> {
        let request = LlmRequest {
            model: self.model,
            messages: self.prompt,
            system: None,
            max_tokens: Some(300),
            temperature: Some(0.0),
        };

        let summary = complete_text(self.provider.as_ref(), &request, self.timeout).await?;

        if self.repo.update_summary(&self.session_id, &summary).await? {
            info!(
                session_id = %self.session_id,
                chars = summary.len(),
                "context summary refreshed"
            );
        } else {
            debug!(session_id = %self.session_id, "session gone before summary was stored");
        }
        Ok(())
    }
}
