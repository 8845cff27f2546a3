use std::sync::Arc;
use std::time::Duration;

use careezy_common::{CoachMessage, CoachSession, Error, Result, SessionId, UserId};
use careezy_db::CoachRepository;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::context::{DEFAULT_HISTORY_LIMIT, build_context};
use super::locks::KeyedLocks;
use super::summary::{DEFAULT_SUMMARY_INTERVAL, SummaryJob, should_summarize, summary_prompt};
use crate::providers::{ChatMessage, LlmProvider, LlmRequest, complete_text};

/// Prune idle lock entries once the table grows past this size.
const LOCK_PRUNE_THRESHOLD: usize = 1024;

/// Tunables for [`CoachService`].
#[derive(Debug, Clone)]
pub struct CoachSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f64>,
    pub system_prompt: Option<String>,
    pub history_limit: usize,
    pub summary_interval: u64,
    pub completion_timeout: Duration,
    pub default_title: String,
    pub default_session_type: String,
    pub max_message_chars: usize,
}

impl Default for CoachSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_tokens: 1024,
            temperature: Some(0.7),
            system_prompt: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
            summary_interval: DEFAULT_SUMMARY_INTERVAL,
            completion_timeout: Duration::from_secs(30),
            default_title: "Career Coach Chat".to_string(),
            default_session_type: "general".to_string(),
            max_message_chars: 8000,
        }
    }
}

/// A session together with its full message log.
#[derive(Debug, Clone, Serialize)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: CoachSession,
    pub messages: Vec<CoachMessage>,
}

/// Result of one completed coach turn.
#[derive(Debug)]
pub struct TurnOutcome {
    pub session_id: SessionId,
    pub assistant_text: String,
    /// Session message count after this turn was stored.
    pub message_count: u64,
    /// Present when this turn refreshed the rolling summary. Dropping the
    /// handle leaves the task running.
    pub summary_task: Option<JoinHandle<()>>,
}

/// Multi-turn career coach over a repository and an LLM provider.
pub struct CoachService {
    repo: Arc<dyn CoachRepository>,
    provider: Arc<dyn LlmProvider>,
    settings: CoachSettings,
    session_locks: KeyedLocks,
    owner_locks: KeyedLocks,
}

impl CoachService {
    pub fn new(
        repo: Arc<dyn CoachRepository>,
        provider: Arc<dyn LlmProvider>,
        settings: CoachSettings,
    ) -> Self {
        Self {
            repo,
            provider,
            settings,
            session_locks: KeyedLocks::new(),
            owner_locks: KeyedLocks::new(),
        }
    }

    pub fn settings(&self) -> &CoachSettings {
        &self.settings
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    pub async fn create_session(
        &self,
        owner: &UserId,
        title: Option<&str>,
        session_type: Option<&str>,
    ) -> Result<CoachSession> {
        let title = non_blank(title).unwrap_or(&self.settings.default_title);
        let session_type = non_blank(session_type).unwrap_or(&self.settings.default_session_type);

        let session = self.repo.create_session(owner, title, session_type).await?;
        info!(owner = %owner, session_id = %session.id, "coach session created");
        Ok(session)
    }

    /// Sessions of `owner`, newest first.
    pub async fn list_sessions(&self, owner: &UserId) -> Result<Vec<CoachSession>> {
        self.repo.list_sessions(owner).await
    }

    pub async fn get_session(&self, owner: &UserId, session_id: &SessionId) -> Result<SessionDetail> {
        let session = self.owned_session(owner, session_id).await?;
        let messages = self.repo.list_messages(&session.id).await?;
        Ok(SessionDetail { session, messages })
    }

    /// Soft-delete: the session is marked inactive, its messages stay.
    pub async fn archive_session(&self, owner: &UserId, session_id: &SessionId) -> Result<()> {
        if !self.repo.archive_session(owner, session_id).await? {
            return Err(session_not_found());
        }
        info!(owner = %owner, session_id = %session_id, "coach session archived");
        Ok(())
    }

    /// Newest active session of `owner`, or a fresh one with default title and type.
    pub async fn resolve_session(&self, owner: &UserId) -> Result<CoachSession> {
        let _guard = self.owner_locks.lock(owner.as_str()).await;

        if let Some(session) = self.repo.find_active_session(owner).await? {
            debug!(owner = %owner, session_id = %session.id, "reusing active coach session");
            return Ok(session);
        }
        self.create_session(owner, None, None).await
    }

    /// Run one turn, resolving a session first when `session_id` is `None`.
    pub async fn send_turn(
        &self,
        owner: &UserId,
        session_id: Option<&SessionId>,
        text: &str,
    ) -> Result<TurnOutcome> {
        self.validate_message(text)?;

        let session_id = match session_id {
            Some(id) => id.clone(),
            None => self.resolve_session(owner).await?.id,
        };
        self.execute_turn(owner, &session_id, text).await
    }

    /// Run one turn on an existing session.
    ///
    /// Nothing is stored unless the completion succeeds. Turns on the same
    /// session run one at a time.
    #[instrument(skip(self, text), fields(owner = %owner, session_id = %session_id))]
    pub async fn execute_turn(
        &self,
        owner: &UserId,
        session_id: &SessionId,
        text: &str,
    ) -> Result<TurnOutcome> {
        self.validate_message(text)?;

        let guard = self.session_locks.lock(session_id.as_str()).await;

        let session = self.owned_session(owner, session_id).await?;
        let history = self
            .repo
            .recent_messages(&session.id, self.settings.history_limit)
            .await?;
        let context = build_context(
            session.summary(),
            &history,
            text,
            self.settings.history_limit,
        );
        debug!(context_len = context.len(), "coach context assembled");

        let reply = self
            .complete(context.clone())
            .await
            .inspect_err(|e| warn!("coach completion failed: {e}"))?;

        let message_count = self.repo.record_turn(&session.id, text, &reply).await?;
        drop(guard);

        let summary_task = if should_summarize(message_count, self.settings.summary_interval) {
            Some(self.spawn_summary(session.id.clone(), summary_prompt(&context, &reply)))
        } else {
            None
        };

        if self.session_locks.len() > LOCK_PRUNE_THRESHOLD {
            self.session_locks.prune();
        }
        if self.owner_locks.len() > LOCK_PRUNE_THRESHOLD {
            self.owner_locks.prune();
        }

        info!(message_count, "coach turn completed");
        Ok(TurnOutcome {
            session_id: session.id,
            assistant_text: reply,
            message_count,
            summary_task,
        })
    }

    fn validate_message(&self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("Message is required".to_string()));
        }
        let chars = text.chars().count();
        if chars > self.settings.max_message_chars {
            return Err(Error::InvalidInput(format!(
                "Message is too long ({chars} characters, max {})",
                self.settings.max_message_chars
            )));
        }
        Ok(())
    }

    async fn owned_session(&self, owner: &UserId, session_id: &SessionId) -> Result<CoachSession> {
        self.repo
            .get_session(owner, session_id)
            .await?
            .ok_or_else(session_not_found)
    }

    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let request = LlmRequest {
            model: self.settings.model.clone(),
            messages,
            system: self.settings.system_prompt.clone(),
            max_tokens: Some(self.settings.max_tokens),
            temperature: self.settings.temperature,
        };
        complete_text(
            self.provider.as_ref(),
            &request,
            self.settings.completion_timeout,
        )
        .await
    }

    fn spawn_summary(&self, session_id: SessionId, prompt: Vec<ChatMessage>) -> JoinHandle<()> {
        let job = SummaryJob {
            repo: Arc::clone(&self.repo),
            provider: Arc::clone(&self.provider),
            model: self.settings.model.clone(),
            timeout: self.settings.completion_timeout,
            session_id,
            prompt,
        };
        tokio::spawn(async move {
            let session_id = job.session_id.clone();
            if let Err(e) = job.run().await {
                warn!(session_id = %session_id, "context summary refresh failed: {e}");
            }
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn session_not_found() -> Error {
    Error::NotFound("Session not found".to_string())
}
