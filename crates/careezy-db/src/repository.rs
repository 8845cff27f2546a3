use async_trait::async_trait;
use careezy_common::{CoachMessage, CoachSession, Result, SessionId, UserId};
use std::path::Path;
use tokio::sync::Mutex;

use crate::coach_store::CoachStore;

/// Storage seam for the coach: sessions, their message log and counters.
///
/// Implementations must scope every session lookup to its owner and must
/// persist a turn's two messages together with the counter increment.
#[async_trait]
pub trait CoachRepository: Send + Sync {
    async fn create_session(
        &self,
        user_id: &UserId,
        title: &str,
        session_type: &str,
    ) -> Result<CoachSession>;

    async fn get_session(
        &self,
        user_id: &UserId,
        session_id: &SessionId,
    ) -> Result<Option<CoachSession>>;

    async fn list_sessions(&self, user_id: &UserId) -> Result<Vec<CoachSession>>;

    async fn find_active_session(&self, user_id: &UserId) -> Result<Option<CoachSession>>;

    async fn archive_session(&self, user_id: &UserId, session_id: &SessionId) -> Result<bool>;

    async fn list_messages(&self, session_id: &SessionId) -> Result<Vec<CoachMessage>>;

    async fn recent_messages(
        &self,
        session_id: &SessionId,
        limit: usize,
    ) -> Result<Vec<CoachMessage>>;

    /// Persist a completed turn and return the post-increment message count.
    async fn record_turn(
        &self,
        session_id: &SessionId,
        user_text: &str,
        assistant_text: &str,
    ) -> Result<u64>;

    async fn update_summary(&self, session_id: &SessionId, summary: &str) -> Result<bool>;
}

/// [`CoachRepository`] over a single SQLite connection.
pub struct SqliteCoachRepository {
    store: Mutex<CoachStore>,
}

impl SqliteCoachRepository {
    pub fn new(store: CoachStore) -> Self {
        Self {
            store: Mutex::new(store),
        }
    }

    pub fn open(db_path: &Path) -> Result<Self> {
        Ok(Self::new(CoachStore::open(db_path)?))
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(CoachStore::in_memory()?))
    }

    pub async fn count_messages(&self, session_id: &SessionId) -> Result<u64> {
        self.store.lock().await.count_messages(session_id)
    }
}

#[async_trait]
impl CoachRepository for SqliteCoachRepository {
    async fn create_session(
        &self,
        user_id: &UserId,
        title: &str,
        session_type: &str,
    ) -> Result<CoachSession> {
        self.store
            .lock()
            .await
            .create_session(user_id, title, session_type)
    }

    async fn get_session(
        &self,
        user_id: &UserId,
        session_id: &SessionId,
    ) -> Result<Option<CoachSession>> {
        self.store.lock().await.get_session(user_id, session_id)
    }

    async fn list_sessions(&self, user_id: &UserId) -> Result<Vec<CoachSession>> {
        self.store.lock().await.list_sessions(user_id)
    }

    async fn find_active_session(&self, user_id: &UserId) -> Result<Option<CoachSession>> {
        self.store.lock().await.find_active_session(user_id)
    }

    async fn archive_session(&self, user_id: &UserId, session_id: &SessionId) -> Result<bool> {
        self.store.lock().await.archive_session(user_id, session_id)
    }

    async fn list_messages(&self, session_id: &SessionId) -> Result<Vec<CoachMessage>> {
        self.store.lock().await.list_messages(session_id)
    }

    async fn recent_messages(
        &self,
        session_id: &SessionId,
        limit: usize,
    ) -> Result<Vec<CoachMessage>> {
        self.store
            .lock()
            .await
            .load_recent_messages(session_id, limit)
    }

    async fn record_turn(
        &self,
        session_id: &SessionId,
        user_text: &str,
        assistant_text: &str,
    ) -> Result<u64> {
        self.store
            .lock()
            .await
            .record_turn(session_id, user_text, assistant_text)
    }

    async fn update_summary(&self, session_id: &SessionId, summary: &str) -> Result<bool> {
        self.store.lock().await.update_summary(session_id, summary)
    }
}
