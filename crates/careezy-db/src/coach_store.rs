use careezy_common::{CoachMessage, CoachSession, Error, MessageRole, Result, SessionId, UserId};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use tracing::{info, warn};

const SESSION_COLUMNS: &str = "id, user_id, title, session_type, is_active, message_count, \
                               context_summary, created_at, updated_at";

/// SQLite storage for coaching sessions and their message log.
///
/// Every session query is filtered by owner. Message queries take a session id
/// and are only reached after the owning session has been loaded for the
/// caller.
pub struct CoachStore {
    conn: Connection,
}

impl CoachStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        info!("opening coach store at {}", db_path.display());
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path)
            .map_err(|e| Error::Database(format!("failed to open database: {e}")))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| Error::Database(format!("failed to set pragmas: {e}")))?;

        let store = Self { conn };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Database(format!("failed to open in-memory database: {e}")))?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| Error::Database(format!("failed to set pragmas: {e}")))?;

        let store = Self { conn };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS coaching_sessions (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    title TEXT NOT NULL,
                    session_type TEXT NOT NULL,
                    is_active INTEGER NOT NULL DEFAULT 1,
                    message_count INTEGER NOT NULL DEFAULT 0,
                    context_summary TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_sessions_owner
                    ON coaching_sessions(user_id, is_active, created_at);

                CREATE TABLE IF NOT EXISTS coaching_messages (
                    id TEXT PRIMARY KEY,
                    session_id TEXT NOT NULL REFERENCES coaching_sessions(id),
                    role TEXT NOT NULL CHECK (role IN ('user', 'assistant', 'system')),
                    content TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_messages_session
                    ON coaching_messages(session_id, created_at);

                CREATE TRIGGER IF NOT EXISTS coaching_messages_no_update
                    BEFORE UPDATE ON coaching_messages
                    BEGIN SELECT RAISE(ABORT, 'coaching messages are immutable'); END;

                CREATE TRIGGER IF NOT EXISTS coaching_messages_no_delete
                    BEFORE DELETE ON coaching_messages
                    BEGIN SELECT RAISE(ABORT, 'coaching messages are immutable'); END;",
            )
            .map_err(|e| Error::Database(format!("migration failed: {e}")))?;
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn create_session(
        &self,
        user_id: &UserId,
        title: &str,
        session_type: &str,
    ) -> Result<CoachSession> {
        let now = Utc::now();
        let session = CoachSession {
            id: SessionId::generate(),
            user_id: user_id.clone(),
            title: title.to_string(),
            session_type: session_type.to_string(),
            is_active: true,
            message_count: 0,
            context_summary: None,
            created_at: now,
            updated_at: now,
        };

        self.conn
            .execute(
                "INSERT INTO coaching_sessions
                    (id, user_id, title, session_type, is_active, message_count, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 1, 0, ?5, ?5)",
                params![
                    session.id.as_str(),
                    user_id.as_str(),
                    session.title,
                    session.session_type,
                    format_timestamp(now),
                ],
            )
            .map_err(|e| Error::Database(format!("failed to create session: {e}")))?;
        Ok(session)
    }

    /// Load a session only if it belongs to `user_id`.
    pub fn get_session(
        &self,
        user_id: &UserId,
        session_id: &SessionId,
    ) -> Result<Option<CoachSession>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {SESSION_COLUMNS} FROM coaching_sessions WHERE id = ?1 AND user_id = ?2"
                ),
                params![session_id.as_str(), user_id.as_str()],
                session_from_row,
            )
            .optional()
            .map_err(|e| Error::Database(format!("failed to load session: {e}")))
    }

    /// All sessions of a user, newest first.
    pub fn list_sessions(&self, user_id: &UserId) -> Result<Vec<CoachSession>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM coaching_sessions
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC"
            ))
            .map_err(|e| Error::Database(format!("failed to prepare session query: {e}")))?;

        let rows = stmt
            .query_map(params![user_id.as_str()], session_from_row)
            .map_err(|e| Error::Database(format!("failed to list sessions: {e}")))?;

        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(
                row.map_err(|e| Error::Database(format!("failed to read session row: {e}")))?,
            );
        }
        Ok(sessions)
    }

    /// Most recently created active session of a user.
    pub fn find_active_session(&self, user_id: &UserId) -> Result<Option<CoachSession>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {SESSION_COLUMNS} FROM coaching_sessions
                     WHERE user_id = ?1 AND is_active = 1
                     ORDER BY created_at DESC, rowid DESC
                     LIMIT 1"
                ),
                params![user_id.as_str()],
                session_from_row,
            )
            .optional()
            .map_err(|e| Error::Database(format!("failed to find active session: {e}")))
    }

    /// Soft-archive a session. Returns false when no owned session matched.
    pub fn archive_session(&self, user_id: &UserId, session_id: &SessionId) -> Result<bool> {
        let rows = self
            .conn
            .execute(
                "UPDATE coaching_sessions SET is_active = 0, updated_at = ?3
                 WHERE id = ?1 AND user_id = ?2",
                params![
                    session_id.as_str(),
                    user_id.as_str(),
                    format_timestamp(Utc::now())
                ],
            )
            .map_err(|e| Error::Database(format!("failed to archive session: {e}")))?;
        Ok(rows > 0)
    }

    /// Full message log of a session in chronological order.
    pub fn list_messages(&self, session_id: &SessionId) -> Result<Vec<CoachMessage>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, session_id, role, content, created_at
                 FROM coaching_messages
                 WHERE session_id = ?1
                 ORDER BY created_at ASC, rowid ASC",
            )
            .map_err(|e| Error::Database(format!("failed to prepare message query: {e}")))?;

        let rows = stmt
            .query_map(params![session_id.as_str()], message_from_row)
            .map_err(|e| Error::Database(format!("failed to load messages: {e}")))?;

        collect_messages(rows)
    }

    /// Load the most recent `limit` messages in chronological order.
    pub fn load_recent_messages(
        &self,
        session_id: &SessionId,
        limit: usize,
    ) -> Result<Vec<CoachMessage>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, session_id, role, content, created_at
                 FROM coaching_messages
                 WHERE session_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2",
            )
            .map_err(|e| Error::Database(format!("failed to prepare message query: {e}")))?;

        let rows = stmt
            .query_map(params![session_id.as_str(), limit as i64], message_from_row)
            .map_err(|e| Error::Database(format!("failed to load messages: {e}")))?;

        let mut messages = collect_messages(rows)?;
        // Query is DESC for efficient tail fetch; return in chronological order.
        messages.reverse();
        Ok(messages)
    }

    /// Persist one completed turn: the user message, the assistant reply and
    /// the counter increment commit together or not at all.
    ///
    /// Returns the post-increment message count.
    pub fn record_turn(
        &self,
        session_id: &SessionId,
        user_text: &str,
        assistant_text: &str,
    ) -> Result<u64> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| Error::Database(format!("failed to begin transaction: {e}")))?;

        let user_at = Utc::now();
        let assistant_at = strictly_after(user_at);

        let updated = tx
            .execute(
                "UPDATE coaching_sessions
                 SET message_count = message_count + 2, updated_at = ?2
                 WHERE id = ?1",
                params![session_id.as_str(), format_timestamp(assistant_at)],
            )
            .map_err(|e| Error::Database(format!("failed to update message count: {e}")))?;
        if updated == 0 {
            return Err(Error::NotFound(format!("session {session_id}")));
        }

        for (role, content, at) in [
            (MessageRole::User, user_text, user_at),
            (MessageRole::Assistant, assistant_text, assistant_at),
        ] {
            tx.execute(
                "INSERT INTO coaching_messages (id, session_id, role, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    uuid::Uuid::new_v4().to_string(),
                    session_id.as_str(),
                    role.as_str(),
                    content,
                    format_timestamp(at),
                ],
            )
            .map_err(|e| Error::Database(format!("failed to append {role} message: {e}")))?;
        }

        let count: i64 = tx
            .query_row(
                "SELECT message_count FROM coaching_sessions WHERE id = ?1",
                params![session_id.as_str()],
                |row| row.get(0),
            )
            .map_err(|e| Error::Database(format!("failed to read message count: {e}")))?;

        tx.commit()
            .map_err(|e| Error::Database(format!("failed to commit turn: {e}")))?;
        Ok(count.max(0) as u64)
    }

    /// Replace the rolling summary. Returns false if the session is gone.
    pub fn update_summary(&self, session_id: &SessionId, summary: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute(
                "UPDATE coaching_sessions SET context_summary = ?2, updated_at = ?3 WHERE id = ?1",
                params![session_id.as_str(), summary, format_timestamp(Utc::now())],
            )
            .map_err(|e| Error::Database(format!("failed to update summary: {e}")))?;
        Ok(rows > 0)
    }

    pub fn count_messages(&self, session_id: &SessionId) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM coaching_messages WHERE session_id = ?1",
                params![session_id.as_str()],
                |row| row.get(0),
            )
            .map_err(|e| Error::Database(format!("failed to count messages: {e}")))?;
        Ok(count.max(0) as u64)
    }
}

fn collect_messages(
    rows: impl Iterator<Item = rusqlite::Result<CoachMessage>>,
) -> Result<Vec<CoachMessage>> {
    let mut messages = Vec::new();
    for row in rows {
        messages
            .push(row.map_err(|e| Error::Database(format!("failed to read message row: {e}")))?);
    }
    Ok(messages)
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<CoachSession> {
    let id: String = row.get(0)?;
    let user_id: String = row.get(1)?;
    let count: i64 = row.get(5)?;
    let created_raw: String = row.get(7)?;
    let updated_raw: String = row.get(8)?;
    Ok(CoachSession {
        id: SessionId::new(id),
        user_id: UserId::new(user_id),
        title: row.get(2)?,
        session_type: row.get(3)?,
        is_active: row.get(4)?,
        message_count: count.max(0) as u64,
        context_summary: row.get(6)?,
        created_at: parse_timestamp(&created_raw),
        updated_at: parse_timestamp(&updated_raw),
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<CoachMessage> {
    let session_id: String = row.get(1)?;
    let role_raw: String = row.get(2)?;
    let role = role_raw
        .parse::<MessageRole>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;
    let created_raw: String = row.get(4)?;
    Ok(CoachMessage {
        id: row.get(0)?,
        session_id: SessionId::new(session_id),
        role,
        content: row.get(3)?,
        created_at: parse_timestamp(&created_raw),
    })
}

/// Fixed-width RFC 3339 so lexical order in SQLite matches time order.
fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn strictly_after(earlier: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    let min = earlier + chrono::Duration::microseconds(1);
    if now > min { now } else { min }
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            warn!("failed to parse timestamp '{}': {e}, falling back to now", value);
            Utc::now()
        })
}
