use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::types::{SessionId, UserId};

/// One coaching conversation owned by a single user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachSession {
    pub id: SessionId,
    pub user_id: UserId,
    pub title: String,
    pub session_type: String,
    pub is_active: bool,
    pub message_count: u64,
    pub context_summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CoachSession {
    /// The rolling summary, if one exists and is not blank.
    pub fn summary(&self) -> Option<&str> {
        self.context_summary
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// An immutable role-tagged utterance persisted under a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachMessage {
    pub id: String,
    pub session_id: SessionId,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            "system" => Ok(MessageRole::System),
            other => Err(Error::Database(format!("unknown message role '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with_summary(summary: Option<&str>) -> CoachSession {
        let now = Utc::now();
        CoachSession {
            id: SessionId::generate(),
            user_id: UserId::new("u1"),
            title: "Career Coach Chat".to_string(),
            session_type: "general".to_string(),
            is_active: true,
            message_count: 0,
            context_summary: summary.map(str::to_string),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn blank_summary_is_treated_as_absent() {
        assert!(session_with_summary(None).summary().is_none());
        assert!(session_with_summary(Some("   ")).summary().is_none());
        assert_eq!(
            session_with_summary(Some(" wants a PM role ")).summary(),
            Some("wants a PM role")
        );
    }

    #[test]
    fn role_round_trips_through_str() {
        for role in [MessageRole::User, MessageRole::Assistant, MessageRole::System] {
            assert_eq!(role.as_str().parse::<MessageRole>().unwrap(), role);
        }
        assert!("tool".parse::<MessageRole>().is_err());
    }
}
