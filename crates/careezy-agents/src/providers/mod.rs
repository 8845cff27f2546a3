use async_trait::async_trait;
use careezy_common::{Error, MessageRole, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod anthropic;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;

/// Trait for LLM completion backends (OpenAI-compatible, Anthropic).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider identifier (e.g. "openai", "anthropic").
    fn provider_id(&self) -> &str;

    /// Send a completion request and return the response.
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse>;

    /// Check if the provider is reachable and the credentials are accepted.
    async fn health_check(&self) -> Result<bool>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub system: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl From<MessageRole> for ChatRole {
    fn from(role: MessageRole) -> Self {
        match role {
            MessageRole::System => ChatRole::System,
            MessageRole::User => ChatRole::User,
            MessageRole::Assistant => ChatRole::Assistant,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    pub model: String,
    pub usage: Option<Usage>,
    pub stop_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Run one completion bounded by `timeout` and return its trimmed text.
///
/// A timeout, a provider error and an empty reply are all reported as
/// [`Error::Agent`]. Nothing is retried.
pub async fn complete_text(
    provider: &dyn LlmProvider,
    request: &LlmRequest,
    timeout: Duration,
) -> Result<String> {
    let response = match tokio::time::timeout(timeout, provider.complete(request)).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(Error::Agent(format!(
                "{} completion timed out after {}ms",
                provider.provider_id(),
                timeout.as_millis()
            )));
        }
    };

    let text = response.text.trim();
    if text.is_empty() {
        return Err(Error::Agent(format!(
            "{} returned an empty completion",
            provider.provider_id()
        )));
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowProvider {
        delay: Duration,
        text: &'static str,
    }

    #[async_trait]
    impl LlmProvider for SlowProvider {
        fn provider_id(&self) -> &str {
            "slow"
        }

        async fn complete(&self, _request: &LlmRequest) -> Result<LlmResponse> {
            tokio::time::sleep(self.delay).await;
            Ok(LlmResponse {
                text: self.text.to_string(),
                model: "slow-1".to_string(),
                usage: None,
                stop_reason: Some("stop".to_string()),
            })
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }

    fn request() -> LlmRequest {
        LlmRequest {
            model: "m".to_string(),
            messages: vec![ChatMessage::user("hi")],
            system: None,
            max_tokens: None,
            temperature: None,
        }
    }

    #[tokio::test]
    async fn complete_text_trims_reply() {
        let provider = SlowProvider {
            delay: Duration::ZERO,
            text: "  hello  \n",
        };
        let text = complete_text(&provider, &request(), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(text, "hello");
    }

    #[tokio::test]
    async fn complete_text_times_out() {
        let provider = SlowProvider {
            delay: Duration::from_millis(200),
            text: "late",
        };
        let err = complete_text(&provider, &request(), Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Agent(ref m) if m.contains("timed out")));
    }

    #[tokio::test]
    async fn complete_text_rejects_blank_reply() {
        let provider = SlowProvider {
            delay: Duration::ZERO,
            text: "   ",
        };
        assert!(
            complete_text(&provider, &request(), Duration::from_secs(1))
                .await
                .is_err()
        );
    }

    #[test]
    fn chat_role_serializes_lowercase() {
        let json = serde_json::to_string(&ChatMessage::assistant("ok")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"ok"}"#);
    }
}
