use super::{ChatMessage, ChatRole, LlmProvider, LlmRequest, LlmResponse, Usage};
use async_trait::async_trait;
use careezy_common::{Error, Result};
use reqwest::Client;
use serde_json::json;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    api_key: String,
    client: Client,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: Client::new(),
            base_url: ANTHROPIC_API_URL.to_string(),
        }
    }

    /// Point the client at another API root; `/v1/messages` is appended.
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    fn create_request_body(&self, request: &LlmRequest) -> serde_json::Value {
        let (system, messages) = split_messages(request.system.as_deref(), &request.messages);

        let mut body = json!({
            "model": request.model,
            "messages": messages
                .iter()
                .map(|(role, content)| json!({ "role": role, "content": content }))
                .collect::<Vec<_>>(),
            "max_tokens": request.max_tokens.unwrap_or(1024),
        });

        if let Some(system) = system {
            body["system"] = json!(system);
        }

        if let Some(temp) = request.temperature {
            body["temperature"] = json!(temp);
        }

        body
    }
}

/// Fold system-role messages into the top-level system prompt and shape the
/// rest into the alternating user/assistant sequence the Messages API expects.
///
/// Leading assistant turns are dropped and consecutive turns from the same
/// role are joined with a blank line.
fn split_messages(
    system: Option<&str>,
    messages: &[ChatMessage],
) -> (Option<String>, Vec<(&'static str, String)>) {
    let mut system_parts: Vec<&str> = system.into_iter().collect();
    let mut turns: Vec<(&'static str, String)> = Vec::new();

    for msg in messages {
        let role = match msg.role {
            ChatRole::System => {
                system_parts.push(&msg.content);
                continue;
            }
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        };

        if turns.is_empty() && role == "assistant" {
            continue;
        }

        match turns.last_mut() {
            Some((last_role, content)) if *last_role == role => {
                content.push_str("\n\n");
                content.push_str(&msg.content);
            }
            _ => turns.push((role, msg.content.clone())),
        }
    }

    let system = if system_parts.is_empty() {
        None
    } else {
        Some(system_parts.join("\n\n"))
    };
    (system, turns)
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn provider_id(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let body = self.create_request_body(request);

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Agent(format!("Network error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Agent(format!(
                "Anthropic API error: status={status}, body={error_text}"
            )));
        }

        let raw_response: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::Agent(format!("Failed to parse Anthropic response: {e}")))?;

        let text = raw_response["content"]
            .as_array()
            .ok_or_else(|| Error::Agent("Missing content".to_string()))?
            .iter()
            .filter(|block| block["type"] == "text")
            .filter_map(|block| block["text"].as_str())
            .collect::<Vec<_>>()
            .join("");

        let usage = raw_response.get("usage").map(|u| Usage {
            input_tokens: u["input_tokens"].as_u64().unwrap_or(0) as u32,
            output_tokens: u["output_tokens"].as_u64().unwrap_or(0) as u32,
        });

        Ok(LlmResponse {
            text,
            model: raw_response["model"]
                .as_str()
                .unwrap_or(&request.model)
                .to_string(),
            usage,
            stop_reason: raw_response["stop_reason"].as_str().map(String::from),
        })
    }

    async fn health_check(&self) -> Result<bool> {
        let response = self
            .client
            .get(format!("{}/v1/models", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .send()
            .await;

        match response {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }
}
