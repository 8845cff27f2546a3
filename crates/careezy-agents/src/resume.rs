use std::sync::Arc;
use std::time::Duration;

use careezy_common::{Error, Result};
use tracing::instrument;

use crate::providers::{ChatMessage, LlmProvider, LlmRequest, complete_text};

/// One-shot resume feedback backed by an LLM provider.
pub struct ResumeAdvisor {
    provider: Arc<dyn LlmProvider>,
    model: String,
    max_tokens: u32,
    timeout: Duration,
}

impl ResumeAdvisor {
    pub fn new(provider: Arc<dyn LlmProvider>, model: String, timeout: Duration) -> Self {
        Self {
            provider,
            model,
            max_tokens: 1024,
            timeout,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Improvement suggestions for a resume.
    #[instrument(skip_all, fields(resume_chars = resume_content.len()))]
    pub async fn suggestions(&self, resume_content: &str) -> Result<String> {
        let resume = required(resume_content, "Resume content is required")?;
        self.ask(format!(
            "Analyze this resume content and provide suggestions for improvement: {resume}"
        ))
        .await
    }

    /// Reasoning about how well a resume fits a job description.
    #[instrument(skip_all)]
    pub async fn match_reasoning(&self, job_description: &str, resume_content: &str) -> Result<String> {
        let job = required(job_description, "Job description is required")?;
        let resume = required(resume_content, "Resume content is required")?;
        self.ask(format!(
            "Analyze the fit between this job description and resume. Provide reasoning.\n\nJob: {job}\n\nResume: {resume}"
        ))
        .await
    }

    async fn ask(&self, prompt: String) -> Result<String> {
        let request = LlmRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(prompt)],
            system: None,
            max_tokens: Some(self.max_tokens),
            temperature: None,
        };
        complete_text(self.provider.as_ref(), &request, self.timeout).await
    }
}

fn required<'a>(value: &'a str, message: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput(message.to_string()));
    }
    Ok(trimmed)
}
