use careezy_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub llm: LlmProviderConfig,
    pub coach: CoachConfig,
    pub job_search: JobSearchConfig,
    pub billing: BillingConfig,
}

impl AppConfig {
    /// Reject configurations the server cannot start with.
    ///
    /// Auth backend and completion API credentials are required. Job search
    /// and billing credentials are optional.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if is_blank(&self.auth.supabase_url) {
            problems.push("auth.supabase_url is not set (SUPABASE_URL)".to_string());
        }
        if is_blank(&self.auth.service_key) {
            problems.push("auth.service_key is not set (SUPABASE_SERVICE_KEY)".to_string());
        }

        match self.llm.provider.as_str() {
            "openai" | "anthropic" => {}
            other => problems.push(format!("llm.provider '{other}' is not supported")),
        }
        if is_blank(&self.llm.api_key) {
            problems.push("llm.api_key is not set".to_string());
        }
        if self.llm.timeout_secs == 0 {
            problems.push("llm.timeout_secs must be greater than zero".to_string());
        }

        if self.job_search.timeout_secs == 0 || self.billing.timeout_secs == 0 {
            problems.push(
                "job_search.timeout_secs and billing.timeout_secs must be greater than zero"
                    .to_string(),
            );
        }

        if self.coach.history_limit == 0 {
            problems.push("coach.history_limit must be greater than zero".to_string());
        }
        if self.coach.summary_interval == 0 {
            problems.push("coach.summary_interval must be greater than zero".to_string());
        }

        for (name, rl) in [
            ("gateway.rate_limit", &self.gateway.rate_limit),
            ("gateway.ai_rate_limit", &self.gateway.ai_rate_limit),
        ] {
            if rl.replenish_secs == 0 || rl.burst_size == 0 {
                problems.push(format!("{name} values must be greater than zero"));
            }
        }

        let urls = [
            ("auth.supabase_url", self.auth.supabase_url.as_deref()),
            ("llm.base_url", self.llm.base_url.as_deref()),
            ("gateway.frontend_url", Some(self.gateway.frontend_url.as_str())),
            ("job_search.base_url", Some(self.job_search.base_url.as_str())),
            ("billing.base_url", Some(self.billing.base_url.as_str())),
        ];
        for (name, value) in urls {
            let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
                continue;
            };
            if let Err(problem) = check_http_url(value) {
                problems.push(format!("{name} {problem}"));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(problems.join("; ")))
        }
    }
}

fn check_http_url(value: &str) -> std::result::Result<(), String> {
    let url = url::Url::parse(value).map_err(|e| format!("is not a valid URL ({e})"))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("must use http or https, not {other}")),
    }
}

fn is_blank(value: &Option<String>) -> bool {
    non_blank(value).is_none()
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Origin allowed by CORS and used to build billing redirect URLs.
    pub frontend_url: String,
    pub rate_limit: RateLimitConfig,
    /// Stricter limit applied to routes that call the completion API.
    pub ai_rate_limit: RateLimitConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            frontend_url: "http://localhost:3000".to_string(),
            // 100 requests per 15 minutes
            rate_limit: RateLimitConfig {
                replenish_secs: 9,
                burst_size: 100,
            },
            // 20 requests per hour
            ai_rate_limit: RateLimitConfig {
                replenish_secs: 180,
                burst_size: 20,
            },
        }
    }
}

/// Per-IP token bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// One request is returned to the bucket every `replenish_secs` seconds.
    pub replenish_secs: u64,
    pub burst_size: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file. Defaults to `~/.careezy/careezy.db`.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub supabase_url: Option<String>,
    pub service_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmProviderConfig {
    /// `openai` or `anthropic`.
    pub provider: String,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub max_tokens: u32,
    pub temperature: Option<f64>,
    pub timeout_secs: u64,
}

impl Default for LlmProviderConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: None,
            api_key: None,
            base_url: None,
            max_tokens: 1024,
            temperature: None,
            timeout_secs: 30,
        }
    }
}

impl LlmProviderConfig {
    pub fn model_or_default(&self) -> String {
        if let Some(model) = self.model.as_deref().filter(|m| !m.trim().is_empty()) {
            return model.to_string();
        }
        match self.provider.as_str() {
            "anthropic" => "claude-3-sonnet-20240229".to_string(),
            _ => "gpt-4o-mini".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoachConfig {
    /// Persisted messages included in each completion request.
    pub history_limit: usize,
    /// The rolling summary is regenerated whenever the message count reaches
    /// a positive multiple of this value.
    pub summary_interval: u64,
    pub default_title: String,
    pub default_session_type: String,
    pub system_prompt: String,
    pub max_message_chars: usize,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            history_limit: 15,
            summary_interval: 20,
            default_title: "Career Coach Chat".to_string(),
            default_session_type: "general".to_string(),
            system_prompt: "You are an experienced, encouraging career coach for students and \
                            early-career professionals. Give specific, actionable advice about \
                            resumes, internships, interviews and career planning. Keep answers \
                            concise."
                .to_string(),
            max_message_chars: 8000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSearchConfig {
    pub app_id: Option<String>,
    pub api_key: Option<String>,
    pub base_url: String,
    pub country: String,
    pub results_per_page: u32,
    pub timeout_secs: u64,
}

impl Default for JobSearchConfig {
    fn default() -> Self {
        Self {
            app_id: None,
            api_key: None,
            base_url: "https://api.adzuna.com/v1/api/jobs".to_string(),
            country: "us".to_string(),
            results_per_page: 20,
            timeout_secs: 10,
        }
    }
}

impl JobSearchConfig {
    /// `(app_id, api_key)` when both are set and non-blank.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((non_blank(&self.app_id)?, non_blank(&self.api_key)?))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    pub secret_key: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            base_url: "https://api.stripe.com".to_string(),
            timeout_secs: 10,
        }
    }
}

impl BillingConfig {
    /// The secret key, unless unset or blank.
    pub fn api_key(&self) -> Option<&str> {
        non_blank(&self.secret_key)
    }
}
