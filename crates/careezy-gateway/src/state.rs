use std::sync::Arc;
use std::time::Duration;

use careezy_agents::{CoachService, CoachSettings, LlmProvider, ResumeAdvisor};
use careezy_common::Result;
use careezy_config::AppConfig;
use careezy_db::CoachRepository;
use careezy_security::TokenVerifier;
use tracing::warn;

use crate::billing::BillingClient;
use crate::internships::JobSearchClient;

/// Shared state for the HTTP handlers. Built once at startup.
pub struct AppState {
    pub config: AppConfig,
    pub coach: CoachService,
    pub resumes: ResumeAdvisor,
    pub verifier: Arc<dyn TokenVerifier>,
    pub job_search: Option<JobSearchClient>,
    pub billing: Option<BillingClient>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Wire the handlers' services around already-built collaborators.
    pub fn new(
        config: AppConfig,
        repo: Arc<dyn CoachRepository>,
        provider: Arc<dyn LlmProvider>,
        verifier: Arc<dyn TokenVerifier>,
    ) -> Result<Self> {
        let settings = coach_settings(&config);
        let resumes = ResumeAdvisor::new(
            Arc::clone(&provider),
            settings.model.clone(),
            settings.completion_timeout,
        )
        .with_max_tokens(config.llm.max_tokens);
        let coach = CoachService::new(repo, provider, settings);

        let job_search = JobSearchClient::from_config(&config.job_search)?;
        if job_search.is_none() {
            warn!("ADZUNA_APP_ID/ADZUNA_API_KEY not set, internship search is disabled");
        }
        let billing = BillingClient::from_config(&config.billing, &config.gateway.frontend_url)?;
        if billing.is_none() {
            warn!("STRIPE_SECRET_KEY not set, checkout is disabled");
        }

        Ok(Self {
            config,
            coach,
            resumes,
            verifier,
            job_search,
            billing,
        })
    }
}

/// Coach tunables derived from the `llm` and `coach` config sections.
pub fn coach_settings(config: &AppConfig) -> CoachSettings {
    let prompt = config.coach.system_prompt.trim();
    CoachSettings {
        model: config.llm.model_or_default(),
        max_tokens: config.llm.max_tokens,
        temperature: config.llm.temperature,
        system_prompt: (!prompt.is_empty()).then(|| prompt.to_string()),
        history_limit: config.coach.history_limit,
        summary_interval: config.coach.summary_interval,
        completion_timeout: Duration::from_secs(config.llm.timeout_secs),
        default_title: config.coach.default_title.clone(),
        default_session_type: config.coach.default_session_type.clone(),
        max_message_chars: config.coach.max_message_chars,
    }
}
