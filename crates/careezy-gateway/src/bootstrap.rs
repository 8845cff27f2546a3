use std::sync::Arc;

use careezy_agents::{AnthropicProvider, LlmProvider, OpenAiProvider};
use careezy_common::{Error, Result};
use careezy_config::{AppConfig, ConfigLoader, LlmProviderConfig};
use careezy_db::SqliteCoachRepository;
use careezy_security::SupabaseTokenVerifier;
use tracing::info;

use crate::state::{AppState, SharedState};

/// Build the completion provider named by `llm.provider`.
pub fn build_provider(llm: &LlmProviderConfig) -> Result<Arc<dyn LlmProvider>> {
    let api_key = llm
        .api_key
        .clone()
        .ok_or_else(|| Error::Config(format!("no API key configured for {}", llm.provider)))?;

    let provider: Arc<dyn LlmProvider> = match llm.provider.as_str() {
        "openai" => Arc::new(OpenAiProvider::new(api_key, llm.base_url.clone())),
        "anthropic" => {
            let provider = AnthropicProvider::new(api_key);
            match &llm.base_url {
                Some(url) => Arc::new(provider.with_base_url(url.clone())),
                None => Arc::new(provider),
            }
        }
        other => {
            return Err(Error::Config(format!("unknown LLM provider '{other}'")));
        }
    };

    info!(
        provider = provider.provider_id(),
        model = %llm.model_or_default(),
        "LLM provider configured"
    );
    Ok(provider)
}

/// Validate the config and construct every collaborator. Fails fast on
/// missing credentials.
pub fn build_state(config: AppConfig) -> Result<SharedState> {
    config.validate()?;

    let db_path = config
        .database
        .path
        .clone()
        .unwrap_or_else(ConfigLoader::default_database_path);
    let repo = Arc::new(SqliteCoachRepository::open(&db_path)?);
    info!("coach store opened at {}", db_path.display());

    let provider = build_provider(&config.llm)?;

    let (Some(auth_url), Some(service_key)) =
        (&config.auth.supabase_url, &config.auth.service_key)
    else {
        return Err(Error::Config(
            "SUPABASE_URL and SUPABASE_SERVICE_KEY are required".to_string(),
        ));
    };
    let verifier = Arc::new(SupabaseTokenVerifier::new(auth_url, service_key)?);

    let state = AppState::new(config, repo, provider, verifier)?;
    Ok(Arc::new(state))
}
