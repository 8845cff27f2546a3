use std::path::{Path, PathBuf};

use careezy_common::{Error, Result};
use tracing::{info, warn};

use crate::model::AppConfig;

/// Loads [`AppConfig`] from YAML and layers environment overrides on top.
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn default_config_dir() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".careezy"))
            .unwrap_or_else(|| PathBuf::from(".careezy"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yml")
    }

    pub fn default_database_path() -> PathBuf {
        Self::default_config_dir().join("careezy.db")
    }

    /// Load from `path` (or the default location), falling back to defaults
    /// when the file does not exist, then apply process environment overrides.
    pub fn load(path: Option<&Path>) -> Result<AppConfig> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_config_path);

        let mut config = if path.exists() {
            info!("loading config from {}", path.display());
            Self::from_file(&path)?
        } else {
            warn!("config file not found at {}, using defaults", path.display());
            AppConfig::default()
        };

        Self::apply_env_with(&mut config, |key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<AppConfig> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<AppConfig> {
        if contents.trim().is_empty() {
            return Ok(AppConfig::default());
        }
        serde_yaml::from_str(contents)
            .map_err(|e| Error::Config(format!("failed to parse config: {e}")))
    }

    /// Apply overrides using `lookup` to read variables. Empty values are ignored.
    pub fn apply_env_with<F>(config: &mut AppConfig, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("SUPABASE_URL") {
            config.auth.supabase_url = Some(v);
        }
        if let Some(v) = get("SUPABASE_SERVICE_KEY") {
            config.auth.service_key = Some(v);
        }

        if let Some(v) = get("CAREEZY_LLM_PROVIDER") {
            config.llm.provider = v.trim().to_ascii_lowercase();
        }
        if let Some(v) = get("CAREEZY_LLM_MODEL") {
            config.llm.model = Some(v);
        }
        if let Some(v) = get("CAREEZY_LLM_BASE_URL") {
            config.llm.base_url = Some(v);
        }
        // Provider-specific key wins only when no key is configured explicitly.
        if config.llm.api_key.is_none() {
            let key_var = match config.llm.provider.as_str() {
                "anthropic" => "ANTHROPIC_API_KEY",
                _ => "OPENAI_API_KEY",
            };
            config.llm.api_key = get(key_var);
        }

        if let Some(v) = get("ADZUNA_APP_ID") {
            config.job_search.app_id = Some(v);
        }
        if let Some(v) = get("ADZUNA_API_KEY") {
            config.job_search.api_key = Some(v);
        }

        if let Some(v) = get("STRIPE_SECRET_KEY") {
            config.billing.secret_key = Some(v);
        }

        if let Some(v) = get("FRONTEND_URL") {
            config.gateway.frontend_url = v;
        }
        if let Some(v) = get("PORT") {
            match v.trim().parse() {
                Ok(port) => config.gateway.port = port,
                Err(_) => warn!("ignoring invalid PORT value: {v}"),
            }
        }

        if let Some(v) = get("CAREEZY_DB_PATH") {
            config.database.path = Some(PathBuf::from(v));
        }
    }
}
