use std::time::Duration;

use axum::Json;
use axum::extract::{Query, State};
use careezy_common::{Error, Result};
use careezy_config::JobSearchConfig;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::error::ApiError;
use crate::state::SharedState;

const DEFAULT_QUERY: &str = "internship";
const DEFAULT_LOCATION: &str = "US";

/// Adzuna job search client.
pub struct JobSearchClient {
    client: Client,
    base_url: String,
    country: String,
    app_id: String,
    app_key: String,
    results_per_page: u32,
}

impl JobSearchClient {
    /// Build from config. Returns `None` when the credentials are not set.
    pub fn from_config(config: &JobSearchConfig) -> Result<Option<Self>> {
        let Some((app_id, app_key)) = config.credentials() else {
            return Ok(None);
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to build job search client: {e}")))?;

        Ok(Some(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            country: config.country.clone(),
            app_id: app_id.to_string(),
            app_key: app_key.to_string(),
            results_per_page: config.results_per_page,
        }))
    }

    /// First page of listings matching `query` near `location`.
    #[instrument(skip(self))]
    pub async fn search(&self, query: Option<&str>, location: Option<&str>) -> Result<Vec<Value>> {
        let what = non_blank(query).unwrap_or(DEFAULT_QUERY);
        let location = non_blank(location).unwrap_or(DEFAULT_LOCATION);
        let url = format!("{}/{}/search/1", self.base_url, self.country);
        let results_per_page = self.results_per_page.to_string();

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .query(&[
                ("app_id", self.app_id.as_str()),
                ("app_key", self.app_key.as_str()),
                ("what", what),
                ("where", location),
                ("results_per_page", results_per_page.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("job search request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream(format!(
                "job search error: status={status}, body={body}"
            )));
        }

        let mut payload: Value = response
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("failed to parse job search response: {e}")))?;

        let results = match payload.get_mut("results").map(Value::take) {
            Some(Value::Array(results)) => results,
            _ => Vec::new(),
        };
        info!(count = results.len(), "job search completed");
        Ok(results)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub l: Option<String>,
}

/// GET /api/internships/search?q=&l=
pub async fn search(
    State(state): State<SharedState>,
    Query(params): Query<SearchParams>,
) -> std::result::Result<Json<Value>, ApiError> {
    const OPERATION: &str = "Failed to search internships";

    let client = state.job_search.as_ref().ok_or_else(|| {
        warn!("job search requested but Adzuna credentials are not configured");
        ApiError::from_error(
            Error::Config("job search is not configured".to_string()),
            OPERATION,
        )
    })?;

    let results = client
        .search(params.q.as_deref(), params.l.as_deref())
        .await
        .map_err(ApiError::context(OPERATION))?;

    Ok(Json(serde_json::json!({ "results": results })))
}
