use std::time::Duration;

use async_trait::async_trait;
use careezy_common::{Error, Result, UserId};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Identity resolved from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: UserId,
    pub email: Option<String>,
}

/// Resolves an opaque bearer token to a user.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Returns [`Error::Unauthorized`] for missing, malformed or rejected tokens.
    async fn verify(&self, token: &str) -> Result<AuthenticatedUser>;
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Verifies tokens against a Supabase project's `/auth/v1/user` endpoint.
pub struct SupabaseTokenVerifier {
    client: Client,
    auth_url: String,
    service_key: String,
}

#[derive(Deserialize)]
struct SupabaseUser {
    id: Option<String>,
    email: Option<String>,
}

impl SupabaseTokenVerifier {
    pub fn new(auth_url: &str, service_key: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(VERIFY_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("failed to build auth client: {e}")))?;
        Ok(Self {
            client,
            auth_url: auth_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
        })
    }
}

#[async_trait]
impl TokenVerifier for SupabaseTokenVerifier {
    async fn verify(&self, token: &str) -> Result<AuthenticatedUser> {
        if token.trim().is_empty() {
            return Err(Error::Unauthorized("No token provided".to_string()));
        }

        let response = self
            .client
            .get(format!("{}/auth/v1/user", self.auth_url))
            .header("apikey", &self.service_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("auth backend unreachable: {e}")))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            debug!(%status, "token rejected by auth backend");
            return Err(Error::Unauthorized("Invalid token".to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "auth backend returned an error");
            return Err(Error::Upstream(format!(
                "auth backend error: status={status}, body={body}"
            )));
        }

        let user: SupabaseUser = response
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("failed to parse auth response: {e}")))?;

        match user.id.filter(|id| !id.is_empty()) {
            Some(id) => Ok(AuthenticatedUser {
                id: UserId::new(id),
                email: user.email,
            }),
            None => Err(Error::Unauthorized("Invalid token".to_string())),
        }
    }
}
