use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use careezy_security::{AuthenticatedUser, bearer_token};
use tracing::debug;

use crate::error::ApiError;
use crate::state::SharedState;

/// Extractor that requires a valid `Authorization: Bearer <token>` header.
pub struct AuthUser(pub AuthenticatedUser);

impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                debug!("request without authorization header");
                ApiError::unauthorized("No authorization header")
            })?;

        let token =
            bearer_token(header).ok_or_else(|| ApiError::unauthorized("No token provided"))?;

        let user = state
            .verifier
            .verify(token)
            .await
            .map_err(ApiError::context("Authentication failed"))?;

        Ok(AuthUser(user))
    }
}
