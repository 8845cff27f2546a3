use std::time::Duration;

use axum::Json;
use axum::extract::State;
use careezy_common::{Error, Result, UserId};
use careezy_config::BillingConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::SharedState;

const STRIPE_VERSION: &str = "2024-12-18.acacia";

/// Hosted checkout session returned to the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub session_id: String,
    pub url: Option<String>,
}

#[derive(Deserialize)]
struct StripeCheckoutSession {
    id: String,
    url: Option<String>,
}

/// Stripe Checkout client for subscription sign-up.
pub struct BillingClient {
    client: Client,
    base_url: String,
    secret_key: String,
    frontend_url: String,
}

impl BillingClient {
    /// Build from config. Returns `None` when no secret key is set.
    pub fn from_config(config: &BillingConfig, frontend_url: &str) -> Result<Option<Self>> {
        let Some(secret_key) = config.api_key() else {
            return Ok(None);
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to build billing client: {e}")))?;

        Ok(Some(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
            frontend_url: frontend_url.trim_end_matches('/').to_string(),
        }))
    }

    #[instrument(skip(self), fields(user = %user_id))]
    pub async fn create_checkout_session(
        &self,
        user_id: &UserId,
        price_id: &str,
    ) -> Result<CheckoutSession> {
        let success_url = format!(
            "{}/dashboard?session_id={{CHECKOUT_SESSION_ID}}",
            self.frontend_url
        );
        let cancel_url = format!("{}/pricing", self.frontend_url);

        let form = [
            ("mode", "subscription"),
            ("payment_method_types[0]", "card"),
            ("line_items[0][price]", price_id),
            ("line_items[0][quantity]", "1"),
            ("success_url", success_url.as_str()),
            ("cancel_url", cancel_url.as_str()),
            ("metadata[userId]", user_id.as_str()),
        ];

        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.base_url))
            .bearer_auth(&self.secret_key)
            .header("Stripe-Version", STRIPE_VERSION)
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("billing request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream(format!(
                "billing error: status={status}, body={body}"
            )));
        }

        let session: StripeCheckoutSession = response
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("failed to parse checkout session: {e}")))?;

        info!(checkout_session = %session.id, "checkout session created");
        Ok(CheckoutSession {
            session_id: session.id,
            url: session.url,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default)]
    pub price_id: String,
}

/// POST /api/payments/create-checkout-session
pub async fn create_checkout_session(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    Json(body): Json<CheckoutRequest>,
) -> std::result::Result<Json<CheckoutSession>, ApiError> {
    const OPERATION: &str = "Failed to create checkout session";

    let price_id = body.price_id.trim();
    if price_id.is_empty() {
        return Err(ApiError::bad_request("Price ID is required"));
    }

    let client = state.billing.as_ref().ok_or_else(|| {
        warn!("checkout requested but Stripe is not configured");
        ApiError::from_error(
            Error::Config("billing is not configured".to_string()),
            OPERATION,
        )
    })?;

    let session = client
        .create_checkout_session(&user.id, price_id)
        .await
        .map_err(ApiError::context(OPERATION))?;
    Ok(Json(session))
}
