use std::time::Duration;

use axum::Router;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use careezy_common::{Error, Result};
use careezy_config::RateLimitConfig;
use tower::ServiceBuilder;
use tower_governor::GovernorLayer;
use tower_governor::governor::GovernorConfigBuilder;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::state::SharedState;
use crate::{api, billing, internships, resumes};

/// Build the main application router with all routes.
///
/// Must be served with `into_make_service_with_connect_info::<SocketAddr>()`
/// so the rate limiters can key on the peer address.
pub fn build_router(state: SharedState) -> Result<Router> {
    let gateway = &state.config.gateway;

    // Per-IP rate limits from config (default: global 100 per 15 min, AI 20 per hour).
    let governor_layer = |rl: &RateLimitConfig, name: &str| -> Result<_> {
        let governor_conf = GovernorConfigBuilder::default()
            .per_second(rl.replenish_secs)
            .burst_size(rl.burst_size)
            .finish()
            .ok_or_else(|| Error::Config(format!("invalid {name} rate limit: {rl:?}")))?;
        let governor_limiter = governor_conf.limiter().clone();

        // Spawn a background task to clean up rate-limiter state for inactive IPs.
        tokio::spawn(async move {
            let interval = Duration::from_secs(60);
            loop {
                tokio::time::sleep(interval).await;
                governor_limiter.retain_recent();
            }
        });

        Ok(GovernorLayer::new(governor_conf))
    };
    let global_limit = governor_layer(&gateway.rate_limit, "global")?;
    let ai_limit = governor_layer(&gateway.ai_rate_limit, "ai")?;
    let cors = cors_layer(&gateway.frontend_url)?;

    // Routes that call the completion API get the stricter per-IP budget.
    let ai_routes = Router::new()
        .route("/api/coach/sessions/{id}/messages", post(api::send_message))
        .route("/api/coach/chat", post(api::chat))
        .route("/api/resumes/suggestions", post(resumes::suggestions))
        .route("/api/resumes/match", post(resumes::match_reasoning))
        .layer(ai_limit);

    let router = Router::new()
        .route("/health", get(health))
        .route(
            "/api/coach/sessions",
            get(api::list_sessions).post(api::create_session),
        )
        .route(
            "/api/coach/sessions/{id}",
            get(api::get_session).delete(api::archive_session),
        )
        .route("/api/internships/search", get(internships::search))
        .route(
            "/api/payments/create-checkout-session",
            post(billing::create_checkout_session),
        )
        .merge(ai_routes)
        .with_state(state)
        .layer(global_limit)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(SetResponseHeaderLayer::if_not_present(
                    X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    X_FRAME_OPTIONS,
                    HeaderValue::from_static("SAMEORIGIN"),
                )),
        );

    Ok(router)
}

fn cors_layer(frontend_url: &str) -> Result<CorsLayer> {
    let origin = HeaderValue::from_str(frontend_url.trim_end_matches('/'))
        .map_err(|e| Error::Config(format!("invalid frontend_url {frontend_url:?}: {e}")))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true))
}

async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
    }))
}
