use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use careezy_agents::{LlmProvider, LlmRequest, LlmResponse};
use careezy_common::{CoachMessage, CoachSession, Error, Result, SessionId, UserId};
use careezy_config::AppConfig;
use careezy_db::{CoachRepository, SqliteCoachRepository};
use careezy_gateway::GatewayServer;
use careezy_gateway::state::AppState;
use careezy_security::{AuthenticatedUser, TokenVerifier};
use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ALICE: &str = "alice-token";
const BOB: &str = "bob-token";

/// Accepts two fixed tokens.
struct StaticVerifier;

#[async_trait]
impl TokenVerifier for StaticVerifier {
    async fn verify(&self, token: &str) -> Result<AuthenticatedUser> {
        let id = match token {
            ALICE => "user-alice",
            BOB => "user-bob",
            _ => return Err(Error::Unauthorized("Invalid token".to_string())),
        };
        Ok(AuthenticatedUser {
            id: UserId::new(id),
            email: None,
        })
    }
}

struct EchoProvider {
    fail: AtomicBool,
}

#[async_trait]
impl LlmProvider for EchoProvider {
    fn provider_id(&self) -> &str {
        "echo"
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Agent("upstream said: internal key sk-abc".to_string()));
        }
        let last = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(LlmResponse {
            text: format!("Coach says: {last}"),
            model: request.model.clone(),
            usage: None,
            stop_reason: None,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

/// Delegates to SQLite but refuses to store turns.
struct ReadOnlyRepo(SqliteCoachRepository);

#[async_trait]
impl CoachRepository for ReadOnlyRepo {
    async fn create_session(
        &self,
        user_id: &UserId,
        title: &str,
        session_type: &str,
    ) -> Result<CoachSession> {
        self.0.create_session(user_id, title, session_type).await
    }

    async fn get_session(
        &self,
        user_id: &UserId,
        session_id: &SessionId,
    ) -> Result<Option<CoachSession>> {
        self.0.get_session(user_id, session_id).await
    }

    async fn list_sessions(&self, user_id: &UserId) -> Result<Vec<CoachSession>> {
        self.0.list_sessions(user_id).await
    }

    async fn find_active_session(&self, user_id: &UserId) -> Result<Option<CoachSession>> {
        self.0.find_active_session(user_id).await
    }

    async fn archive_session(&self, user_id: &UserId, session_id: &SessionId) -> Result<bool> {
        self.0.archive_session(user_id, session_id).await
    }

    async fn list_messages(&self, session_id: &SessionId) -> Result<Vec<CoachMessage>> {
        self.0.list_messages(session_id).await
    }

    async fn recent_messages(
        &self,
        session_id: &SessionId,
        limit: usize,
    ) -> Result<Vec<CoachMessage>> {
        self.0.recent_messages(session_id, limit).await
    }

    async fn record_turn(&self, _: &SessionId, _: &str, _: &str) -> Result<u64> {
        Err(Error::Database(
            "failed to commit turn: attempt to write a readonly database".to_string(),
        ))
    }

    async fn update_summary(&self, session_id: &SessionId, summary: &str) -> Result<bool> {
        self.0.update_summary(session_id, summary).await
    }
}

struct TestApp {
    base: String,
    client: reqwest::Client,
    provider: Arc<EchoProvider>,
}

impl TestApp {
    async fn spawn(config: AppConfig) -> Self {
        Self::spawn_with_repo(config, Arc::new(SqliteCoachRepository::in_memory().unwrap())).await
    }

    async fn spawn_with_repo(config: AppConfig, repo: Arc<dyn CoachRepository>) -> Self {
        let provider = Arc::new(EchoProvider {
            fail: AtomicBool::new(false),
        });
        let state = AppState::new(config, repo, provider.clone(), Arc::new(StaticVerifier)).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(
            GatewayServer::new(Arc::new(state)).serve(listener, std::future::pending()),
        );

        Self {
            base: format!("http://{addr}"),
            client: reqwest::Client::new(),
            provider,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn post(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    async fn get(&self, path: &str, token: &str) -> (StatusCode, Value) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap_or(Value::Null))
    }
}

#[tokio::test]
async fn health_needs_no_auth() {
    let app = TestApp::spawn(AppConfig::default()).await;
    let resp = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn coach_routes_require_a_valid_token() {
    let app = TestApp::spawn(AppConfig::default()).await;

    let resp = app
        .client
        .get(app.url("/api/coach/sessions"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "No authorization header");

    let (status, body) = app.get("/api/coach/sessions", "forged").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token");
}

#[tokio::test]
async fn session_lifecycle() {
    let app = TestApp::spawn(AppConfig::default()).await;

    let (status, session) = app
        .post("/api/coach/sessions", ALICE, json!({ "session_type": "interview" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(session["title"], "Career Coach Chat");
    assert_eq!(session["session_type"], "interview");
    assert_eq!(session["message_count"], 0);
    assert_eq!(session["is_active"], true);
    let id = session["id"].as_str().unwrap().to_string();

    let (status, reply) = app
        .post(
            &format!("/api/coach/sessions/{id}/messages"),
            ALICE,
            json!({ "message": "How do I negotiate an offer?" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["response"], "Coach says: How do I negotiate an offer?");
    assert_eq!(reply["session_id"], id.as_str());

    let (status, detail) = app.get(&format!("/api/coach/sessions/{id}"), ALICE).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["message_count"], 2);
    let messages = detail["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[1]["role"], "assistant");

    let (status, list) = app.get("/api/coach/sessions", ALICE).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let resp = app
        .client
        .delete(app.url(&format!("/api/coach/sessions/{id}")))
        .bearer_auth(ALICE)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Session archived successfully");

    let (_, detail) = app.get(&format!("/api/coach/sessions/{id}"), ALICE).await;
    assert_eq!(detail["is_active"], false);
    assert_eq!(detail["messages"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn chat_without_session_reuses_active_one() {
    let app = TestApp::spawn(AppConfig::default()).await;

    let (status, first) = app
        .post("/api/coach/chat", ALICE, json!({ "message": "hi" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, second) = app
        .post("/api/coach/chat", ALICE, json!({ "message": "still me" }))
        .await;
    assert_eq!(first["session_id"], second["session_id"]);

    let (_, list) = app.get("/api/coach/sessions", ALICE).await;
    let sessions = list.as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["message_count"], 4);
}

#[tokio::test]
async fn other_users_sessions_are_not_found() {
    let app = TestApp::spawn(AppConfig::default()).await;
    let (_, session) = app.post("/api/coach/sessions", ALICE, json!({})).await;
    let id = session["id"].as_str().unwrap();

    let (status, body) = app.get(&format!("/api/coach/sessions/{id}"), BOB).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Session not found");

    let (status, _) = app
        .post(
            &format!("/api/coach/sessions/{id}/messages"),
            BOB,
            json!({ "message": "hello" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, list) = app.get("/api/coach/sessions", BOB).await;
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn empty_message_is_a_bad_request() {
    let app = TestApp::spawn(AppConfig::default()).await;
    let (status, body) = app
        .post("/api/coach/chat", ALICE, json!({ "message": "  " }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Message is required");

    let (_, list) = app.get("/api/coach/sessions", ALICE).await;
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn completion_failure_is_generic_500() {
    let app = TestApp::spawn(AppConfig::default()).await;
    app.provider.fail.store(true, Ordering::SeqCst);

    let (status, body) = app
        .post("/api/coach/chat", ALICE, json!({ "message": "hello" }))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Failed to get chat response" }));

    let (_, list) = app.get("/api/coach/sessions", ALICE).await;
    assert_eq!(list[0]["message_count"], 0);
}

#[tokio::test]
async fn storage_failure_after_completion_is_generic_500() {
    let repo = Arc::new(ReadOnlyRepo(SqliteCoachRepository::in_memory().unwrap()));
    let app = TestApp::spawn_with_repo(AppConfig::default(), repo).await;

    let (status, body) = app
        .post("/api/coach/chat", ALICE, json!({ "message": "hello" }))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Failed to get chat response" }));
    assert!(!body.to_string().contains("readonly"));

    let (_, list) = app.get("/api/coach/sessions", ALICE).await;
    let id = list[0]["id"].as_str().unwrap().to_string();
    assert_eq!(list[0]["message_count"], 0);
    let (_, detail) = app.get(&format!("/api/coach/sessions/{id}"), ALICE).await;
    assert!(detail["messages"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn ai_routes_are_rate_limited() {
    let mut config = AppConfig::default();
    config.gateway.ai_rate_limit.burst_size = 2;

    let app = TestApp::spawn(config).await;
    for _ in 0..2 {
        let (status, _) = app
            .post("/api/coach/chat", ALICE, json!({ "message": "hi" }))
            .await;
        assert_eq!(status, StatusCode::OK);
    }
    let resp = app
        .client
        .post(app.url("/api/coach/chat"))
        .bearer_auth(ALICE)
        .json(&json!({ "message": "one more" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

    // Non-AI routes keep their own budget.
    let (status, _) = app.get("/api/coach/sessions", ALICE).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn cors_preflight_allows_frontend_origin() {
    let app = TestApp::spawn(AppConfig::default()).await;
    let resp = app
        .client
        .request(reqwest::Method::OPTIONS, app.url("/api/coach/chat"))
        .header("Origin", "http://localhost:3000")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "authorization,content-type")
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    assert_eq!(
        resp.headers().get("access-control-allow-origin").unwrap(),
        "http://localhost:3000"
    );
    assert_eq!(
        resp.headers().get("access-control-allow-credentials").unwrap(),
        "true"
    );
}

#[tokio::test]
async fn internship_search_proxies_adzuna() {
    let adzuna = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/us/search/1"))
        .and(query_param("app_id", "adz-id"))
        .and(query_param("app_key", "adz-key"))
        .and(query_param("what", "internship"))
        .and(query_param("where", "Austin"))
        .and(query_param("results_per_page", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 1,
            "results": [{ "title": "Software Engineering Intern", "company": { "display_name": "Acme" } }]
        })))
        .expect(1)
        .mount(&adzuna)
        .await;

    let mut config = AppConfig::default();
    config.job_search.app_id = Some("adz-id".to_string());
    config.job_search.api_key = Some("adz-key".to_string());
    config.job_search.base_url = adzuna.uri();

    let app = TestApp::spawn(config).await;
    let resp = app
        .client
        .get(app.url("/api/internships/search?l=%20Austin%20"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["results"][0]["title"], "Software Engineering Intern");
}

#[tokio::test]
async fn internship_search_without_credentials_fails_generically() {
    let app = TestApp::spawn(AppConfig::default()).await;
    let resp = app
        .client
        .get(app.url("/api/internships/search?q=data"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Failed to search internships");
}

#[tokio::test]
async fn checkout_session_is_created_for_user() {
    let stripe = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .and(header("authorization", "Bearer sk_test_careezy"))
        .and(body_string_contains("mode=subscription"))
        .and(body_string_contains("price_pro_monthly"))
        .and(body_string_contains("user-alice"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cs_test_123",
            "object": "checkout.session",
            "url": "https://checkout.stripe.com/c/pay/cs_test_123"
        })))
        .expect(1)
        .mount(&stripe)
        .await;

    let mut config = AppConfig::default();
    config.billing.secret_key = Some("sk_test_careezy".to_string());
    config.billing.base_url = stripe.uri();

    let app = TestApp::spawn(config).await;
    let (status, body) = app
        .post(
            "/api/payments/create-checkout-session",
            ALICE,
            json!({ "priceId": "price_pro_monthly" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sessionId"], "cs_test_123");
    assert_eq!(body["url"], "https://checkout.stripe.com/c/pay/cs_test_123");

    let (status, body) = app
        .post("/api/payments/create-checkout-session", ALICE, json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Price ID is required");
}

#[tokio::test]
async fn resume_suggestions_and_match() {
    let app = TestApp::spawn(AppConfig::default()).await;

    let (status, body) = app
        .post(
            "/api/resumes/suggestions",
            ALICE,
            json!({ "resumeContent": "Led a robotics team" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["suggestions"].as_str().unwrap().ends_with("Led a robotics team"));

    let (status, body) = app
        .post(
            "/api/resumes/match",
            ALICE,
            json!({ "jobDescription": "Hardware intern", "resumeContent": "Led a robotics team" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["reasoning"].as_str().unwrap().contains("Job: Hardware intern"));

    let (status, body) = app.post("/api/resumes/suggestions", ALICE, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Resume content is required");
}
