//! End-to-end tests for the authentication routes over an in-memory store

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower::ServiceExt;

use wordcloud_auth::{
    create_routes, AuthConfig, AuthError, AuthService, HashCost, Mailer, MemoryStore,
    ResetTokenMode, Store,
};

#[derive(Default)]
struct CapturingMailer {
    reset_tokens: Mutex<Vec<String>>,
}

#[async_trait]
impl Mailer for CapturingMailer {
    async fn send_welcome(&self, _email: &str, _name: &str) -> Result<(), AuthError> {
        Ok(())
    }

    async fn send_password_reset(&self, _email: &str, token: &str) -> Result<(), AuthError> {
        self.reset_tokens.lock().await.push(token.to_string());
        Ok(())
    }
}

struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send_welcome(&self, _email: &str, _name: &str) -> Result<(), AuthError> {
        Err(AuthError::Mail("smtp unavailable".to_string()))
    }

    async fn send_password_reset(&self, _email: &str, _token: &str) -> Result<(), AuthError> {
        Err(AuthError::Mail("smtp unavailable".to_string()))
    }
}

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    mailer: Arc<CapturingMailer>,
}

fn test_config() -> AuthConfig {
    let cheap = HashCost {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    };
    AuthConfig {
        jwt_secret: "integration-secret-at-least-32-chars!".to_string(),
        jwt_issuer: "wordcloud".to_string(),
        session_token_expiration: 86400,
        reset_token_expiration: 3600,
        password_cost: cheap,
        reset_token_cost: cheap,
        reset_token_mode: ResetTokenMode::EmailDigest,
    }
}

fn test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(CapturingMailer::default());
    let service = AuthService::new(test_config(), store.clone(), mailer.clone()).unwrap();

    TestApp {
        router: create_routes(Arc::new(service)),
        store,
        mailer,
    }
}

async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn registration() -> Value {
    json!({
        "firstName": "ada",
        "lastName": "lovelace",
        "email": "a@b.com",
        "password": "Abc12345!",
        "nick": "abc123"
    })
}

async fn register_and_login(app: &TestApp) -> String {
    let (status, _) = send(&app.router, post_json("/auth/register", registration())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app.router,
        post_json(
            "/auth/login",
            json!({ "email": "a@b.com", "password": "Abc12345!" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

async fn wait_for_reset_token(app: &TestApp) -> String {
    for _ in 0..100 {
        if let Some(token) = app.mailer.reset_tokens.lock().await.last().cloned() {
            return token;
        }
        tokio::task::yield_now().await;
    }
    panic!("no reset mail was sent");
}

#[tokio::test]
async fn register_then_duplicate() {
    let app = test_app();

    let (status, body) = send(&app.router, post_json("/auth/register", registration())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "User created");
    assert!(body["id"].as_i64().is_some());

    let (status, body) = send(&app.router, post_json("/auth/register", registration())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "duplicate_credential");
}

#[tokio::test]
async fn register_rejects_weak_password() {
    let app = test_app();
    let mut req = registration();
    req["password"] = json!("password");

    let (status, body) = send(&app.router, post_json("/auth/register", req)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn login_and_access_profile() {
    let app = test_app();
    let token = register_and_login(&app).await;

    let (status, body) = send(&app.router, get("/profile", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["nick"], "abc123");
    assert!(body["user"].get("passwordHash").is_none());
}

#[tokio::test]
async fn login_failure_is_uniform() {
    let app = test_app();
    register_and_login(&app).await;

    let (wrong_status, wrong) = send(
        &app.router,
        post_json(
            "/auth/login",
            json!({ "email": "a@b.com", "password": "Nope1234!" }),
        ),
    )
    .await;
    let (unknown_status, unknown) = send(
        &app.router,
        post_json(
            "/auth/login",
            json!({ "email": "x@y.com", "password": "Abc12345!" }),
        ),
    )
    .await;

    assert_eq!(wrong_status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong_status, unknown_status);
    assert_eq!(wrong, unknown);
}

#[tokio::test]
async fn protected_routes_require_valid_token() {
    let app = test_app();

    let (status, _) = send(&app.router, get("/profile", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app.router, get("/profile", Some("not.a.token"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn forgot_password_does_not_enumerate() {
    let app = test_app();
    register_and_login(&app).await;

    let (known_status, known) = send(
        &app.router,
        post_json("/auth/forgot-password", json!({ "email": "a@b.com" })),
    )
    .await;
    let (unknown_status, unknown) = send(
        &app.router,
        post_json("/auth/forgot-password", json!({ "email": "nobody@b.com" })),
    )
    .await;

    assert_eq!(known_status, StatusCode::OK);
    assert_eq!(known_status, unknown_status);
    assert_eq!(known, json!({ "message": "sent" }));
    assert_eq!(known, unknown);
}

#[tokio::test]
async fn reset_password_consumes_token_once() {
    let app = test_app();
    register_and_login(&app).await;

    send(
        &app.router,
        post_json("/auth/forgot-password", json!({ "email": "a@b.com" })),
    )
    .await;
    let token = wait_for_reset_token(&app).await;
    let encoded: String = url::form_urlencoded::byte_serialize(token.as_bytes()).collect();
    let uri = format!("/auth/reset-password?token={}", encoded);

    let (status, body) = send(&app.router, get(&uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&app.router, get(&uri, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_reset_token");

    assert!(app.store.find_reset_token(&token).await.unwrap().is_none());
}

#[tokio::test]
async fn search_requires_single_valid_parameter() {
    let app = test_app();
    let token = register_and_login(&app).await;

    let (status, body) = send(&app.router, get("/user?nick=abc", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"][0]["nick"], "abc123");

    let (status, _) = send(&app.router, get("/user?nick=abc&email=a@b.com", Some(&token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app.router, get("/user?password=abc", Some(&token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn mail_outage_does_not_fail_requests() {
    let store = Arc::new(MemoryStore::new());
    let service = AuthService::new(test_config(), store.clone(), Arc::new(FailingMailer)).unwrap();
    let router = create_routes(Arc::new(service));

    let (status, body) = send(&router, post_json("/auth/register", registration())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["id"].as_i64().is_some());

    let (status, body) = send(
        &router,
        post_json("/auth/forgot-password", json!({ "email": "a@b.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "sent" }));
    assert_eq!(store.reset_token_count("a@b.com").await, 1);
}
