//! End-to-end tests driving the real router: registration, login, protected
//! endpoints, refresh, logout, revocation, and rate limiting.

use authgate_backend::api;
use authgate_backend::auth::{
    api::AuthState, AccessGate, ClaimsCodec, RevocationStore, TokenIssuer, UserStore,
};
use authgate_backend::middleware::{RateLimitConfig, RateLimiter};
use authgate_backend::store::TtlStore;
use axum::body::Body;
use axum::extract::connect_info::ConnectInfo;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use jsonwebtoken::Algorithm;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tower::ServiceExt;

const SECRET: &str = "integration-secret-key";

/// Build a router over a temp SQLite database and a memory TTL store.
/// The temp file must outlive the router.
fn test_router(rate_limit: RateLimitConfig) -> (Router, NamedTempFile) {
    let temp = NamedTempFile::new().unwrap();
    let users = Arc::new(UserStore::new(temp.path().to_str().unwrap()).unwrap());

    let codec = Arc::new(ClaimsCodec::new(SECRET, Algorithm::HS256));
    let issuer = Arc::new(TokenIssuer::new(codec.clone(), 15, 7));

    let store = TtlStore::memory();
    let revocations = Arc::new(RevocationStore::new(store.clone()));
    let gate = Arc::new(AccessGate::new(codec.clone(), revocations.clone()));
    let limiter = Arc::new(RateLimiter::new(store, rate_limit));

    let state = AuthState {
        users,
        codec,
        issuer,
        gate,
        revocations,
        limiter,
    };
    (api::build_router(state), temp)
}

fn roomy_limits() -> RateLimitConfig {
    RateLimitConfig {
        limit: 100,
        window: Duration::from_secs(60),
        fail_open: true,
    }
}

fn client_addr() -> ConnectInfo<SocketAddr> {
    ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000)))
}

async fn respond(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}

async fn post_json(app: &Router, path: &str, body: Value) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    request.extensions_mut().insert(client_addr());
    respond(app, request).await
}

async fn get_bearer(app: &Router, path: &str, token: &str) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .method("GET")
        .uri(path)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    request.extensions_mut().insert(client_addr());
    respond(app, request).await
}

async fn get_plain(app: &Router, path: &str) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .method("GET")
        .uri(path)
        .body(Body::empty())
        .unwrap();
    request.extensions_mut().insert(client_addr());
    respond(app, request).await
}

#[tokio::test]
async fn test_full_token_lifecycle() {
    let (app, _db) = test_router(roomy_limits());

    // Register
    let (status, body) = post_json(
        &app,
        "/auth/register",
        json!({ "email": "a@x.com", "password": "Abc12345!" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "user");
    assert!(!body["user_id"].as_str().unwrap().is_empty());

    // Login
    let (status, body) = post_json(
        &app,
        "/auth/login",
        json!({ "email": "a@x.com", "password": "Abc12345!" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    let access_token = body["access_token"].as_str().unwrap().to_string();
    let refresh_token = body["refresh_token"].as_str().unwrap().to_string();
    assert!(!access_token.is_empty());
    assert!(!refresh_token.is_empty());

    // Protected user endpoint
    let (status, body) = get_bearer(&app, "/users/user-data", &access_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "a@x.com");

    // Profile exposes the token's timestamps
    let (status, body) = get_bearer(&app, "/users/profile", &access_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["expires_at"].as_i64().unwrap() - body["issued_at"].as_i64().unwrap(), 15 * 60);

    // Refresh yields a new access token (issued in a later second).
    tokio::time::sleep(Duration::from_millis(1100)).await;
    let (status, body) = post_json(
        &app,
        "/auth/refresh",
        json!({ "refresh_token": refresh_token }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let refreshed = body["access_token"].as_str().unwrap().to_string();
    assert_ne!(refreshed, access_token);
    assert_eq!(body["email"], "a@x.com");

    // Logout revokes the refresh token
    let (status, body) = post_json(
        &app,
        "/auth/logout",
        json!({ "refresh_token": refresh_token }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body["message"].as_str().unwrap().is_empty());

    // The same refresh token is now rejected
    let (status, _) = post_json(
        &app,
        "/auth/refresh",
        json!({ "refresh_token": refresh_token }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // But the still-valid access token keeps working until natural expiry.
    let (status, _) = get_bearer(&app, "/users/user-data", &refreshed).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_admin_role_enforcement() {
    let (app, _db) = test_router(roomy_limits());

    // Seeded admin account
    let (status, body) = post_json(
        &app,
        "/auth/login",
        json!({ "email": "admin@authgate.local", "password": "Admin123!" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let admin_token = body["access_token"].as_str().unwrap().to_string();

    let (status, body) = get_bearer(&app, "/admin/dashboard", &admin_token).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("admin@authgate.local"));

    // Regular users are forbidden on admin-only endpoints
    post_json(
        &app,
        "/auth/register",
        json!({ "email": "b@x.com", "password": "Abc12345!" }),
    )
    .await;
    let (_, body) = post_json(
        &app,
        "/auth/login",
        json!({ "email": "b@x.com", "password": "Abc12345!" }),
    )
    .await;
    let user_token = body["access_token"].as_str().unwrap().to_string();

    let (status, _) = get_bearer(&app, "/admin/dashboard", &user_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Mixed-role admin endpoint admits regular users
    let (status, body) = get_bearer(&app, "/admin/user-data", &user_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "user");
}

#[tokio::test]
async fn test_unauthenticated_requests_rejected() {
    let (app, _db) = test_router(roomy_limits());

    let (status, _) = get_plain(&app, "/users/user-data").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = get_bearer(&app, "/users/user-data", "garbage.token.here").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_not_accepted_as_bearer() {
    let (app, _db) = test_router(roomy_limits());

    post_json(
        &app,
        "/auth/register",
        json!({ "email": "c@x.com", "password": "Abc12345!" }),
    )
    .await;
    let (_, body) = post_json(
        &app,
        "/auth/login",
        json!({ "email": "c@x.com", "password": "Abc12345!" }),
    )
    .await;
    let refresh_token = body["refresh_token"].as_str().unwrap().to_string();
    let access_token = body["access_token"].as_str().unwrap().to_string();

    // Refresh token at a protected endpoint: kind mismatch
    let (status, _) = get_bearer(&app, "/users/user-data", &refresh_token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Access token at the refresh endpoint: kind mismatch
    let (status, _) = post_json(
        &app,
        "/auth/refresh",
        json!({ "refresh_token": access_token }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Access token at logout: structurally valid but not a refresh token
    let (status, _) = post_json(&app, "/auth/logout", json!({ "refresh_token": access_token }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_registration_validation() {
    let (app, _db) = test_router(roomy_limits());

    // Duplicate email
    let (status, _) = post_json(
        &app,
        "/auth/register",
        json!({ "email": "dup@x.com", "password": "Abc12345!" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = post_json(
        &app,
        "/auth/register",
        json!({ "email": "dup@x.com", "password": "Abc12345!" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Invalid email and weak password
    let (status, _) = post_json(
        &app,
        "/auth/register",
        json!({ "email": "not-an-email", "password": "Abc12345!" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(
        &app,
        "/auth/register",
        json!({ "email": "weak@x.com", "password": "password" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Wrong password on login
    let (status, _) = post_json(
        &app,
        "/auth/login",
        json!({ "email": "dup@x.com", "password": "Wrong1234!" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_rate_limited() {
    let (app, _db) = test_router(RateLimitConfig {
        limit: 3,
        window: Duration::from_secs(60),
        fail_open: true,
    });

    for _ in 0..3 {
        let (status, _) = post_json(
            &app,
            "/auth/login",
            json!({ "email": "nobody@x.com", "password": "Wrong1234!" }),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    // Fourth attempt within the window is limited, with a Retry-After header.
    let mut request = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "email": "nobody@x.com", "password": "Wrong1234!" }).to_string(),
        ))
        .unwrap();
    request.extensions_mut().insert(client_addr());

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = response
        .headers()
        .get("Retry-After")
        .unwrap()
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after >= 1);
    assert!(retry_after <= 60);
}

#[tokio::test]
async fn test_health_is_public() {
    let (app, _db) = test_router(roomy_limits());

    let (status, body) = get_plain(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
