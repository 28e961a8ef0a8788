//! Router assembly.

use crate::api::{admin, users};
use crate::auth::api::{self as auth_api, AuthState};
use crate::middleware::request_logging;
use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

/// Health check endpoint (liveness only)
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Create the full API router.
pub fn build_router(state: AuthState) -> Router {
    let auth_routes = Router::new()
        .route("/auth/register", post(auth_api::register))
        .route("/auth/login", post(auth_api::login))
        .route("/auth/refresh", post(auth_api::refresh))
        .route("/auth/logout", post(auth_api::logout));

    let user_routes = Router::new()
        .route("/users/user-data", get(users::user_data))
        .route("/users/profile", get(users::profile));

    let admin_routes = Router::new()
        .route("/admin/dashboard", get(admin::dashboard))
        .route("/admin/user-data", get(admin::user_data));

    Router::new()
        .route("/health", get(health_check))
        .merge(auth_routes)
        .merge(user_routes)
        .merge(admin_routes)
        .layer(middleware::from_fn(request_logging))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
