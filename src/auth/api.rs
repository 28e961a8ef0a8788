//! Authentication API Endpoints
//! Mission: Registration, login, refresh, and logout handlers

use crate::auth::{
    claims::{ClaimsCodec, TokenClaims},
    gate::{AccessGate, Authenticated, GateError},
    issuer::TokenIssuer,
    models::{
        email_is_valid, password_issue, LoginRequest, LoginResponse, LogoutRequest,
        LogoutResponse, Principal, RefreshRequest, RefreshResponse, RegisterRequest,
        RegisterResponse, Role,
    },
    revocation::RevocationStore,
    user_store::UserStore,
};
use crate::middleware::rate_limit::{RateLimitError, RateLimiter};
use axum::{
    extract::{ConnectInfo, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Shared auth state, constructed once at startup and passed by handle.
#[derive(Clone)]
pub struct AuthState {
    pub users: Arc<UserStore>,
    pub codec: Arc<ClaimsCodec>,
    pub issuer: Arc<TokenIssuer>,
    pub gate: Arc<AccessGate>,
    pub revocations: Arc<RevocationStore>,
    pub limiter: Arc<RateLimiter>,
}

/// Register endpoint - POST /auth/register (rate limited per IP)
pub async fn register(
    State(state): State<AuthState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AuthApiError> {
    state
        .limiter
        .guard("/auth/register", addr.ip(), None)
        .await?;

    if !email_is_valid(&payload.email) {
        return Err(AuthApiError::InvalidEmail);
    }
    if let Some(issue) = password_issue(&payload.password) {
        return Err(AuthApiError::WeakPassword(issue));
    }

    let existing = state
        .users
        .get_user_by_email(&payload.email)
        .map_err(internal_error)?;
    if existing.is_some() {
        return Err(AuthApiError::DuplicateEmail);
    }

    let user = state
        .users
        .create_user(&payload.email, &payload.password, Role::User)
        .map_err(internal_error)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: user.id.to_string(),
            role: user.role,
        }),
    ))
}

/// Login endpoint - POST /auth/login (rate limited per IP + email)
pub async fn login(
    State(state): State<AuthState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthApiError> {
    state
        .limiter
        .guard("/auth/login", addr.ip(), Some(&payload.email))
        .await?;

    info!("🔐 Login attempt: {}", payload.email);

    let valid = state
        .users
        .verify_password(&payload.email, &payload.password)
        .map_err(internal_error)?;

    if !valid {
        warn!("❌ Failed login attempt: {}", payload.email);
        return Err(AuthApiError::InvalidCredentials);
    }

    let user = state
        .users
        .get_user_by_email(&payload.email)
        .map_err(internal_error)?
        .ok_or(AuthApiError::InvalidCredentials)?;

    let principal = Principal {
        email: user.email.clone(),
        role: user.role.clone(),
    };
    let pair = state.issuer.issue_pair(&principal).map_err(internal_error)?;

    info!("✅ Login successful: {} ({})", user.email, user.role.as_str());

    Ok(Json(LoginResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        token_type: "bearer".to_string(),
        role: user.role,
        email: user.email,
    }))
}

/// Refresh endpoint - POST /auth/refresh
///
/// Accepts only refresh-kind tokens, checks revocation (failing closed on
/// store errors), and mints a fresh access token. No refresh rotation.
pub async fn refresh(
    State(state): State<AuthState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, AuthApiError> {
    let claims = state.gate.authorize_refresh(&payload.refresh_token).await?;

    let principal = Principal {
        email: claims.email,
        role: claims.role,
    };
    let access_token = state
        .issuer
        .issue_access(&principal)
        .map_err(internal_error)?;

    Ok(Json(RefreshResponse {
        access_token,
        token_type: "bearer".to_string(),
        role: principal.role,
        email: principal.email,
    }))
}

/// Logout endpoint - POST /auth/logout
///
/// Registers the refresh token's identifier in the revocation store for
/// the token's remaining lifetime.
pub async fn logout(
    State(state): State<AuthState>,
    Json(payload): Json<LogoutRequest>,
) -> Result<Json<LogoutResponse>, AuthApiError> {
    let claims = state
        .codec
        .decode(&payload.refresh_token)
        .map_err(|_| AuthApiError::Unauthorized)?;

    let refresh = match claims {
        TokenClaims::Refresh(c) => c,
        // Structurally valid token, but not a refresh token.
        TokenClaims::Access(_) => return Err(AuthApiError::MalformedRefreshToken),
    };

    state
        .revocations
        .revoke(&refresh.jti, refresh.exp)
        .await
        .map_err(|e| {
            warn!(jti = %refresh.jti, error = %e, "failed to record revocation");
            AuthApiError::StoreUnavailable
        })?;

    info!("🚪 Refresh token revoked: {}", refresh.email);

    Ok(Json(LogoutResponse {
        message: "Refresh token revoked successfully".to_string(),
    }))
}

/// Authorize a bearer header against an allowed-role set. The shared
/// front half of every protected handler.
pub fn require_role(
    state: &AuthState,
    bearer: Option<&TypedHeader<Authorization<Bearer>>>,
    allowed: &[Role],
) -> Result<Authenticated, AuthApiError> {
    let bearer = bearer.ok_or(AuthApiError::MissingToken)?;
    Ok(state.gate.authorize(bearer.0.token(), allowed)?)
}

fn internal_error(err: anyhow::Error) -> AuthApiError {
    warn!("internal auth error: {err:#}");
    AuthApiError::Internal
}

/// Auth API errors
#[derive(Debug)]
pub enum AuthApiError {
    InvalidCredentials,
    MissingToken,
    Unauthorized,
    TokenRevoked,
    MalformedRefreshToken,
    Forbidden,
    InvalidEmail,
    WeakPassword(&'static str),
    DuplicateEmail,
    RateLimited { retry_after: Duration },
    StoreUnavailable,
    Internal,
}

impl From<RateLimitError> for AuthApiError {
    fn from(err: RateLimitError) -> Self {
        match err {
            RateLimitError::Limited { retry_after } => AuthApiError::RateLimited { retry_after },
            RateLimitError::Unavailable => AuthApiError::StoreUnavailable,
        }
    }
}

impl From<GateError> for AuthApiError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Token(_) | GateError::KindMismatch => AuthApiError::Unauthorized,
            GateError::Revoked => AuthApiError::TokenRevoked,
            GateError::Forbidden => AuthApiError::Forbidden,
            // Revocation state unknown: fail closed, never "not revoked".
            GateError::Store(_) => AuthApiError::Unauthorized,
        }
    }
}

impl IntoResponse for AuthApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthApiError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Invalid credentials"),
            AuthApiError::MissingToken => {
                (StatusCode::UNAUTHORIZED, "Missing authorization token")
            }
            AuthApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Invalid or expired token"),
            AuthApiError::TokenRevoked => (StatusCode::UNAUTHORIZED, "Refresh token revoked"),
            AuthApiError::MalformedRefreshToken => {
                (StatusCode::BAD_REQUEST, "Malformed refresh token")
            }
            AuthApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                "You do not have permission to access this resource",
            ),
            AuthApiError::InvalidEmail => (StatusCode::BAD_REQUEST, "Invalid email address"),
            AuthApiError::WeakPassword(issue) => (StatusCode::BAD_REQUEST, issue),
            AuthApiError::DuplicateEmail => (
                StatusCode::BAD_REQUEST,
                "User with this email already exists",
            ),
            AuthApiError::RateLimited { retry_after } => {
                let body = serde_json::json!({
                    "error": "rate_limit_exceeded",
                    "message": "Too many requests. Please try again later.",
                    "retry_after_seconds": retry_after.as_secs(),
                });
                return (
                    StatusCode::TOO_MANY_REQUESTS,
                    [("Retry-After", retry_after.as_secs().to_string())],
                    Json(body),
                )
                    .into_response();
            }
            AuthApiError::StoreUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Backing store unavailable",
            ),
            AuthApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        };

        (status, message).into_response()
    }
}
