//! User endpoints: role-scoped data for any authenticated principal.

use crate::auth::api::{require_role, AuthApiError, AuthState};
use crate::auth::models::Role;
use axum::{extract::State, Json};
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct UserDataResponse {
    pub user: UserSummary,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub email: String,
    pub role: Role,
    pub issued_at: i64,
    pub expires_at: i64,
}

/// GET /users/user-data - email and role of the authenticated user
pub async fn user_data(
    State(state): State<AuthState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
) -> Result<Json<UserDataResponse>, AuthApiError> {
    let auth = require_role(&state, bearer.as_ref(), &[Role::User, Role::Admin])?;

    Ok(Json(UserDataResponse {
        user: UserSummary {
            email: auth.principal.email,
            role: auth.principal.role,
        },
        message: "User data retrieved successfully".to_string(),
    }))
}

/// GET /users/profile - profile details including token metadata
pub async fn profile(
    State(state): State<AuthState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
) -> Result<Json<ProfileResponse>, AuthApiError> {
    let auth = require_role(&state, bearer.as_ref(), &[Role::User, Role::Admin])?;

    Ok(Json(ProfileResponse {
        email: auth.principal.email,
        role: auth.principal.role,
        issued_at: auth.issued_at,
        expires_at: auth.expires_at,
    }))
}
