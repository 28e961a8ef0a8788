//! Admin endpoints.

use crate::api::users::{UserDataResponse, UserSummary};
use crate::auth::api::{require_role, AuthApiError, AuthState};
use crate::auth::models::Role;
use axum::{extract::State, Json};
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub message: String,
}

/// GET /admin/dashboard - admin-only
pub async fn dashboard(
    State(state): State<AuthState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
) -> Result<Json<DashboardResponse>, AuthApiError> {
    let auth = require_role(&state, bearer.as_ref(), &[Role::Admin])?;

    Ok(Json(DashboardResponse {
        message: format!(
            "Welcome, admin {} with role {}",
            auth.principal.email,
            auth.principal.role.as_str()
        ),
    }))
}

/// GET /admin/user-data - accessible by users or admins
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
