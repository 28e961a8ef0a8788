//! Authentication Models
//! Mission: Define user, principal, and API payload data structures

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User roles for RBAC
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "admin")]
    Admin, // Full access, including /admin endpoints
    #[serde(rename = "user")]
    User, // Authenticated access to /users endpoints
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "user" => Some(Role::User),
            _ => None,
        }
    }
}

/// Authenticated identity derived from verified token claims.
/// Never persisted; rebuilt per request by the access gate.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Principal {
    pub email: String,
    pub role: Role,
}

/// Stored user account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // bcrypt hash - never serialize
    pub role: Role,
    pub created_at: String,
}

/// Registration request body
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

/// Registration response
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: String,
    pub role: Role,
}

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response: full token pair
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub role: Role,
    pub email: String,
}

/// Refresh request body
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Refresh response: fresh access token only, no rotation
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: String,
    pub role: Role,
    pub email: String,
}

/// Logout request body
#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

/// Logout response
#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub message: String,
}

/// Minimal structural email check: one '@', non-empty local part, dotted
/// domain, no whitespace.
pub fn email_is_valid(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        _ => false,
    }
}

/// Password strength rules for registration. Returns the first violated
/// rule as a client-facing message, or `None` if the password is acceptable.
pub fn password_issue(password: &str) -> Option<&'static str> {
    const SPECIAL: &str = "!@#$%^&*(),.?\":{}|<>";

    if password.len() < 8 {
        return Some("Password must be at least 8 characters");
    }
    if password.len() > 128 {
        return Some("Password must be at most 128 characters");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Some("Password must contain at least one uppercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Some("Password must contain at least one lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Some("Password must contain at least one number");
    }
    if !password.chars().any(|c| SPECIAL.contains(c)) {
        return Some("Password must contain at least one special character");
    }
    None
}
