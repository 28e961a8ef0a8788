//! Application configuration.
//!
//! Every deployment knob is read once at startup into [`AppConfig`] and
//! passed by handle into component constructors. `.env` files are honored
//! via dotenv before this module reads the environment.

use crate::middleware::rate_limit::RateLimitConfig;
use anyhow::{bail, Context, Result};
use jsonwebtoken::Algorithm;
use std::env;
use std::time::Duration;

/// Token signing and lifetime settings.
#[derive(Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub algorithm: Algorithm,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
}

/// Full application configuration.
#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub auth_db_path: String,
    /// Redis connection URL; absent means the in-process store backend.
    pub redis_url: Option<String>,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        if secret.trim().is_empty() {
            bail!("JWT_SECRET must not be empty");
        }

        let algorithm = parse_algorithm(
            &env::var("JWT_ALGORITHM").unwrap_or_else(|_| "HS256".to_string()),
        )?;

        let access_ttl_minutes = env_i64("ACCESS_TOKEN_EXPIRE_MINUTES", 15);
        let refresh_ttl_days = env_i64("REFRESH_TOKEN_EXPIRE_DAYS", 7);
        if access_ttl_minutes <= 0 || refresh_ttl_days <= 0 {
            bail!("Token TTLs must be positive");
        }

        let rate_limit = RateLimitConfig {
            limit: env_i64("RATE_LIMIT_COUNT", 5).max(1) as u32,
            window: Duration::from_secs(env_i64("RATE_LIMIT_WINDOW_SECS", 60).max(1) as u64),
            fail_open: env_bool("RATE_LIMIT_FAIL_OPEN", true),
        };

        Ok(Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            auth_db_path: env::var("AUTH_DB_PATH").unwrap_or_else(|_| "authgate.db".to_string()),
            redis_url: env::var("REDIS_URL").ok().filter(|v| !v.trim().is_empty()),
            jwt: JwtConfig {
                secret,
                algorithm,
                access_ttl_minutes,
                refresh_ttl_days,
            },
            rate_limit,
        })
    }
}

/// Only symmetric HMAC algorithms are supported; the secret is shared
/// across the deployment and rotating it invalidates outstanding tokens.
fn parse_algorithm(name: &str) -> Result<Algorithm> {
    match name {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        other => bail!("unsupported signing algorithm: {other} (expected HS256/HS384/HS512)"),
    }
}

fn env_i64(name: &str, default: i64) -> i64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(default)
}

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "on" | "ON"))
        .unwrap_or(default)
}
