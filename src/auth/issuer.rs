//! Token Issuer
//! Mission: Mint access and refresh token pairs

use crate::auth::claims::{AccessClaims, ClaimsCodec, RefreshClaims, TokenClaims};
use crate::auth::models::Principal;
use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Freshly minted token pair returned from login.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Mints tokens for authenticated principals.
///
/// Issuance is pure construction: it never consults the revocation store,
/// since a freshly minted token cannot already be revoked.
pub struct TokenIssuer {
    codec: Arc<ClaimsCodec>,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl TokenIssuer {
    pub fn new(codec: Arc<ClaimsCodec>, access_ttl_minutes: i64, refresh_ttl_days: i64) -> Self {
        Self {
            codec,
            access_ttl_secs: access_ttl_minutes * 60,
            refresh_ttl_secs: refresh_ttl_days * 24 * 3600,
        }
    }

    /// Mint a short-lived access token. `exp - iat` equals the access TTL.
    pub fn issue_access(&self, principal: &Principal) -> Result<String> {
        let iat = Utc::now().timestamp();
        let claims = TokenClaims::Access(AccessClaims {
            email: principal.email.clone(),
            role: principal.role.clone(),
            iat,
            exp: iat + self.access_ttl_secs,
        });
        self.codec.encode(&claims)
    }

    /// Mint a renewable refresh token with a fresh revocation identifier.
    /// Returns the token and its `jti`.
    pub fn issue_refresh(&self, principal: &Principal) -> Result<(String, String)> {
        let iat = Utc::now().timestamp();
        let jti = Uuid::new_v4().to_string();
        let claims = TokenClaims::Refresh(RefreshClaims {
            email: principal.email.clone(),
            role: principal.role.clone(),
            iat,
            exp: iat + self.refresh_ttl_secs,
            jti: jti.clone(),
        });

        debug!(email = %principal.email, jti = %jti, "issuing refresh token");

        let token = self.codec.encode(&claims)?;
        Ok((token, jti))
    }

    /// Mint the login pair: one access token, one refresh token.
    pub fn issue_pair(&self, principal: &Principal) -> Result<TokenPair> {
        let access_token = self.issue_access(principal)?;
        let (refresh_token, _jti) = self.issue_refresh(principal)?;
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }
}
