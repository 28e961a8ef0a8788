//! Signed Claims Codec
//! Mission: Encode and verify JWT claims with a symmetric secret

use crate::auth::models::Role;
use anyhow::{Context, Result};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Expected decode failures. Signature verification happens before any
/// claim is inspected, so a payload behind a bad signature is never read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    Malformed,
    SignatureInvalid,
    Expired,
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::Malformed => write!(f, "token is malformed"),
            TokenError::SignatureInvalid => write!(f, "token signature is invalid"),
            TokenError::Expired => write!(f, "token is expired"),
        }
    }
}

impl std::error::Error for TokenError {}

/// Claims of a short-lived access token. Not individually revocable;
/// expires naturally within the access TTL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessClaims {
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Claims of a renewable refresh token. `jti` is the revocation identifier,
/// minted once per token and never reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshClaims {
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Closed tagged claims variant, built exactly once at decode time.
/// Downstream code matches on the kind instead of re-validating fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenClaims {
    Access(AccessClaims),
    Refresh(RefreshClaims),
}

impl TokenClaims {
    pub fn email(&self) -> &str {
        match self {
            TokenClaims::Access(c) => &c.email,
            TokenClaims::Refresh(c) => &c.email,
        }
    }

    pub fn role(&self) -> &Role {
        match self {
            TokenClaims::Access(c) => &c.role,
            TokenClaims::Refresh(c) => &c.role,
        }
    }

    pub fn issued_at(&self) -> i64 {
        match self {
            TokenClaims::Access(c) => c.iat,
            TokenClaims::Refresh(c) => c.iat,
        }
    }

    pub fn expires_at(&self) -> i64 {
        match self {
            TokenClaims::Access(c) => c.exp,
            TokenClaims::Refresh(c) => c.exp,
        }
    }
}

/// Wire payload. Access and refresh tokens share one shape; the presence of
/// `jti` is what makes a token a refresh token.
#[derive(Debug, Serialize, Deserialize)]
struct WireClaims {
    email: String,
    role: Role,
    iat: i64,
    exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    jti: Option<String>,
}

/// Codec for signing and verifying token claims.
///
/// The secret and algorithm are fixed per deployment; rotating the secret
/// invalidates every outstanding token.
pub struct ClaimsCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
}

impl ClaimsCodec {
    /// Create a codec from a shared secret and an HMAC algorithm.
    /// Algorithm choice is validated at configuration time.
    pub fn new(secret: &str, algorithm: Algorithm) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            algorithm,
        }
    }

    /// Sign claims into a self-contained token string.
    pub fn encode(&self, claims: &TokenClaims) -> Result<String> {
        let wire = match claims {
            TokenClaims::Access(c) => WireClaims {
                email: c.email.clone(),
                role: c.role.clone(),
                iat: c.iat,
                exp: c.exp,
                jti: None,
            },
            TokenClaims::Refresh(c) => WireClaims {
                email: c.email.clone(),
                role: c.role.clone(),
                iat: c.iat,
                exp: c.exp,
                jti: Some(c.jti.clone()),
            },
        };

        encode(&Header::new(self.algorithm), &wire, &self.encoding)
            .context("Failed to sign token claims")
    }

    /// Verify a token and return its claims.
    ///
    /// Expiry is checked with zero leeway: `now > exp` is `Expired`.
    pub fn decode(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        let data =
            decode::<WireClaims>(token, &self.decoding, &validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => TokenError::Expired,
                    ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                        TokenError::SignatureInvalid
                    }
                    _ => TokenError::Malformed,
                }
            })?;

        let wire = data.claims;
        Ok(match wire.jti {
            Some(jti) => TokenClaims::Refresh(RefreshClaims {
                email: wire.email,
                role: wire.role,
                iat: wire.iat,
                exp: wire.exp,
                jti,
            }),
            None => TokenClaims::Access(AccessClaims {
                email: wire.email,
                role: wire.role,
                iat: wire.iat,
                exp: wire.exp,
            }),
        })
    }
}
