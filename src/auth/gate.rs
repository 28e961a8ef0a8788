//! Access Gate
//! Mission: Validate and authorize bearer tokens per request

use crate::auth::claims::{ClaimsCodec, RefreshClaims, TokenClaims, TokenError};
use crate::auth::models::{Principal, Role};
use crate::auth::revocation::RevocationStore;
use crate::store::StoreError;
use std::sync::Arc;
use tracing::warn;

/// Outcome of a successful authorization: the verified principal plus the
/// token's timestamps, exposed to the downstream handler.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub principal: Principal,
    pub issued_at: i64,
    pub expires_at: i64,
}

/// Typed rejections from the gate.
#[derive(Debug)]
pub enum GateError {
    /// Decode failed: malformed, forged, or expired.
    Token(TokenError),
    /// A refresh token was presented where an access token is expected,
    /// or vice versa. The two are never interchangeable.
    KindMismatch,
    /// The refresh token's identifier is in the revocation store.
    Revoked,
    /// The principal's role is outside the endpoint's allowed set.
    Forbidden,
    /// The revocation store was unreachable. Callers must fail closed.
    Store(StoreError),
}

impl std::fmt::Display for GateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateError::Token(e) => write!(f, "{e}"),
            GateError::KindMismatch => write!(f, "token kind mismatch"),
            GateError::Revoked => write!(f, "token revoked"),
            GateError::Forbidden => write!(f, "role not permitted"),
            GateError::Store(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for GateError {}

/// Explicit per-request guard composed in front of protected handlers.
///
/// Handlers pass the raw bearer string and their allowed-role set and get
/// back either a verified [`Authenticated`] or a typed rejection; nothing
/// is smuggled through request extensions.
pub struct AccessGate {
    codec: Arc<ClaimsCodec>,
    revocations: Arc<RevocationStore>,
}

impl AccessGate {
    pub fn new(codec: Arc<ClaimsCodec>, revocations: Arc<RevocationStore>) -> Self {
        Self { codec, revocations }
    }

    /// Authorize an access token against an allowed-role set.
    ///
    /// An empty `allowed` set means "any authenticated principal". Access
    /// tokens carry no revocation identifier, so no store call is made:
    /// this path is pure local computation.
    pub fn authorize(&self, bearer: &str, allowed: &[Role]) -> Result<Authenticated, GateError> {
        let claims = self.codec.decode(bearer).map_err(GateError::Token)?;

        let access = match claims {
            TokenClaims::Access(c) => c,
            TokenClaims::Refresh(_) => return Err(GateError::KindMismatch),
        };

        if !allowed.is_empty() && !allowed.contains(&access.role) {
            return Err(GateError::Forbidden);
        }

        Ok(Authenticated {
            principal: Principal {
                email: access.email,
                role: access.role,
            },
            issued_at: access.iat,
            expires_at: access.exp,
        })
    }

    /// Authorize a refresh token, including the revocation check.
    ///
    /// A store failure here is reported as [`GateError::Store`]; the caller
    /// must reject the request rather than assume "not revoked".
    pub async fn authorize_refresh(&self, token: &str) -> Result<RefreshClaims, GateError> {
        let claims = self.codec.decode(token).map_err(GateError::Token)?;

        let refresh = match claims {
            TokenClaims::Refresh(c) => c,
            TokenClaims::Access(_) => return Err(GateError::KindMismatch),
        };

        let revoked = self
            .revocations
            .is_revoked(&refresh.jti)
            .await
            .map_err(|e| {
                warn!(jti = %refresh.jti, error = %e, "revocation check unavailable, rejecting");
                GateError::Store(e)
            })?;

        if revoked {
            return Err(GateError::Revoked);
        }

        Ok(refresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::issuer::TokenIssuer;
    use crate::store::TtlStore;
    use chrono::Utc;
    use jsonwebtoken::Algorithm;

    fn fixture() -> (AccessGate, TokenIssuer, Arc<RevocationStore>) {
        let codec = Arc::new(ClaimsCodec::new("test-secret-key-12345", Algorithm::HS256));
        let revocations = Arc::new(RevocationStore::new(TtlStore::memory()));
        let gate = AccessGate::new(codec.clone(), revocations.clone());
        let issuer = TokenIssuer::new(codec, 15, 7);
        (gate, issuer, revocations)
    }

    fn principal(role: Role) -> Principal {
        Principal {
            email: "a@x.com".to_string(),
            role,
        }
    }

    #[test]
    fn test_valid_access_token_accepted() {
        let (gate, issuer, _) = fixture();
        let token = issuer.issue_access(&principal(Role::User)).unwrap();

        let auth = gate.authorize(&token, &[Role::User, Role::Admin]).unwrap();
        assert_eq!(auth.principal.email, "a@x.com");
        assert_eq!(auth.principal.role, Role::User);
        assert!(auth.expires_at > auth.issued_at);
    }

    #[test]
    fn test_empty_allow_list_admits_any_principal() {
        let (gate, issuer, _) = fixture();
        let token = issuer.issue_access(&principal(Role::User)).unwrap();

        assert!(gate.authorize(&token, &[]).is_ok());
    }

    #[test]
    fn test_role_outside_allowed_set_is_forbidden() {
        let (gate, issuer, _) = fixture();
        let token = issuer.issue_access(&principal(Role::User)).unwrap();

        let err = gate.authorize(&token, &[Role::Admin]).unwrap_err();
        assert!(matches!(err, GateError::Forbidden));
    }

    #[test]
    fn test_refresh_token_rejected_at_access_endpoint() {
        let (gate, issuer, _) = fixture();
        let (refresh, _) = issuer.issue_refresh(&principal(Role::User)).unwrap();

        let err = gate.authorize(&refresh, &[]).unwrap_err();
        assert!(matches!(err, GateError::KindMismatch));
    }

    #[test]
    fn test_forged_token_rejected() {
        let (gate, _, _) = fixture();
        let other =
            TokenIssuer::new(Arc::new(ClaimsCodec::new("other", Algorithm::HS256)), 15, 7);
        let token = other.issue_access(&principal(Role::Admin)).unwrap();

        let err = gate.authorize(&token, &[]).unwrap_err();
        assert!(matches!(
            err,
            GateError::Token(TokenError::SignatureInvalid)
        ));
    }

    #[tokio::test]
    async fn test_active_refresh_token_accepted() {
        let (gate, issuer, _) = fixture();
        let (token, jti) = issuer.issue_refresh(&principal(Role::User)).unwrap();

        let claims = gate.authorize_refresh(&token).await.unwrap();
        assert_eq!(claims.jti, jti);
    }

    #[tokio::test]
    async fn test_revoked_refresh_token_rejected() {
        let (gate, issuer, revocations) = fixture();
        let (token, jti) = issuer.issue_refresh(&principal(Role::User)).unwrap();

        revocations
            .revoke(&jti, Utc::now().timestamp() + 3600)
            .await
            .unwrap();

        let err = gate.authorize_refresh(&token).await.unwrap_err();
        assert!(matches!(err, GateError::Revoked));
    }

    #[tokio::test]
    async fn test_access_token_rejected_at_refresh_endpoint() {
        let (gate, issuer, _) = fixture();
        let token = issuer.issue_access(&principal(Role::User)).unwrap();

        let err = gate.authorize_refresh(&token).await.unwrap_err();
        assert!(matches!(err, GateError::KindMismatch));
    }
}
