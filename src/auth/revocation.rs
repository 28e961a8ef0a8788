//! Refresh Token Revocation
//! Mission: Track revoked refresh tokens until their natural expiry

use crate::store::{StoreError, TtlStore};
use chrono::Utc;
use std::time::Duration;
use tracing::debug;

/// TTL-backed set of revoked refresh-token identifiers.
///
/// Entries live under `bl:<jti>` for exactly the token's remaining lifetime
/// at revocation time, so the store never accumulates entries for tokens
/// that have already expired on their own.
pub struct RevocationStore {
    store: TtlStore,
}

impl RevocationStore {
    pub fn new(store: TtlStore) -> Self {
        Self { store }
    }

    fn key(jti: &str) -> String {
        format!("bl:{jti}")
    }

    /// Revoke a refresh token until `expires_at` (unix seconds).
    ///
    /// A token whose lifetime has already lapsed is a no-op; there is
    /// nothing left to revoke. Re-revoking an identifier overwrites the
    /// entry with the same deadline, so the call is idempotent.
    pub async fn revoke(&self, jti: &str, expires_at: i64) -> Result<(), StoreError> {
        let remaining = expires_at - Utc::now().timestamp();
        if remaining <= 0 {
            debug!(jti = %jti, "token already expired, revocation skipped");
            return Ok(());
        }

        self.store
            .set_ex(&Self::key(jti), Duration::from_secs(remaining as u64))
            .await
    }

    /// Point-in-time membership check. Absence means "not revoked".
    pub async fn is_revoked(&self, jti: &str) -> Result<bool, StoreError> {
        self.store.exists(&Self::key(jti)).await
    }
}
