//! Fixed-window rate limiting.
//!
//! Counts requests per (endpoint, client, optional identity) key in the
//! shared TTL store. The window is fixed, not sliding: the expiry is set
//! once on the first increment and later increments never extend it. A
//! client can therefore burst close to 2x the limit across a window
//! boundary; that is accepted fixed-window behavior, not a defect.

use crate::store::{StoreError, TtlStore};
use std::net::IpAddr;
use std::time::Duration;
use tracing::warn;

/// Configuration for rate limiting.
#[derive(Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub limit: u32,
    /// Window duration.
    pub window: Duration,
    /// Policy when the backing store is unreachable: allow (fail open,
    /// preserves availability) or reject (fail closed, preserves the
    /// limiting guarantee).
    pub fail_open: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: 5,
            window: Duration::from_secs(60),
            fail_open: true,
        }
    }
}

/// Point-in-time decision for one request.
#[derive(Debug, Clone)]
pub struct RateDecision {
    pub allowed: bool,
    /// Remaining window when denied, clamped to at least one second.
    pub retry_after: Duration,
}

/// Rejection surfaced to the HTTP layer.
#[derive(Debug)]
pub enum RateLimitError {
    Limited { retry_after: Duration },
    Unavailable,
}

/// Fixed-window request counter over the shared TTL store.
pub struct RateLimiter {
    store: TtlStore,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(store: TtlStore, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    /// Counter key for a request: `rl:<endpoint>:<ip>`, or
    /// `rl:<endpoint>:user:<identity>:ip:<ip>` when an identity is supplied.
    fn key(endpoint: &str, ip: IpAddr, identity: Option<&str>) -> String {
        match identity {
            Some(id) => format!("rl:{endpoint}:user:{id}:ip:{ip}"),
            None => format!("rl:{endpoint}:{ip}"),
        }
    }

    /// Count this request and decide whether it is allowed.
    ///
    /// Increment first; only the increment that brings the counter to 1
    /// sets the window expiry. The increment is atomic per key on both
    /// store backends, so concurrent callers neither lose counts nor
    /// re-arm the window.
    pub async fn check(
        &self,
        endpoint: &str,
        ip: IpAddr,
        identity: Option<&str>,
    ) -> Result<RateDecision, StoreError> {
        let key = Self::key(endpoint, ip, identity);

        let count = self.store.increment(&key).await?;
        if count == 1 {
            self.store.expire(&key, self.config.window).await?;
        }

        if count > self.config.limit as i64 {
            let remaining = self.store.ttl(&key).await?.unwrap_or(Duration::ZERO);
            let retry_after = remaining.max(Duration::from_secs(1));
            return Ok(RateDecision {
                allowed: false,
                retry_after,
            });
        }

        Ok(RateDecision {
            allowed: true,
            retry_after: Duration::ZERO,
        })
    }

    /// Check and apply the configured store-failure policy.
    pub async fn guard(
        &self,
        endpoint: &str,
        ip: IpAddr,
        identity: Option<&str>,
    ) -> Result<(), RateLimitError> {
        match self.check(endpoint, ip, identity).await {
            Ok(decision) if decision.allowed => Ok(()),
            Ok(decision) => {
                warn!(
                    endpoint = %endpoint,
                    ip = %ip,
                    retry_after_secs = decision.retry_after.as_secs(),
                    "Rate limit exceeded"
                );
                Err(RateLimitError::Limited {
                    retry_after: decision.retry_after,
                })
            }
            Err(e) if self.config.fail_open => {
                warn!(endpoint = %endpoint, error = %e, "rate-limit store unavailable, allowing request");
                Ok(())
            }
            Err(e) => {
                warn!(endpoint = %endpoint, error = %e, "rate-limit store unavailable, rejecting request");
                Err(RateLimitError::Unavailable)
            }
        }
    }
}
