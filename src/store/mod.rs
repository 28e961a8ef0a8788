//! Shared TTL key-value store backing rate limiting and token revocation.
//!
//! Two backends behind one enum: a single-instance in-process map, or Redis
//! for multi-instance deployments. Callers only use the handful of
//! single-key operations the auth flows need (INCR, EXPIRE, TTL, SETEX,
//! EXISTS); each is atomic at single-key granularity on both backends.

mod memory;

pub use memory::MemoryStore;

use deadpool_redis::{Config as RedisConfig, Pool, Runtime};
use redis::AsyncCommands;
use std::time::Duration;
use tracing::debug;

/// The backing store was unreachable or refused the operation.
///
/// This is the only expected store failure; callers decide per call site
/// whether it fails open (rate limiting, configurable) or closed
/// (revocation checks, always).
#[derive(Debug)]
pub enum StoreError {
    Unavailable(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Unavailable(detail) => write!(f, "TTL store unavailable: {detail}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// TTL key-value store, memory-backed or Redis-backed.
#[derive(Clone)]
pub enum TtlStore {
    Memory(MemoryStore),
    Redis(Pool),
}

impl TtlStore {
    /// Single-instance in-process backend.
    pub fn memory() -> Self {
        TtlStore::Memory(MemoryStore::new())
    }

    /// Redis backend from a connection URL.
    pub fn redis(url: &str) -> Result<Self, StoreError> {
        let pool = RedisConfig::from_url(url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(TtlStore::Redis(pool))
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            TtlStore::Memory(_) => "memory",
            TtlStore::Redis(_) => "redis",
        }
    }

    /// Atomically increment the counter for `key`, returning the
    /// post-increment value. A key with a lapsed TTL counts from zero.
    pub async fn increment(&self, key: &str) -> Result<i64, StoreError> {
        match self {
            TtlStore::Memory(store) => Ok(store.increment(key)),
            TtlStore::Redis(pool) => {
                let mut conn = connection(pool).await?;
                conn.incr(key, 1)
                    .await
                    .map_err(|e| StoreError::Unavailable(e.to_string()))
            }
        }
    }

    /// Set the remaining lifetime of an existing key.
    pub async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        match self {
            TtlStore::Memory(store) => {
                store.expire(key, ttl);
                Ok(())
            }
            TtlStore::Redis(pool) => {
                let mut conn = connection(pool).await?;
                conn.expire::<_, bool>(key, ttl.as_secs() as i64)
                    .await
                    .map_err(|e| StoreError::Unavailable(e.to_string()))?;
                Ok(())
            }
        }
    }

    /// Remaining lifetime of `key`, `None` if absent or without expiry.
    pub async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        match self {
            TtlStore::Memory(store) => Ok(store.ttl(key)),
            TtlStore::Redis(pool) => {
                let mut conn = connection(pool).await?;
                let secs: i64 = conn
                    .ttl(key)
                    .await
                    .map_err(|e| StoreError::Unavailable(e.to_string()))?;
                // -2 = no key, -1 = no expiry
                if secs < 0 {
                    Ok(None)
                } else {
                    Ok(Some(Duration::from_secs(secs as u64)))
                }
            }
        }
    }

    /// Insert a marker that the store discards after `ttl`. Overwrites any
    /// previous entry for the key.
    pub async fn set_ex(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        match self {
            TtlStore::Memory(store) => {
                store.set_ex(key, ttl);
                Ok(())
            }
            TtlStore::Redis(pool) => {
                let mut conn = connection(pool).await?;
                conn.set_ex::<_, _, ()>(key, "revoked", ttl.as_secs())
                    .await
                    .map_err(|e| StoreError::Unavailable(e.to_string()))?;
                debug!(key = %key, ttl_secs = ttl.as_secs(), "marker set");
                Ok(())
            }
        }
    }

    /// Point-in-time membership check.
    pub async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        match self {
            TtlStore::Memory(store) => Ok(store.exists(key)),
            TtlStore::Redis(pool) => {
                let mut conn = connection(pool).await?;
                conn.exists(key)
                    .await
                    .map_err(|e| StoreError::Unavailable(e.to_string()))
            }
        }
    }
}

async fn connection(pool: &Pool) -> Result<deadpool_redis::Connection, StoreError> {
    pool.get()
        .await
        .map_err(|e| StoreError::Unavailable(e.to_string()))
}
