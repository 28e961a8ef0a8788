//! AuthGate API server entrypoint.

use anyhow::{Context, Result};
use authgate_backend::api;
use authgate_backend::auth::{
    api::AuthState, AccessGate, ClaimsCodec, RevocationStore, TokenIssuer, UserStore,
};
use authgate_backend::config::AppConfig;
use authgate_backend::middleware::RateLimiter;
use authgate_backend::store::TtlStore;
use dotenv::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv();
    init_tracing();

    let config = AppConfig::from_env()?;

    let store = match config.redis_url.as_deref() {
        Some(url) => TtlStore::redis(url)?,
        None => TtlStore::memory(),
    };
    info!("🗄️  TTL store backend: {}", store.backend_name());

    // The memory backend only drops expired entries lazily on access;
    // sweep it periodically so abandoned keys don't pile up.
    if let TtlStore::Memory(memory) = &store {
        let memory = memory.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                memory.cleanup();
            }
        });
    }

    let users = Arc::new(UserStore::new(&config.auth_db_path)?);
    info!("🔐 User store initialized at: {}", config.auth_db_path);

    let codec = Arc::new(ClaimsCodec::new(&config.jwt.secret, config.jwt.algorithm));
    let issuer = Arc::new(TokenIssuer::new(
        codec.clone(),
        config.jwt.access_ttl_minutes,
        config.jwt.refresh_ttl_days,
    ));
    let revocations = Arc::new(RevocationStore::new(store.clone()));
    let gate = Arc::new(AccessGate::new(codec.clone(), revocations.clone()));
    let limiter = Arc::new(RateLimiter::new(store.clone(), config.rate_limit.clone()));

    let state = AuthState {
        users,
        codec,
        issuer,
        gate,
        revocations,
        limiter,
    };
    let app = api::build_router(state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("🎯 API server listening on {}", config.bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}

/// Initialize tracing with env-filter overrides.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "authgate_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
