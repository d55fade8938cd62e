//! # dashboard-rs
//!
//! Multi-user personal dashboard: weather, top headlines and exchange rates behind a login.
//!
//! ## Architecture
//!
//! - **Credentials**: Argon2-hashed passwords in SQLite (or an append-only file)
//! - **Sessions**: Signed, expiring tokens carried in an `HttpOnly` cookie
//! - **Locale**: English/German message catalog, chosen per session
//! - **Gateway**: Weather, news and currency lookups with a bounded timeout
//! - **HTTP**: Axum router with request IDs, tracing and graceful shutdown

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used)]

mod config;
mod credentials;
mod gateway;
mod http;
mod locale;
mod session;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::serve;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, Cli};
use crate::credentials::open_store;
use crate::gateway::Gateway;
use crate::http::{router, AppState};
use crate::session::SessionManager;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging().context("failed to initialize logging")?;

    let cli = Cli::parse();
    let config = AppConfig::from_cli(cli).context("failed to load configuration")?;
    info!(
        bind = %config.bind,
        users_db = %config.users_db.display(),
        store = %config.store,
        session_lifetime = %humantime::format_duration(config.session_lifetime),
        upstream_timeout = %humantime::format_duration(config.upstream_timeout),
        "configuration loaded"
    );
    if config.uses_default_secret() {
        warn!("SECRET_KEY is not set; sessions are signed with the built-in development key");
    }

    let backend = config.store;
    let users_db = config.users_db.clone();
    let store = tokio::task::spawn_blocking(move || open_store(backend, &users_db))
        .await
        .context("user store task failed")?
        .with_context(|| format!("failed to open user store {}", config.users_db.display()))?;

    let gateway = Gateway::new(
        config.weather,
        config.news,
        config.currency,
        config.upstream_timeout,
    )
    .context("failed to build upstream HTTP client")?;

    let state = AppState {
        store: Arc::from(store),
        sessions: SessionManager::new(&config.secret_key, config.session_lifetime),
        gateway,
    };

    let app = router(state);
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    if config.bind.ip().is_loopback() {
        warn!(
            bind = %config.bind,
            "binding to loopback; use --bind 0.0.0.0:5000 for LAN access"
        );
    }

    let shutdown = tokio::signal::ctrl_c();
    info!(bind = %config.bind, "dashboard-rs listening");

    serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = shutdown.await;
        info!("shutting down gracefully");
    })
    .await
    .context("server exited with error")
}

/// Initialize tracing subscriber with `RUST_LOG` env filter (default: `info`).
fn init_logging() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    Ok(())
}
