//! Liveness HTTP endpoint
//!
//! Small independent surface for uptime probes:
//! - `GET /` -> "🟢 Bot is ONLINE" (human-facing status page)
//! - `GET /health` -> "OK" (probe endpoint)
//!
//! Deliberately has no access to bot state; it answers as long as the
//! process is alive.

use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use tracing::{error, info};

async fn home() -> &'static str {
    "🟢 Bot is ONLINE"
}

async fn health() -> &'static str {
    "OK"
}

/// Builds the liveness router.
#[must_use]
pub fn router() -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
}

/// Serves the liveness endpoint on `port` until the process exits.
///
/// Bind or serve failures are logged, not propagated: a broken probe
/// endpoint must never take the bot down with it.
pub async fn serve(port: u16) {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind liveness endpoint on {}: {}", addr, e);
            return;
        }
    };

    info!("Liveness endpoint listening on {}", addr);
    if let Err(e) = axum::serve(listener, router()).await {
        error!("Liveness endpoint terminated: {}", e);
    }
}
