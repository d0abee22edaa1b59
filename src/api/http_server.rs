// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP server assembly: routes, shared state, middleware

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::detect::detect_handler;
use super::health::health_handler;
use super::output::output_handler;
use crate::config::NodeConfig;
use crate::storage::FileStore;
use crate::vision::DetectionEngine;

/// Slack on top of the upload limit for the multipart envelope; the exact
/// file-size limit is enforced in the handler so oversized uploads get a
/// proper 413 before touching storage.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<dyn DetectionEngine>,
    pub store: Arc<FileStore>,
    pub config: Arc<NodeConfig>,
}

/// Build the application router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.limits.max_file_size + MULTIPART_OVERHEAD;

    Router::new()
        .route("/detect", post(detect_handler))
        .route("/output/:filename", get(output_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to install shutdown handler: {}", e);
    }
}
