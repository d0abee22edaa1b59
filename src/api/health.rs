// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Health endpoint

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::http_server::AppState;
use crate::version;

/// Active configuration echoed by the liveness probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    pub max_file_size: usize,
    pub allowed_extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Unix timestamp in seconds
    pub timestamp: f64,
    pub version: String,
    pub model: String,
    pub config: HealthConfig,
}

/// GET /health - Liveness probe with active configuration
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().timestamp_micros() as f64 / 1e6,
        version: version::VERSION_NUMBER.to_string(),
        model: state.engine.model_name(),
        config: HealthConfig {
            max_file_size: state.config.limits.max_file_size,
            allowed_extensions: state.config.limits.allowed_extensions.clone(),
        },
    })
}
