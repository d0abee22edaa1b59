// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Output endpoint: serve rendered annotated images

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use tracing::debug;

use crate::api::errors::ApiError;
use crate::api::http_server::AppState;

/// GET /output/:filename - Stream a previously rendered annotated image
///
/// The filename is sanitized before the directory lookup; results are
/// always served as JPEG regardless of the uploaded extension.
///
/// # Errors
/// - 404 Not Found: no such result file
pub async fn output_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let path = state.store.resolve_result(&filename);

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| ApiError::NotFound("File not found".to_string()))?;

    debug!("Serving result {} ({} bytes)", path.display(), bytes.len());

    Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes))
}
