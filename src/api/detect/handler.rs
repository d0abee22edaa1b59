// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detect endpoint handler

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use axum_extra::extract::Multipart;
use tracing::{debug, info, warn};

use super::response::{DetectResponse, DetectionStatus, FileInfo};
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::storage::sanitize_filename;
use crate::vision::detector::DetectError;
use crate::vision::{decode_image_bytes, read_metadata, render_annotated, statistics, Detection};

/// POST /detect - Detect objects in an uploaded image
///
/// Accepts a multipart form with an `image` file field and an optional
/// `confidence_threshold` text field (default 0.5).
///
/// # Response
/// - `detections`: retained detections with derived geometry
/// - `statistics`: aggregate counts and score/area stats
/// - `processing_time`: detection seconds (rendering excluded)
/// - `image_metadata`: size, format, color mode, DPI if present
/// - `file_info`: original name, byte size, server-side result path
/// - `status`: `ok`, or `degraded` when the pipeline failed internally
///
/// # Errors
/// - 400 Bad Request: missing file, empty filename, bad threshold,
///   disallowed extension
/// - 413 Payload Too Large: upload over the configured size limit
/// - 500 Internal Server Error: storage or other unhandled failure
pub async fn detect_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<DetectResponse>, ApiError> {
    let upload = read_upload(multipart, state.config.detector.default_confidence_threshold)
        .await?;

    let filename = upload
        .filename
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::MissingImage("No selected file".to_string()))?;

    if !allowed_extension(&filename, &state.config.limits.allowed_extensions) {
        warn!("Rejected upload '{}': extension not allowed", filename);
        return Err(ApiError::DisallowedExtension(filename));
    }

    let limit = state.config.limits.max_file_size;
    if upload.data.len() > limit {
        warn!(
            "Rejected upload '{}': {} bytes over the {} byte limit",
            filename,
            upload.data.len(),
            limit
        );
        return Err(ApiError::PayloadTooLarge {
            size: upload.data.len(),
            limit,
        });
    }

    let filename = sanitize_filename(&filename);
    let file_size = upload.data.len() as u64;
    state
        .store
        .save_upload(&filename, &upload.data)
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    debug!(
        "Processing '{}' ({} bytes) at threshold {}",
        filename, file_size, upload.confidence_threshold
    );

    // Detection timing covers decode, inference, statistics and metadata;
    // rendering is excluded
    let started = Instant::now();

    let decoded = decode_image_bytes(&upload.data);
    let (image, detect_result) = match decoded {
        Ok((image, _info)) => {
            let image = Arc::new(image);
            let result = run_inference(&state, image.clone(), upload.confidence_threshold).await;
            (Some(image), result)
        }
        Err(e) => (None, Err(DetectError::Decode(e.to_string()))),
    };

    let (detections, status) = match detect_result {
        Ok(detections) => (detections, DetectionStatus::Ok),
        Err(e) => {
            warn!("Detection pipeline failed for '{}': {}", filename, e);
            (Vec::new(), DetectionStatus::Degraded)
        }
    };

    let stats = statistics(&detections);
    let image_metadata = read_metadata(&upload.data);
    let processing_time = started.elapsed().as_secs_f64();

    let result_path = state.store.result_path(&filename);
    if let Some(image) = image {
        if !render_annotated(&image, &detections, &result_path) {
            warn!("Failed to write annotated result for '{}'", filename);
        }
    }

    info!(
        "Detect complete: '{}' -> {} object(s) in {:.3}s ({:?})",
        filename,
        detections.len(),
        processing_time,
        status
    );

    Ok(Json(DetectResponse {
        detections,
        statistics: stats,
        processing_time,
        image_metadata,
        file_info: FileInfo {
            original_name: filename,
            size: file_size,
            result_path: result_path.display().to_string(),
        },
        status,
    }))
}

struct Upload {
    data: Bytes,
    filename: Option<String>,
    confidence_threshold: f32,
}

/// Pull the image file and optional threshold out of the multipart form.
async fn read_upload(mut multipart: Multipart, default_threshold: f32) -> Result<Upload, ApiError> {
    let mut data: Option<Bytes> = None;
    let mut filename: Option<String> = None;
    let mut confidence_threshold = default_threshold;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid multipart form: {}", e)))?
    {
        match field.name() {
            Some("image") => {
                filename = field.file_name().map(|name| name.to_string());
                data = Some(field.bytes().await.map_err(|e| {
                    ApiError::InvalidRequest(format!("Failed to read image field: {}", e))
                })?);
            }
            Some("confidence_threshold") => {
                let text = field.text().await.map_err(|e| {
                    ApiError::InvalidRequest(format!("Failed to read threshold field: {}", e))
                })?;
                confidence_threshold = text.trim().parse::<f32>().map_err(|_| {
                    ApiError::InvalidRequest(format!(
                        "Invalid confidence_threshold '{}'",
                        text.trim()
                    ))
                })?;
            }
            _ => {}
        }
    }

    let data = data.ok_or_else(|| ApiError::MissingImage("No image uploaded".to_string()))?;

    Ok(Upload {
        data,
        filename,
        confidence_threshold,
    })
}

/// Run the blocking inference call on the blocking pool under the
/// configured timeout. A timeout degrades the request exactly like any
/// other pipeline failure.
async fn run_inference(
    state: &AppState,
    image: Arc<image::DynamicImage>,
    confidence_threshold: f32,
) -> Result<Vec<Detection>, DetectError> {
    let engine = state.engine.clone();
    let timeout = state.config.detector.inference_timeout;

    let task =
        tokio::task::spawn_blocking(move || engine.detect(&image, confidence_threshold));

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(DetectError::Cancelled(join_error.to_string())),
        Err(_) => Err(DetectError::Timeout(timeout.as_secs())),
    }
}

/// Check if the file extension is allowed.
pub fn allowed_extension(filename: &str, allowed: &[String]) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| allowed.iter().any(|a| a.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}
