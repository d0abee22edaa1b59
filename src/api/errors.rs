// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! API error taxonomy and wire mapping
//!
//! Request-validation failures map to 4xx; anything that escapes to the
//! outer boundary becomes a 500 with the message echoed in the body.

use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

/// Wire shape of every error body: `{"error": <message>}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    /// No usable `image` field in the multipart form
    MissingImage(String),
    /// Malformed request field (bad threshold, broken multipart, ...)
    InvalidRequest(String),
    /// Upload extension outside the allowed set
    DisallowedExtension(String),
    /// Upload larger than the configured limit
    PayloadTooLarge { size: usize, limit: usize },
    NotFound(String),
    InternalError(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingImage(_)
            | ApiError::InvalidRequest(_)
            | ApiError::DisallowedExtension(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::MissingImage(msg) => write!(f, "{}", msg),
            ApiError::InvalidRequest(msg) => write!(f, "{}", msg),
            ApiError::DisallowedExtension(_) => write!(f, "File type not allowed"),
            ApiError::PayloadTooLarge { limit, .. } => {
                write!(
                    f,
                    "File size exceeds {}MB limit",
                    limit / (1024 * 1024)
                )
            }
            ApiError::NotFound(msg) => write!(f, "{}", msg),
            ApiError::InternalError(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_response())).into_response()
    }
}
