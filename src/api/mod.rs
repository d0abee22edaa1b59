// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod detect;
pub mod errors;
pub mod health;
pub mod http_server;
pub mod output;

pub use detect::{detect_handler, DetectResponse, DetectionStatus, FileInfo};
pub use errors::{ApiError, ErrorResponse};
pub use health::{health_handler, HealthConfig, HealthResponse};
pub use http_server::{build_router, start_server, AppState};
pub use output::output_handler;
