// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod config;
pub mod storage;
pub mod version;
pub mod vision;

// Re-export main types
pub use api::{build_router, start_server, ApiError, AppState, DetectResponse, DetectionStatus};
pub use config::NodeConfig;
pub use storage::{sanitize_filename, spawn_sweeper, FileStore};
pub use vision::{
    render_annotated, statistics, DetectError, Detection, DetectionEngine, ImageMetadata,
    OnnxDetector, Statistics,
};
