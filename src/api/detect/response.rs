// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detect endpoint response types

use serde::{Deserialize, Serialize};

use crate::vision::{Detection, ImageMetadata, Statistics};

/// Details of the uploaded file and where its rendered result landed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileInfo {
    pub original_name: String,
    pub size: u64,
    pub result_path: String,
}

/// Whether the detection pipeline ran cleanly.
///
/// `Degraded` means an internal stage failed and the empty detection list
/// is not a genuine "no objects found" result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DetectionStatus {
    Ok,
    Degraded,
}

/// Response from the detect endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectResponse {
    /// Retained detections in the model's native output order
    pub detections: Vec<Detection>,
    /// Aggregate statistics over the retained set
    pub statistics: Statistics,
    /// Detection wall-clock seconds (excludes rendering)
    pub processing_time: f64,
    /// Header-level metadata of the uploaded image
    pub image_metadata: ImageMetadata,
    /// Upload details and the server-side result path
    pub file_info: FileInfo,
    /// Pipeline health flag disambiguating empty results
    pub status: DetectionStatus,
}
