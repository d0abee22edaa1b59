// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection data model and aggregate statistics
//!
//! A `Detection` is one retained model output enriched with derived
//! geometry. Detections are immutable once constructed; downstream code
//! only aggregates them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Box geometry derived from the corner coordinates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoxDimensions {
    pub width: f32,
    pub height: f32,
    pub area: f32,
}

/// One detected object above the confidence threshold.
///
/// `bbox` is `[x1, y1, x2, y2]` in pixel coordinates of the original
/// (pre-transform) image, as produced by the model. `relative_size` is the
/// box area as a percentage of the total image area.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Detection {
    #[serde(rename = "box")]
    pub bbox: [f32; 4],
    pub score: f32,
    pub label: String,
    pub dimensions: BoxDimensions,
    pub center: (f32, f32),
    pub relative_size: f32,
}

impl Detection {
    /// Build a detection from a raw model box, deriving dimensions, center
    /// and relative size from the original image dimensions.
    pub fn from_box(
        bbox: [f32; 4],
        score: f32,
        label: impl Into<String>,
        image_width: u32,
        image_height: u32,
    ) -> Self {
        let width = bbox[2] - bbox[0];
        let height = bbox[3] - bbox[1];
        let area = width * height;
        let center = ((bbox[0] + bbox[2]) / 2.0, (bbox[1] + bbox[3]) / 2.0);
        let image_area = image_width as f32 * image_height as f32;

        Self {
            bbox,
            score,
            label: label.into(),
            dimensions: BoxDimensions {
                width,
                height,
                area,
            },
            center,
            relative_size: area / image_area * 100.0,
        }
    }
}

/// Confidence score aggregate over a detection set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfidenceStats {
    pub mean: f32,
    pub min: f32,
    pub max: f32,
}

/// Box area aggregate over a detection set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SizeStats {
    pub mean_area: f32,
    pub min_area: f32,
    pub max_area: f32,
}

/// Aggregate statistics for one request.
///
/// When no detections were retained, only `total_objects` is serialized —
/// the nested blocks are omitted entirely rather than zero-filled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Statistics {
    pub total_objects: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_distribution: Option<BTreeMap<String, usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_stats: Option<ConfidenceStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_stats: Option<SizeStats>,
}

impl Statistics {
    pub fn empty() -> Self {
        Self {
            total_objects: 0,
            class_distribution: None,
            confidence_stats: None,
            size_stats: None,
        }
    }
}

/// Compute aggregate statistics over the retained detections.
///
/// Pure aggregation, no I/O. Means are plain arithmetic means; extrema are
/// a stable scan where the first occurrence wins on ties.
pub fn statistics(detections: &[Detection]) -> Statistics {
    if detections.is_empty() {
        return Statistics::empty();
    }

    let mut class_distribution: BTreeMap<String, usize> = BTreeMap::new();
    for det in detections {
        *class_distribution.entry(det.label.clone()).or_insert(0) += 1;
    }

    let scores: Vec<f32> = detections.iter().map(|d| d.score).collect();
    let areas: Vec<f32> = detections.iter().map(|d| d.dimensions.area).collect();

    Statistics {
        total_objects: detections.len(),
        class_distribution: Some(class_distribution),
        confidence_stats: Some(ConfidenceStats {
            mean: mean(&scores),
            min: stable_min(&scores),
            max: stable_max(&scores),
        }),
        size_stats: Some(SizeStats {
            mean_area: mean(&areas),
            min_area: stable_min(&areas),
            max_area: stable_max(&areas),
        }),
    }
}

fn mean(values: &[f32]) -> f32 {
    values.iter().sum::<f32>() / values.len() as f32
}

fn stable_min(values: &[f32]) -> f32 {
    values
        .iter()
        .copied()
        .fold(f32::INFINITY, |acc, v| if v < acc { v } else { acc })
}

fn stable_max(values: &[f32]) -> f32 {
    values
        .iter()
        .copied()
        .fold(f32::NEG_INFINITY, |acc, v| if v > acc { v } else { acc })
}
