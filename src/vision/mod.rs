// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing module for CPU-based object detection
//!
//! This module provides:
//! - Image decoding and header metadata extraction
//! - ONNX Runtime inference over a pre-trained detection model
//! - Detection enrichment and aggregate statistics
//! - Annotated image rendering
//!
//! Inference runs on CPU only to keep the node deployable without a GPU.

pub mod annotate;
pub mod categories;
pub mod detection;
pub mod detector;
pub mod image_utils;

pub use annotate::{confidence_color, render_annotated, RenderError};
pub use categories::{category_name, COCO_CATEGORIES};
pub use detection::{statistics, BoxDimensions, Detection, Statistics};
pub use detector::{DetectError, DetectionEngine, OnnxDetector};
pub use image_utils::{
    decode_image_bytes, detect_format, read_metadata, ImageError, ImageInfo, ImageMetadata,
};
