// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ONNX object detection wrapper
//!
//! This module provides a wrapper around ONNX Runtime for running a
//! pre-trained Faster R-CNN ResNet50-FPN detection model (COCO label set).
//!
//! Features:
//! - ONNX model loading from disk at process start
//! - CPU execution provider (vision inference is CPU-only by policy)
//! - Channel-first f32 tensor preprocessing in the `[0, 1]` range
//! - Confidence filtering with the threshold as an explicit per-call
//!   parameter, so concurrent requests are strictly isolated
//! - Geometry enrichment against the original image dimensions

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use image::DynamicImage;
use ndarray::{Array3, Ix1, Ix2};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use thiserror::Error;
use tracing::{debug, info};

use super::categories::category_name;
use super::detection::Detection;
use crate::config::DetectorConfig;

/// Input tensor name expected in the exported graph.
///
/// The model must be exported with `input_names=["input"]` and
/// `output_names=["boxes", "labels", "scores"]`; outputs are read by
/// position so only the input name is load-bearing.
const MODEL_INPUT_NAME: &str = "input";

/// Pipeline-internal failure kinds.
///
/// The detection pipeline reports failures as a discriminated result so
/// callers can distinguish "genuinely empty" from "pipeline failed"; the
/// HTTP layer flattens these into an empty detection list for wire
/// compatibility.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("model output had unexpected shape: {0}")]
    OutputShape(String),

    #[error("inference timed out after {0} seconds")]
    Timeout(u64),

    #[error("inference task was cancelled: {0}")]
    Cancelled(String),
}

/// Narrow interface over the detection model.
///
/// `detect` takes the confidence threshold as an explicit parameter —
/// engines must not hold per-request mutable state.
pub trait DetectionEngine: Send + Sync {
    /// Run one forward pass and return the filtered, enriched detections
    /// in the model's native output order.
    fn detect(
        &self,
        image: &DynamicImage,
        confidence_threshold: f32,
    ) -> Result<Vec<Detection>, DetectError>;

    /// Identifier of the loaded model, for health reporting.
    fn model_name(&self) -> String;
}

/// ONNX Runtime backed detection engine.
///
/// The session is loaded once and shared behind `Arc<Mutex<_>>`: ONNX
/// Runtime requires exclusive access during `run`, so inference is a
/// serialized, blocking unit of work.
#[derive(Clone)]
pub struct OnnxDetector {
    session: Arc<Mutex<Session>>,
    model_name: String,
}

impl std::fmt::Debug for OnnxDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxDetector")
            .field("model_name", &self.model_name)
            .finish_non_exhaustive()
    }
}

impl OnnxDetector {
    /// Load the detection model from disk.
    ///
    /// # Errors
    /// Returns an error if the model file is missing or ONNX Runtime
    /// fails to initialize the session.
    pub fn new(config: &DetectorConfig) -> Result<Self> {
        let model_path: &Path = config.model_path.as_ref();
        if !model_path.exists() {
            anyhow::bail!("ONNX model file not found: {}", model_path.display());
        }

        info!("Loading detection model from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(config.intra_threads)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load ONNX model from {}",
                model_path.display()
            ))?;

        let model_name = model_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();

        info!("✅ Detection model '{}' loaded", model_name);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            model_name,
        })
    }

    /// Convert a decoded image to the model input: `[3, H, W]` f32,
    /// channel-first, scaled to `[0, 1]`. Resizing and normalization live
    /// inside the exported graph, so the tensor keeps the original
    /// dimensions.
    fn preprocess(image: &DynamicImage) -> Array3<f32> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        let mut tensor = Array3::<f32>::zeros((3, height as usize, width as usize));
        for (x, y, pixel) in rgb.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            tensor[[0, y, x]] = pixel[0] as f32 / 255.0;
            tensor[[1, y, x]] = pixel[1] as f32 / 255.0;
            tensor[[2, y, x]] = pixel[2] as f32 / 255.0;
        }
        tensor
    }
}

impl DetectionEngine for OnnxDetector {
    fn detect(
        &self,
        image: &DynamicImage,
        confidence_threshold: f32,
    ) -> Result<Vec<Detection>, DetectError> {
        let (image_width, image_height) = (image.width(), image.height());
        let tensor = Self::preprocess(image);

        let input =
            Value::from_array(tensor).map_err(|e| DetectError::Inference(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| DetectError::Inference("session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![MODEL_INPUT_NAME => input])
            .map_err(|e| DetectError::Inference(e.to_string()))?;

        // The exported graph yields boxes, labels, scores in that order;
        // read by position since output names vary between exports.
        let boxes = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| DetectError::OutputShape(e.to_string()))?
            .into_dimensionality::<Ix2>()
            .map_err(|e| DetectError::OutputShape(e.to_string()))?
            .to_owned();
        let labels = outputs[1]
            .try_extract_array::<i64>()
            .map_err(|e| DetectError::OutputShape(e.to_string()))?
            .into_dimensionality::<Ix1>()
            .map_err(|e| DetectError::OutputShape(e.to_string()))?
            .to_owned();
        let scores = outputs[2]
            .try_extract_array::<f32>()
            .map_err(|e| DetectError::OutputShape(e.to_string()))?
            .into_dimensionality::<Ix1>()
            .map_err(|e| DetectError::OutputShape(e.to_string()))?
            .to_owned();

        if boxes.shape()[1] != 4 {
            return Err(DetectError::OutputShape(format!(
                "expected boxes of shape [N, 4], got {:?}",
                boxes.shape()
            )));
        }
        if labels.len() != boxes.shape()[0] || scores.len() != boxes.shape()[0] {
            return Err(DetectError::OutputShape(format!(
                "mismatched output lengths: {} boxes, {} labels, {} scores",
                boxes.shape()[0],
                labels.len(),
                scores.len()
            )));
        }

        let detections = postprocess(
            boxes.view(),
            labels.view(),
            scores.view(),
            confidence_threshold,
            image_width,
            image_height,
        );

        debug!(
            "Inference complete: {} of {} candidates retained at threshold {}",
            detections.len(),
            scores.len(),
            confidence_threshold
        );

        Ok(detections)
    }

    fn model_name(&self) -> String {
        self.model_name.clone()
    }
}

/// Filter raw model candidates by confidence and enrich the survivors.
///
/// Retains a candidate iff `score >= confidence_threshold`; the threshold
/// is accepted verbatim, values outside `[0, 1]` simply make the filter
/// always or never true. Output order is the model's native order.
pub fn postprocess(
    boxes: ndarray::ArrayView2<f32>,
    labels: ndarray::ArrayView1<i64>,
    scores: ndarray::ArrayView1<f32>,
    confidence_threshold: f32,
    image_width: u32,
    image_height: u32,
) -> Vec<Detection> {
    boxes
        .outer_iter()
        .zip(labels.iter())
        .zip(scores.iter())
        .filter(|(_, &score)| score >= confidence_threshold)
        .map(|((bbox, &label), &score)| {
            Detection::from_box(
                [bbox[0], bbox[1], bbox[2], bbox[3]],
                score,
                category_name(label as usize),
                image_width,
                image_height,
            )
        })
        .collect()
}
