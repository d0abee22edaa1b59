// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Annotated image rendering
//!
//! Draws confidence-tier colored boxes and label overlays for a detection
//! set, then encodes the result as a quality-95 JPEG.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use ab_glyph::{FontRef, PxScale};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use thiserror::Error;
use tracing::warn;

use super::detection::Detection;

const FONT_DATA: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

// Overlay constants
const BOX_STROKE_WIDTH: i32 = 8;
const LABEL_FONT_SIZE: f32 = 48.0;
const STATS_FONT_SIZE: f32 = 36.0;
const LABEL_OFFSET_Y: i32 = 50;
const STATS_OFFSET_Y: i32 = 90;
const LABEL_CHAR_WIDTH_FACTOR: f32 = 0.55; // rough per-char advance relative to font size
const JPEG_QUALITY: u8 = 95;
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to load overlay font: {0}")]
    Font(String),

    #[error("failed to encode annotated image: {0}")]
    Image(#[from] image::ImageError),

    #[error("failed to write annotated image: {0}")]
    Io(#[from] std::io::Error),
}

/// Outline color by confidence tier: three fixed tiers, boundaries are
/// inclusive lower bounds, no interpolation.
pub fn confidence_color(score: f32) -> Rgb<u8> {
    if score >= 0.8 {
        Rgb([0, 255, 0]) // Green for high confidence
    } else if score >= 0.6 {
        Rgb([255, 165, 0]) // Orange for medium confidence
    } else {
        Rgb([255, 0, 0]) // Red for low confidence
    }
}

/// Render the detections onto a copy of the image and write it to
/// `destination` as a quality-95 JPEG.
///
/// Returns `false` if any drawing or encoding step fails; failures never
/// propagate past this boundary. An empty detection list produces a plain
/// re-encode of the source.
pub fn render_annotated(
    image: &DynamicImage,
    detections: &[Detection],
    destination: &Path,
) -> bool {
    match try_render(image, detections, destination) {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to render annotated image: {}", e);
            false
        }
    }
}

/// Fallible rendering used internally; `render_annotated` flattens the
/// error into a success flag at the public boundary.
pub fn try_render(
    image: &DynamicImage,
    detections: &[Detection],
    destination: &Path,
) -> Result<(), RenderError> {
    let font =
        FontRef::try_from_slice(FONT_DATA).map_err(|e| RenderError::Font(e.to_string()))?;

    let mut canvas = image.to_rgb8();
    for detection in detections {
        draw_detection(&mut canvas, detection, &font);
    }

    let file = File::create(destination)?;
    let mut writer = BufWriter::new(file);
    let mut encoder = JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY);
    encoder.encode_image(&canvas)?;
    writer.flush()?;
    Ok(())
}

fn draw_detection(canvas: &mut RgbImage, detection: &Detection, font: &FontRef) {
    let color = confidence_color(detection.score);
    let [x1, y1, x2, y2] = detection.bbox;
    let (x1, y1) = (x1.round() as i32, y1.round() as i32);
    let (x2, y2) = (x2.round() as i32, y2.round() as i32);

    // Outline drawn as nested one-pixel rectangles, inset inwards
    for inset in 0..BOX_STROKE_WIDTH {
        let width = (x2 - x1) - 2 * inset;
        let height = (y2 - y1) - 2 * inset;
        if width <= 0 || height <= 0 {
            break;
        }
        draw_hollow_rect_mut(
            canvas,
            Rect::at(x1 + inset, y1 + inset).of_size(width as u32, height as u32),
            color,
        );
    }

    // Two text lines above the box top edge: label+score, then the area.
    // Coordinates are intentionally not clamped to the canvas; boxes near
    // the top edge draw off-canvas and the primitives clip.
    let label_text = format!("{}: {:.2}", detection.label, detection.score);
    let stats_text = format!("Area: {:.0}px²", detection.dimensions.area);
    draw_label_line(
        canvas,
        font,
        &label_text,
        LABEL_FONT_SIZE,
        x1,
        y1 - LABEL_OFFSET_Y,
        color,
    );
    draw_label_line(
        canvas,
        font,
        &stats_text,
        STATS_FONT_SIZE,
        x1,
        y1 - STATS_OFFSET_Y,
        color,
    );
}

fn draw_label_line(
    canvas: &mut RgbImage,
    font: &FontRef,
    text: &str,
    font_size: f32,
    x: i32,
    y: i32,
    background: Rgb<u8>,
) {
    let width = (text.chars().count() as f32 * font_size * LABEL_CHAR_WIDTH_FACTOR).ceil() as i32;
    let height = font_size.ceil() as i32;
    if width > 0 && height > 0 {
        draw_filled_rect_mut(
            canvas,
            Rect::at(x, y).of_size(width as u32, height as u32),
            background,
        );
    }
    draw_text_mut(
        canvas,
        TEXT_COLOR,
        x,
        y,
        PxScale::from(font_size),
        font,
        text,
    );
}
