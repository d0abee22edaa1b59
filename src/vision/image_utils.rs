// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image loading and metadata extraction for the detection pipeline

use std::io::Cursor;

use image::{ColorType, DynamicImage, ImageDecoder, ImageFormat, ImageReader};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Maximum image size (10MB)
pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// Custom error types for image processing
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Image data is too large: {0} bytes (max: {1} bytes)")]
    TooLarge(usize, usize),

    #[error("Unsupported image format")]
    UnsupportedFormat,

    #[error("Failed to decode image: {0}")]
    DecodeFailed(String),

    #[error("Image data is empty")]
    EmptyData,
}

/// Image information extracted during loading
#[derive(Debug, Clone)]
pub struct ImageInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Detected format
    pub format: ImageFormat,
    /// Size in bytes
    pub size_bytes: usize,
}

/// Header-level metadata of an uploaded image.
///
/// All fields are optional: a failed extraction yields the empty record,
/// never an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ImageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<(u32, u32)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dpi: Option<(f32, f32)>,
}

/// Decode raw image bytes (for multipart uploads)
///
/// # Arguments
/// * `bytes` - Raw image bytes
///
/// # Returns
/// * `Ok((DynamicImage, ImageInfo))` - The decoded image and metadata
/// * `Err(ImageError)` - If decoding fails
pub fn decode_image_bytes(bytes: &[u8]) -> Result<(DynamicImage, ImageInfo), ImageError> {
    // Validate size
    if bytes.len() > MAX_IMAGE_SIZE {
        return Err(ImageError::TooLarge(bytes.len(), MAX_IMAGE_SIZE));
    }

    if bytes.is_empty() {
        return Err(ImageError::EmptyData);
    }

    // Detect format from magic bytes
    let format = detect_format(bytes)?;

    // Load image
    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| ImageError::DecodeFailed(e.to_string()))?;

    let info = ImageInfo {
        width: img.width(),
        height: img.height(),
        format,
        size_bytes: bytes.len(),
    };

    Ok((img, info))
}

/// Detect image format from magic bytes
///
/// # Arguments
/// * `bytes` - Raw image data
///
/// # Returns
/// * `Ok(ImageFormat)` - Detected format
/// * `Err(ImageError::UnsupportedFormat)` - If format cannot be detected
pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat, ImageError> {
    if bytes.len() < 4 {
        return Err(ImageError::UnsupportedFormat);
    }

    match bytes {
        // PNG: 89 50 4E 47 (0x89 P N G)
        [0x89, 0x50, 0x4E, 0x47, ..] => Ok(ImageFormat::Png),

        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Ok(ImageFormat::Jpeg),

        // WebP: RIFF .... WEBP
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Ok(ImageFormat::WebP),

        // GIF: GIF87a or GIF89a
        [0x47, 0x49, 0x46, 0x38, x, ..] if *x == 0x37 || *x == 0x39 => Ok(ImageFormat::Gif),

        // BMP: BM
        [0x42, 0x4D, ..] => Ok(ImageFormat::Bmp),

        // TIFF: II (little-endian) or MM (big-endian)
        [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => Ok(ImageFormat::Tiff),

        _ => Err(ImageError::UnsupportedFormat),
    }
}

/// Get the format extension as a string
pub fn format_to_extension(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "png",
        ImageFormat::Jpeg => "jpg",
        ImageFormat::WebP => "webp",
        ImageFormat::Gif => "gif",
        ImageFormat::Bmp => "bmp",
        ImageFormat::Tiff => "tiff",
        _ => "unknown",
    }
}

/// Extract header-level metadata (size, format, color mode, DPI) without a
/// full pixel decode. Any failure yields the empty record.
pub fn read_metadata(bytes: &[u8]) -> ImageMetadata {
    match try_read_metadata(bytes) {
        Ok(metadata) => metadata,
        Err(e) => {
            warn!("Failed to read image metadata: {}", e);
            ImageMetadata::default()
        }
    }
}

fn try_read_metadata(bytes: &[u8]) -> Result<ImageMetadata, ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::EmptyData);
    }

    let format = detect_format(bytes)?;
    let decoder = ImageReader::with_format(Cursor::new(bytes), format)
        .into_decoder()
        .map_err(|e| ImageError::DecodeFailed(e.to_string()))?;

    let (width, height) = decoder.dimensions();
    let mode = color_mode_name(decoder.color_type());

    Ok(ImageMetadata {
        size: Some((width, height)),
        format: Some(format_name(format).to_string()),
        mode: Some(mode.to_string()),
        dpi: dpi_from_header(bytes, format),
    })
}

/// Format name matching the conventional encoder naming (PNG, JPEG, ...).
pub fn format_name(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "PNG",
        ImageFormat::Jpeg => "JPEG",
        ImageFormat::WebP => "WEBP",
        ImageFormat::Gif => "GIF",
        ImageFormat::Bmp => "BMP",
        ImageFormat::Tiff => "TIFF",
        _ => "UNKNOWN",
    }
}

/// Color mode string for a decoded color type (PIL-style naming).
pub fn color_mode_name(color: ColorType) -> &'static str {
    match color {
        ColorType::L8 => "L",
        ColorType::La8 => "LA",
        ColorType::Rgb8 => "RGB",
        ColorType::Rgba8 => "RGBA",
        ColorType::L16 => "I;16",
        ColorType::La16 => "LA;16",
        ColorType::Rgb16 => "RGB;16",
        ColorType::Rgba16 => "RGBA;16",
        ColorType::Rgb32F => "F",
        ColorType::Rgba32F => "F",
        _ => "unknown",
    }
}

/// Read the DPI pair from the image header when the container carries one:
/// the JFIF density fields for JPEG, the pHYs chunk for PNG.
fn dpi_from_header(bytes: &[u8], format: ImageFormat) -> Option<(f32, f32)> {
    match format {
        ImageFormat::Jpeg => jpeg_jfif_density(bytes),
        ImageFormat::Png => png_phys_density(bytes),
        _ => None,
    }
}

fn jpeg_jfif_density(bytes: &[u8]) -> Option<(f32, f32)> {
    // SOI marker, then a segment stream of [FF, type, len_hi, len_lo, data].
    let mut i = 2;
    while i + 4 <= bytes.len() && bytes[i] == 0xFF {
        let marker = bytes[i + 1];
        // Start of scan: no metadata past this point
        if marker == 0xDA || marker == 0xD9 {
            break;
        }
        let segment_len = u16::from_be_bytes([bytes[i + 2], bytes[i + 3]]) as usize;
        if marker == 0xE0 && segment_len >= 14 && i + 2 + segment_len <= bytes.len() {
            let data = &bytes[i + 4..i + 2 + segment_len];
            if data.starts_with(b"JFIF\0") {
                let units = data[7];
                let x_density = u16::from_be_bytes([data[8], data[9]]) as f32;
                let y_density = u16::from_be_bytes([data[10], data[11]]) as f32;
                return match units {
                    // 1 = dots per inch, 2 = dots per centimetre
                    1 => Some((x_density, y_density)),
                    2 => Some((x_density * 2.54, y_density * 2.54)),
                    _ => None,
                };
            }
        }
        i += 2 + segment_len;
    }
    None
}

fn png_phys_density(bytes: &[u8]) -> Option<(f32, f32)> {
    // 8-byte signature, then chunks of [len, type, data, crc].
    let mut i = 8;
    while i + 8 <= bytes.len() {
        let chunk_len =
            u32::from_be_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]) as usize;
        let chunk_type = &bytes[i + 4..i + 8];
        if chunk_type == b"pHYs" && chunk_len == 9 && i + 8 + 9 <= bytes.len() {
            let data = &bytes[i + 8..i + 17];
            let ppu_x = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as f32;
            let ppu_y = u32::from_be_bytes([data[4], data[5], data[6], data[7]]) as f32;
            // Unit 1 = pixels per metre; unit 0 specifies aspect ratio only
            return match data[8] {
                1 => Some((ppu_x * 0.0254, ppu_y * 0.0254)),
                _ => None,
            };
        }
        if chunk_type == b"IDAT" || chunk_type == b"IEND" {
            break;
        }
        i += 12 + chunk_len;
    }
    None
}
