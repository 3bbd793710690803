//! Vision utilities for OCR
//!
//! Handles image preparation and format detection for the vision endpoint.

use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

use super::validator::{normalize_mime, MIME_GIF, MIME_JPEG, MIME_PNG};
use crate::error::OcrError;

/// Maximum image dimension (width or height)
const MAX_DIMENSION: u32 = 1600;

/// Prepare an image for the vision endpoint
///
/// - Resizes if too large
/// - Converts to JPEG for optimal size
pub fn prepare_image_for_vision(image_data: &[u8]) -> Result<Vec<u8>, OcrError> {
    let img = image::load_from_memory(image_data)
        .map_err(|e| OcrError::Image(format!("Failed to load image: {}", e)))?;

    // JPEG has no alpha channel
    let img = DynamicImage::ImageRgb8(resize_if_needed(img).to_rgb8());

    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Jpeg)
        .map_err(|e| OcrError::Image(format!("Failed to encode image: {}", e)))?;

    Ok(buffer)
}

/// Resize image if it exceeds maximum dimensions
fn resize_if_needed(img: DynamicImage) -> DynamicImage {
    let (width, height) = (img.width(), img.height());

    if width <= MAX_DIMENSION && height <= MAX_DIMENSION {
        return img;
    }

    let scale = (MAX_DIMENSION as f32 / width.max(height) as f32).min(1.0);
    let new_width = ((width as f32 * scale) as u32).max(1);
    let new_height = ((height as f32 * scale) as u32).max(1);

    img.resize(new_width, new_height, image::imageops::FilterType::Lanczos3)
}

/// Whether a MIME type is an image the OCR pass can read directly
pub fn is_image_type(mime_type: &str) -> bool {
    matches!(normalize_mime(mime_type).as_str(), MIME_JPEG | MIME_PNG | MIME_GIF)
}

/// Detect image MIME type from magic bytes
pub fn detect_image_mime(data: &[u8]) -> &'static str {
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        "image/png"
    } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if data.starts_with(b"RIFF") && data.get(8..12) == Some(b"WEBP") {
        "image/webp"
    } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        "image/gif"
    } else {
        "image/png" // Default
    }
}
