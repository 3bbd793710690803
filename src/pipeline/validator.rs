//! File validation
//!
//! Pure checks run once per file before it enters the pipeline: a MIME
//! allow-list and a size ceiling. Files in a batch are judged independently.

use super::types::SourceFile;
use crate::error::ValidationError;

/// Upload size ceiling (10 MiB)
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_DOC: &str = "application/msword";
pub const MIME_TEXT: &str = "text/plain";
pub const MIME_JPEG: &str = "image/jpeg";
pub const MIME_PNG: &str = "image/png";
pub const MIME_GIF: &str = "image/gif";

/// MIME types accepted into the pipeline
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    MIME_PDF, MIME_DOCX, MIME_DOC, MIME_TEXT, MIME_JPEG, MIME_PNG, MIME_GIF,
];

/// Normalize a declared MIME type: lowercase, parameters stripped, aliases folded
pub fn normalize_mime(mime_type: &str) -> String {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase();

    match essence.as_str() {
        "image/jpg" | "image/pjpeg" => MIME_JPEG.to_string(),
        _ => essence,
    }
}

/// Check whether a (possibly non-normalized) MIME type is allowed
pub fn is_allowed_type(mime_type: &str) -> bool {
    ALLOWED_MIME_TYPES.contains(&normalize_mime(mime_type).as_str())
}

/// Validate a single file. The type is checked before the size, so a
/// disallowed type is reported as such whatever its size.
pub fn validate(file: &SourceFile) -> Result<(), ValidationError> {
    if !is_allowed_type(&file.mime_type) {
        return Err(ValidationError::UnsupportedType {
            name: file.name.clone(),
            mime_type: file.mime_type.clone(),
        });
    }

    if file.size > MAX_FILE_SIZE {
        return Err(ValidationError::TooLarge {
            name: file.name.clone(),
            size: file.size,
            limit: MAX_FILE_SIZE,
        });
    }

    Ok(())
}

/// Split a batch into accepted files and rejections, preserving order
pub fn partition(files: Vec<SourceFile>) -> (Vec<SourceFile>, Vec<ValidationError>) {
    let mut accepted = Vec::with_capacity(files.len());
    let mut rejected = Vec::new();

    for file in files {
        match validate(&file) {
            Ok(()) => accepted.push(file),
            Err(e) => {
                tracing::warn!("[Validator] Rejected {}: {}", file.name, e);
                rejected.push(e);
            }
        }
    }

    (accepted, rejected)
}
