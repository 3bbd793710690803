//! Content encoding for services that take binary documents instead of text

use base64::Engine;
use serde::Serialize;

use super::types::SourceFile;
use super::validator::normalize_mime;

/// Transport-safe form of a raw file
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EncodedPayload {
    pub file_name: String,
    pub mime_type: String,
    pub file_base64: String,
}

/// Base64-encode a file's raw bytes
pub fn encode(file: &SourceFile) -> EncodedPayload {
    EncodedPayload {
        file_name: file.name.clone(),
        mime_type: normalize_mime(&file.mime_type),
        file_base64: base64::engine::general_purpose::STANDARD.encode(&file.bytes),
    }
}
