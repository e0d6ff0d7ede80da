//! Helper functions and utilities
//!
//! This module contains common helper functions used throughout the application.

use rand::RngCore;
use uuid::Uuid;

/// Bytes of entropy carried by a QR token
pub const QR_TOKEN_BYTES: usize = 16;

/// Generate an unguessable QR token: 128 bits from the OS-seeded CSPRNG, lowercase hex
pub fn generate_qr_token() -> String {
    let mut bytes = [0u8; QR_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Last `len` characters of the simple (hyphenless) form of a UUID
pub fn short_id(id: Uuid, len: usize) -> String {
    let simple = id.simple().to_string();
    simple[simple.len().saturating_sub(len)..].to_string()
}

/// Sanitize filename for safe storage
pub fn sanitize_filename(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    // Never let a name climb out of its directory
    sanitized.trim_start_matches('.').to_string()
}

/// Normalize whitespace in text
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trimmed value, or `None` when the input is missing or blank
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
