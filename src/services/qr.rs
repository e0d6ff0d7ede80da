//! QR attendance codes
//!
//! `QrPayload` is the single encoder and decoder of the text carried inside a
//! student's QR image. Issuance and scanning both go through it.
//!
//! Version 1 layout: `clubhub:v1:<event-uuid>:<student-uuid>:<token>` where the
//! token is 32 lowercase hex characters.

use std::fmt;
use std::sync::Arc;

use qrcode::render::svg;
use qrcode::QrCode;
use uuid::Uuid;

use crate::services::blob::BlobStore;
use crate::utils::errors::{ClubHubError, Result};
use crate::utils::helpers::{generate_qr_token, QR_TOKEN_BYTES};
use crate::utils::logging::log_upstream_error;

const PREFIX: &str = "clubhub";
const VERSION: &str = "v1";
const FIELD_COUNT: usize = 5;

pub const QR_CONTENT_TYPE: &str = "image/svg+xml";

/// The three facts a QR code vouches for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrPayload {
    pub event_id: Uuid,
    pub student_id: Uuid,
    pub token: String,
}

impl QrPayload {
    pub fn new(event_id: Uuid, student_id: Uuid, token: String) -> Self {
        Self {
            event_id,
            student_id,
            token,
        }
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Parse scanned text, checking field count before touching any field
    pub fn decode(raw: &str) -> Result<Self> {
        let fields: Vec<&str> = raw.trim().split(':').collect();
        if fields.len() != FIELD_COUNT {
            return Err(ClubHubError::MalformedQr(format!(
                "expected {} fields, found {}",
                FIELD_COUNT,
                fields.len()
            )));
        }

        if fields[0] != PREFIX {
            return Err(ClubHubError::MalformedQr("unknown prefix".to_string()));
        }
        if fields[1] != VERSION {
            return Err(ClubHubError::MalformedQr(format!(
                "unsupported version {}",
                fields[1]
            )));
        }

        let event_id = Uuid::parse_str(fields[2])
            .map_err(|_| ClubHubError::MalformedQr("event id is not a UUID".to_string()))?;
        let student_id = Uuid::parse_str(fields[3])
            .map_err(|_| ClubHubError::MalformedQr("student id is not a UUID".to_string()))?;

        let token = fields[4];
        let well_formed = token.len() == QR_TOKEN_BYTES * 2
            && token
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !well_formed {
            return Err(ClubHubError::MalformedQr("token is not 32 lowercase hex characters".to_string()));
        }

        Ok(Self::new(event_id, student_id, token.to_string()))
    }

    /// Blob key the rendered image is stored under. Includes the token, so
    /// two issuances for the same pair never share a key.
    pub fn blob_key(&self) -> String {
        format!("qr/{}/{}-{}.svg", self.event_id, self.student_id, self.token)
    }
}

impl fmt::Display for QrPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}",
            PREFIX, VERSION, self.event_id, self.student_id, self.token
        )
    }
}

/// Turns payload text into image bytes
pub trait QrRenderer: Send + Sync {
    fn render(&self, payload: &str) -> Result<Vec<u8>>;
}

/// Renders QR codes as SVG documents
#[derive(Debug, Clone)]
pub struct SvgQrRenderer {
    min_size: u32,
}

impl SvgQrRenderer {
    pub fn new(min_size: u32) -> Self {
        Self { min_size }
    }
}

impl Default for SvgQrRenderer {
    fn default() -> Self {
        Self::new(256)
    }
}

impl QrRenderer for SvgQrRenderer {
    fn render(&self, payload: &str) -> Result<Vec<u8>> {
        let code = QrCode::new(payload.as_bytes())
            .map_err(|e| ClubHubError::upstream("qr renderer", e.to_string()))?;

        let image = code
            .render::<svg::Color<'_>>()
            .min_dimensions(self.min_size, self.min_size)
            .dark_color(svg::Color("#000000"))
            .light_color(svg::Color("#ffffff"))
            .build();

        Ok(image.into_bytes())
    }
}

/// A freshly issued code, uploaded but not yet attached to a registration
#[derive(Debug, Clone)]
pub struct IssuedQr {
    pub payload: QrPayload,
    pub url: String,
}

/// Generates tokens, renders them and uploads the image
#[derive(Clone)]
pub struct QrIssuer {
    renderer: Arc<dyn QrRenderer>,
    blobs: Arc<dyn BlobStore>,
}

impl QrIssuer {
    pub fn new(renderer: Arc<dyn QrRenderer>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { renderer, blobs }
    }

    /// Render and upload a new code. Nothing is persisted when this fails.
    pub async fn issue(&self, event_id: Uuid, student_id: Uuid) -> Result<IssuedQr> {
        let payload = QrPayload::new(event_id, student_id, generate_qr_token());
        let image = self.renderer.render(&payload.encode())?;

        let url = self
            .blobs
            .put(&payload.blob_key(), image, QR_CONTENT_TYPE)
            .await
            .map_err(|e| {
                log_upstream_error("blob store", &e.to_string(), Some("qr upload"));
                e
            })?;

        Ok(IssuedQr { payload, url })
    }

    /// Remove an uploaded image that no registration ended up referencing
    pub async fn discard(&self, issued: &IssuedQr) {
        if let Err(e) = self.blobs.delete(&issued.payload.blob_key()).await {
            tracing::warn!(key = %issued.payload.blob_key(), error = %e, "Failed to discard orphaned QR image");
        }
    }
}
