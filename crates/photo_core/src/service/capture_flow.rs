//! Capture use-case: camera → location → directory.
//!
//! # Responsibility
//! - Drive a capture provider and a location provider, then add the photo.
//! - Convert every failure into "no photo was added".
//!
//! # Invariants
//! - `take_photo` never returns an error and never panics on provider failure.
//! - Location is best-effort; its absence never blocks a capture.
//! - Invalid coordinates are dropped rather than failing the capture.

use crate::model::photo::{Coordinates, PhotoRecord};
use crate::outcome::Outcome;
use crate::repo::blob_store::BlobStore;
use crate::repo::metadata_store::MetadataStore;
use crate::service::photo_directory::{CaptureInput, DirectoryError, PhotoDirectory};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use log::{info, warn};
use std::time::Duration;

/// Camera permission state reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Limited,
    Denied,
    Unknown,
}

impl PermissionState {
    pub fn allows_capture(self) -> bool {
        matches!(self, Self::Granted | Self::Limited)
    }
}

/// Image payload as handed over by the capture provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapturePayload {
    Bytes(Vec<u8>),
    /// Base64 text, optionally carrying a `data:<mime>;base64,` prefix.
    Base64(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    pub payload: CapturePayload,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureResult {
    Captured(CapturedImage),
    Cancelled,
    Failed(String),
}

/// Camera or file picker.
pub trait CaptureProvider {
    /// Checks and, when needed, requests camera permission.
    fn request_permission(&self) -> PermissionState {
        PermissionState::Unknown
    }

    fn capture(&self) -> CaptureResult;
}

/// Device location source.
pub trait LocationProvider {
    /// Returns the current position, or `None` when unavailable within `timeout`.
    fn current_location(&self, timeout: Duration) -> Option<Coordinates>;
}

/// Location provider for hosts without positioning.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocation;

impl LocationProvider for NoLocation {
    fn current_location(&self, _timeout: Duration) -> Option<Coordinates> {
        None
    }
}

/// Why a capture did not produce a photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotAddedReason {
    Cancelled,
    CaptureFailed(String),
    EmptyCapture,
    TooLarge {
        encoded_len: usize,
        max_encoded_len: usize,
    },
    StoreRejected(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    Added(Outcome<PhotoRecord>),
    NotAdded(NotAddedReason),
}

impl CaptureOutcome {
    pub fn record(&self) -> Option<&PhotoRecord> {
        match self {
            Self::Added(outcome) => Some(outcome.value()),
            Self::NotAdded(_) => None,
        }
    }
}

/// Capture pipeline over borrowed providers.
pub struct CaptureFlow<'a, C: CaptureProvider, L: LocationProvider> {
    camera: &'a C,
    location: &'a L,
    location_timeout: Duration,
}

impl<'a, C: CaptureProvider, L: LocationProvider> CaptureFlow<'a, C, L> {
    pub fn new(camera: &'a C, location: &'a L, location_timeout: Duration) -> Self {
        Self {
            camera,
            location,
            location_timeout,
        }
    }

    /// Captures one photo and adds it to `directory`.
    pub fn take_photo<B: BlobStore, M: MetadataStore>(
        &self,
        directory: &PhotoDirectory<B, M>,
    ) -> CaptureOutcome {
        let permission = self.camera.request_permission();
        if !permission.allows_capture() {
            warn!(
                "event=capture module=capture status=continue permission={:?}",
                permission
            );
        }

        let image = match self.camera.capture() {
            CaptureResult::Captured(image) => image,
            CaptureResult::Cancelled => {
                info!("event=capture module=capture status=cancelled");
                return CaptureOutcome::NotAdded(NotAddedReason::Cancelled);
            }
            CaptureResult::Failed(message) => {
                warn!("event=capture module=capture status=error error={message}");
                return CaptureOutcome::NotAdded(NotAddedReason::CaptureFailed(message));
            }
        };

        let base64_data = encode_payload(&image.payload);
        if base64_data.is_empty() {
            warn!("event=capture module=capture status=error error_code=empty_capture");
            return CaptureOutcome::NotAdded(NotAddedReason::EmptyCapture);
        }

        let coordinates = self
            .location
            .current_location(self.location_timeout)
            .filter(|coordinates| match coordinates.validate() {
                Ok(()) => true,
                Err(err) => {
                    warn!("event=capture module=capture status=continue error_code=invalid_location error={err}");
                    false
                }
            });

        let input = CaptureInput {
            base64_data,
            filename: image.file_name,
            coordinates,
        };
        match directory.add_captured(input) {
            Ok(outcome) => CaptureOutcome::Added(outcome),
            Err(DirectoryError::EmptyCapture) => {
                CaptureOutcome::NotAdded(NotAddedReason::EmptyCapture)
            }
            Err(DirectoryError::CaptureTooLarge {
                encoded_len,
                max_encoded_len,
            }) => CaptureOutcome::NotAdded(NotAddedReason::TooLarge {
                encoded_len,
                max_encoded_len,
            }),
            Err(err) => CaptureOutcome::NotAdded(NotAddedReason::StoreRejected(err.to_string())),
        }
    }
}

/// Returns bare base64 text for a payload.
pub fn encode_payload(payload: &CapturePayload) -> String {
    match payload {
        CapturePayload::Bytes(bytes) => STANDARD.encode(bytes),
        CapturePayload::Base64(text) => strip_data_url_prefix(text).trim().to_string(),
    }
}

/// Strips a leading `data:<mime>;base64,` header when present.
pub fn strip_data_url_prefix(text: &str) -> &str {
    if !text.starts_with("data:") {
        return text;
    }
    match text.find(',') {
        Some(index) => &text[index + 1..],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::{encode_payload, strip_data_url_prefix, CapturePayload};

    #[test]
    fn strips_data_url_header() {
        assert_eq!(strip_data_url_prefix("data:image/jpeg;base64,QUJD"), "QUJD");
        assert_eq!(strip_data_url_prefix("QUJD"), "QUJD");
        assert_eq!(strip_data_url_prefix("data:broken"), "data:broken");
    }

    #[test]
    fn encodes_raw_bytes() {
        assert_eq!(encode_payload(&CapturePayload::Bytes(b"ABC".to_vec())), "QUJD");
        assert_eq!(encode_payload(&CapturePayload::Bytes(Vec::new())), "");
    }
}
