//! Photo metadata model.
//!
//! # Responsibility
//! - Define the record shape stored in the metadata document.
//! - Validate coordinates and identity before persistence.
//!
//! # Invariants
//! - `id` is non-empty and never reused for another photo.
//! - `latitude` and `longitude` are either both set or both absent.
//! - `captured_at` is Unix epoch milliseconds.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable identifier for one captured photo.
pub type PhotoId = String;

/// Geographic position attached to a capture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Checks that both components are finite and within WGS84 bounds.
    pub fn validate(&self) -> Result<(), PhotoValidationError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(PhotoValidationError::LatitudeOutOfRange(self.latitude));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(PhotoValidationError::LongitudeOutOfRange(self.longitude));
        }
        Ok(())
    }
}

/// Metadata for one photo in the gallery.
///
/// Serialized with camelCase keys; optional fields are omitted when absent so
/// documents written by older builds keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoRecord {
    pub id: PhotoId,
    /// Opaque reference understood by the blob store that wrote it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_ref: Option<String>,
    /// Pre-resolved display source. Only legacy documents carry one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_hint: Option<String>,
    pub captured_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub liked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl PhotoRecord {
    /// Creates a record with a generated id, captured now.
    pub fn new(blob_ref: impl Into<String>) -> Self {
        Self::with_id(new_photo_id(), blob_ref, now_epoch_ms())
    }

    /// Creates a record with caller-provided identity and capture time.
    ///
    /// Used by import paths and tests where the id already exists.
    pub fn with_id(id: impl Into<PhotoId>, blob_ref: impl Into<String>, captured_at: i64) -> Self {
        Self {
            id: id.into(),
            blob_ref: Some(blob_ref.into()),
            display_hint: None,
            captured_at,
            latitude: None,
            longitude: None,
            liked: false,
            filename: None,
        }
    }

    /// Returns coordinates when both components are present.
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates::new(latitude, longitude)),
            _ => None,
        }
    }

    pub fn set_coordinates(&mut self, coordinates: Option<Coordinates>) {
        self.latitude = coordinates.map(|value| value.latitude);
        self.longitude = coordinates.map(|value| value.longitude);
    }

    pub fn is_geotagged(&self) -> bool {
        self.coordinates().is_some()
    }

    /// Validates record invariants.
    ///
    /// # Errors
    /// - `EmptyId` when `id` is blank.
    /// - `PartialCoordinates` when only one of latitude/longitude is set.
    /// - `LatitudeOutOfRange` / `LongitudeOutOfRange` for non-finite or
    ///   out-of-range values.
    pub fn validate(&self) -> Result<(), PhotoValidationError> {
        if self.id.trim().is_empty() {
            return Err(PhotoValidationError::EmptyId);
        }

        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => {
                Coordinates::new(latitude, longitude).validate()?;
            }
            (None, None) => {}
            _ => return Err(PhotoValidationError::PartialCoordinates),
        }

        Ok(())
    }
}

/// Record validation failures.
#[derive(Debug, Clone, PartialEq)]
pub enum PhotoValidationError {
    EmptyId,
    PartialCoordinates,
    LatitudeOutOfRange(f64),
    LongitudeOutOfRange(f64),
}

impl Display for PhotoValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "photo id must not be empty"),
            Self::PartialCoordinates => {
                write!(f, "latitude and longitude must be set together")
            }
            Self::LatitudeOutOfRange(value) => {
                write!(f, "latitude {value} is outside [-90, 90]")
            }
            Self::LongitudeOutOfRange(value) => {
                write!(f, "longitude {value} is outside [-180, 180]")
            }
        }
    }
}

impl Error for PhotoValidationError {}

/// Generates a fresh random photo id.
pub fn new_photo_id() -> PhotoId {
    Uuid::new_v4().to_string()
}

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as i64)
}
