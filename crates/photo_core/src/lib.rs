//! Core persistence for the photo gallery client.
//!
//! Photos are captured by the UI shell, stored as blobs (inline in key-value
//! preferences or as files, depending on the platform) and indexed by one
//! metadata document. `PhotoDirectory` is the only type the UI talks to.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod outcome;
pub mod repo;
pub mod service;

pub use config::{ConfigError, GalleryConfig, Platform};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::photo::{Coordinates, PhotoId, PhotoRecord, PhotoValidationError};
pub use outcome::{Degradation, DegradationKind, Outcome};
pub use repo::blob_store::{BlobStore, DisplayUrlBridge, PlatformBlobStore, JPEG_DATA_URL_PREFIX};
pub use repo::file_blob::FileBlobStore;
pub use repo::inline_blob::InlineBlobStore;
pub use repo::kv_store::{KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore};
pub use repo::metadata_store::{KvMetadataStore, MetadataStore, PHOTOS_DOCUMENT_KEY};
pub use repo::{RepoError, RepoResult};
pub use service::capture_flow::{
    strip_data_url_prefix, CaptureFlow, CaptureOutcome, CapturePayload, CaptureProvider,
    CaptureResult, CapturedImage, LocationProvider, NoLocation, NotAddedReason, PermissionState,
};
pub use service::gallery::{open_gallery, open_gallery_with_bridge, Gallery};
pub use service::photo_directory::{
    CaptureInput, DirectoryError, DirectoryOptions, PhotoDirectory,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
