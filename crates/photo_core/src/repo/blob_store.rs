//! Blob store contract and platform strategy selection.
//!
//! # Responsibility
//! - Store, resolve and delete one photo's encoded bytes by opaque reference.
//! - Pick the inline or filesystem strategy once, from `Platform`.
//!
//! # Invariants
//! - `resolve_display_url` and `delete` never return errors; unresolvable
//!   references yield `None`, failed deletes yield a degraded outcome.
//! - Size ceilings are enforced by producers before `save`, not here.

use super::file_blob::FileBlobStore;
use super::inline_blob::InlineBlobStore;
use super::kv_store::KeyValueStore;
use super::{RepoError, RepoResult};
use crate::config::Platform;
use crate::outcome::Outcome;
use std::path::PathBuf;
use std::sync::Arc;

/// Prefix turning bare base64 JPEG text into a displayable data URL.
pub const JPEG_DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// Byte storage for captured photos.
pub trait BlobStore: Send + Sync {
    /// Stores base64 text for `owner_id` and returns an opaque reference.
    fn save(&self, owner_id: &str, base64_data: &str, filename: &str) -> RepoResult<String>;

    /// Returns an image source usable by the rendering surface.
    fn resolve_display_url(&self, blob_ref: &str) -> Option<String>;

    /// Best-effort removal of the bytes behind `blob_ref`.
    fn delete(&self, blob_ref: &str) -> Outcome<()>;
}

/// Converts a native file URI into a webview-loadable URL.
pub trait DisplayUrlBridge: Send + Sync {
    /// Returns `None` when the bridge cannot convert the URI.
    fn convert_file_src(&self, file_uri: &str) -> Option<String>;
}

/// Blob store selected for the running platform.
pub enum PlatformBlobStore<K: KeyValueStore> {
    Inline(InlineBlobStore<K>),
    Filesystem(FileBlobStore),
}

impl<K: KeyValueStore> PlatformBlobStore<K> {
    /// Builds the strategy for `platform`.
    ///
    /// `kv` backs inline blobs; `files_dir` hosts file blobs. The unused one
    /// is dropped.
    pub fn for_platform(platform: Platform, kv: K, files_dir: impl Into<PathBuf>) -> Self {
        match platform {
            Platform::Constrained => Self::Inline(InlineBlobStore::new(kv)),
            Platform::FilesystemCapable => Self::Filesystem(FileBlobStore::new(files_dir)),
        }
    }

    /// Routes file display sources through `bridge`; inline stores ignore it.
    pub fn with_display_bridge(self, bridge: Arc<dyn DisplayUrlBridge>) -> Self {
        match self {
            Self::Filesystem(store) => Self::Filesystem(store.with_bridge(bridge)),
            inline @ Self::Inline(_) => inline,
        }
    }

    pub fn platform(&self) -> Platform {
        match self {
            Self::Inline(_) => Platform::Constrained,
            Self::Filesystem(_) => Platform::FilesystemCapable,
        }
    }
}

impl<K: KeyValueStore> BlobStore for PlatformBlobStore<K> {
    fn save(&self, owner_id: &str, base64_data: &str, filename: &str) -> RepoResult<String> {
        match self {
            Self::Inline(store) => store.save(owner_id, base64_data, filename),
            Self::Filesystem(store) => store.save(owner_id, base64_data, filename),
        }
    }

    fn resolve_display_url(&self, blob_ref: &str) -> Option<String> {
        match self {
            Self::Inline(store) => store.resolve_display_url(blob_ref),
            Self::Filesystem(store) => store.resolve_display_url(blob_ref),
        }
    }

    fn delete(&self, blob_ref: &str) -> Outcome<()> {
        match self {
            Self::Inline(store) => store.delete(blob_ref),
            Self::Filesystem(store) => store.delete(blob_ref),
        }
    }
}

/// Rejects filenames that could escape the blob directory.
pub(crate) fn validate_blob_filename(filename: &str) -> RepoResult<()> {
    let trimmed = filename.trim();
    if trimmed.is_empty() {
        return Err(RepoError::InvalidInput("blob filename is empty".to_string()));
    }
    if trimmed.contains(['/', '\\', '\0']) || trimmed == "." || trimmed.contains("..") {
        return Err(RepoError::InvalidInput(format!(
            "blob filename `{trimmed}` must be a plain file name"
        )));
    }
    Ok(())
}
