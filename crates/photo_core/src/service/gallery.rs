//! Startup wiring for a device gallery.
//!
//! # Responsibility
//! - Build the SQLite-backed stores and the platform blob strategy from
//!   `GalleryConfig`.
//!
//! # Invariants
//! - Blob and metadata stores share one preferences connection.
//! - The returned directory is not initialized; callers run `initialize()`.

use crate::config::GalleryConfig;
use crate::repo::blob_store::{DisplayUrlBridge, PlatformBlobStore};
use crate::repo::kv_store::SqliteKeyValueStore;
use crate::repo::metadata_store::KvMetadataStore;
use crate::repo::RepoResult;
use crate::service::photo_directory::{DirectoryOptions, PhotoDirectory};
use log::info;
use std::sync::Arc;

/// Shared preferences handle used by the production stores.
pub type SharedKv = Arc<SqliteKeyValueStore>;

/// Photo directory wired to SQLite preferences and the platform blob store.
pub type Gallery = PhotoDirectory<PlatformBlobStore<SharedKv>, KvMetadataStore<SharedKv>>;

/// Opens the stores described by `config`.
///
/// Native display sources are raw `file://` URIs; hosts that need webview
/// URLs use [`open_gallery_with_bridge`].
///
/// # Side effects
/// - Creates `data_dir` when missing.
/// - Opens and migrates the preferences database.
pub fn open_gallery(config: &GalleryConfig) -> RepoResult<Gallery> {
    open_gallery_with_bridge(config, None)
}

/// Like [`open_gallery`], converting native file URIs through `bridge`.
pub fn open_gallery_with_bridge(
    config: &GalleryConfig,
    bridge: Option<Arc<dyn DisplayUrlBridge>>,
) -> RepoResult<Gallery> {
    std::fs::create_dir_all(config.data_dir())?;
    let kv: SharedKv = Arc::new(SqliteKeyValueStore::open(config.preferences_db_path())?);

    let bridged = bridge.is_some();
    let mut blobs =
        PlatformBlobStore::for_platform(config.platform, Arc::clone(&kv), config.files_dir());
    if let Some(bridge) = bridge {
        blobs = blobs.with_display_bridge(bridge);
    }
    let metadata = KvMetadataStore::new(kv);
    let options = DirectoryOptions {
        max_encoded_len: config.max_encoded_len,
    };

    info!(
        "event=gallery_open module=gallery status=ok platform={} max_encoded_len={} bridge={}",
        config.platform.as_str(),
        config.max_encoded_len,
        bridged
    );
    Ok(PhotoDirectory::with_options(blobs, metadata, options))
}
