//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose gallery operations to Dart via FRB.
//! - Own the one process-level gallery handle between `gallery_open` and
//!   `gallery_close`.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Calls made before `gallery_open` fail with `ok = false` or return empty
//!   results; they never touch storage.

use log::warn;
use photo_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, open_gallery,
    ping as ping_inner, strip_data_url_prefix, CaptureInput, Coordinates, Gallery, GalleryConfig,
    Outcome, PhotoRecord, Platform,
};
use std::sync::{Arc, Mutex, PoisonError};

static GALLERY: Mutex<Option<Arc<Gallery>>> = Mutex::new(None);

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Returns an empty string on success and an error message on failure.
/// Safe to call repeatedly with the same `level + log_dir`.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Photo metadata as seen by Dart.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoItem {
    pub id: String,
    /// Capture time in epoch milliseconds.
    pub captured_at_ms: i64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub liked: bool,
    pub filename: Option<String>,
}

/// List response envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct GalleryListResponse {
    /// Newest first.
    pub items: Vec<PhotoItem>,
    pub message: String,
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryActionResponse {
    /// Whether the action was applied.
    pub ok: bool,
    /// Applied but persisted state may lag behind (e.g. write failed).
    pub degraded: bool,
    /// Affected photo id, when there is one.
    pub photo_id: Option<String>,
    /// Human-readable diagnostics message.
    pub message: String,
}

impl GalleryActionResponse {
    fn from_outcome<T>(outcome: &Outcome<T>, photo_id: Option<String>, message: &str) -> Self {
        match outcome.degradation() {
            None => Self {
                ok: true,
                degraded: false,
                photo_id,
                message: message.to_string(),
            },
            Some(reason) => Self {
                ok: true,
                degraded: true,
                photo_id,
                message: format!("{message} ({reason})"),
            },
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            degraded: false,
            photo_id: None,
            message: message.into(),
        }
    }
}

/// Opens the gallery stored under `data_dir` and loads its photo list.
///
/// `platform` is the host label (`web|android|ios|native`). Reopening closes
/// the previous handle first, even when the new open fails.
#[flutter_rust_bridge::frb(sync)]
pub fn gallery_open(
    data_dir: String,
    platform: String,
    max_encoded_len: Option<u32>,
) -> GalleryActionResponse {
    let platform = match Platform::parse(&platform) {
        Ok(platform) => platform,
        Err(err) => return GalleryActionResponse::failure(format!("gallery_open failed: {err}")),
    };
    let data_dir = data_dir.trim();
    if data_dir.is_empty() {
        return GalleryActionResponse::failure("gallery_open failed: data_dir is empty");
    }

    let mut config = GalleryConfig::new(data_dir, platform);
    if let Some(limit) = max_encoded_len.filter(|limit| *limit > 0) {
        config.max_encoded_len = limit as usize;
    }

    let mut slot = lock_gallery();
    if let Some(previous) = slot.take() {
        previous.close();
    }

    let gallery = match open_gallery(&config) {
        Ok(gallery) => gallery,
        Err(err) => return GalleryActionResponse::failure(format!("gallery_open failed: {err}")),
    };
    let loaded = gallery.initialize();
    let message = format!("Loaded {} photo(s).", loaded.value());
    *slot = Some(Arc::new(gallery));
    GalleryActionResponse::from_outcome(&loaded, None, &message)
}

/// Releases the gallery handle.
#[flutter_rust_bridge::frb(sync)]
pub fn gallery_close() -> GalleryActionResponse {
    match lock_gallery().take() {
        Some(gallery) => {
            gallery.close();
            GalleryActionResponse::from_outcome(&Outcome::Complete(()), None, "Gallery closed.")
        }
        None => GalleryActionResponse::failure("gallery is not open"),
    }
}

/// Lists all photos, newest first.
#[flutter_rust_bridge::frb(sync)]
pub fn gallery_list() -> GalleryListResponse {
    list_response(|gallery| gallery.list())
}

/// Lists photos carrying coordinates, for the map view.
#[flutter_rust_bridge::frb(sync)]
pub fn gallery_geotagged() -> GalleryListResponse {
    list_response(|gallery| gallery.geotagged())
}

/// Adds one captured photo.
///
/// `base64_data` may carry a `data:image/...;base64,` prefix. Coordinates are
/// only recorded when both are provided.
#[flutter_rust_bridge::frb(sync)]
pub fn gallery_add_photo(
    base64_data: String,
    filename: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> GalleryActionResponse {
    let Some(gallery) = current_gallery() else {
        return GalleryActionResponse::failure("gallery is not open");
    };

    let mut input = CaptureInput::new(strip_data_url_prefix(&base64_data));
    input.filename = filename.filter(|name| !name.trim().is_empty());
    if let (Some(latitude), Some(longitude)) = (latitude, longitude) {
        input.coordinates = Some(Coordinates::new(latitude, longitude));
    }

    match gallery.add_captured(input) {
        Ok(outcome) => {
            let id = outcome.value().id.clone();
            GalleryActionResponse::from_outcome(&outcome, Some(id), "Photo added.")
        }
        Err(err) => {
            warn!("event=ffi_add_photo module=ffi status=error error={err}");
            GalleryActionResponse::failure(format!("No photo was added: {err}"))
        }
    }
}

/// Flips the liked flag of one photo.
#[flutter_rust_bridge::frb(sync)]
pub fn gallery_toggle_like(photo_id: String) -> GalleryActionResponse {
    let Some(gallery) = current_gallery() else {
        return GalleryActionResponse::failure("gallery is not open");
    };
    let outcome = gallery.toggle_liked(photo_id.trim());
    let message = match outcome.value() {
        Some(true) => "Photo liked.",
        Some(false) => "Photo unliked.",
        None => "Photo not found.",
    };
    GalleryActionResponse::from_outcome(&outcome, Some(photo_id), message)
}

/// Deletes one photo and its bytes.
#[flutter_rust_bridge::frb(sync)]
pub fn gallery_remove(photo_id: String) -> GalleryActionResponse {
    let Some(gallery) = current_gallery() else {
        return GalleryActionResponse::failure("gallery is not open");
    };
    let outcome = gallery.remove(photo_id.trim());
    let message = if *outcome.value() {
        "Photo deleted."
    } else {
        "Photo not found."
    };
    GalleryActionResponse::from_outcome(&outcome, Some(photo_id), message)
}

/// Deletes every photo and its bytes.
#[flutter_rust_bridge::frb(sync)]
pub fn gallery_clear_all() -> GalleryActionResponse {
    let Some(gallery) = current_gallery() else {
        return GalleryActionResponse::failure("gallery is not open");
    };
    let outcome = gallery.clear_all();
    let message = format!("Deleted {} photo(s).", outcome.value());
    GalleryActionResponse::from_outcome(&outcome, None, &message)
}

/// Returns an image source for `photo_id`, or an empty string.
///
/// Native galleries return `file://` URIs; the Dart side loads them as files.
#[flutter_rust_bridge::frb(sync)]
pub fn gallery_photo_src(photo_id: String) -> String {
    current_gallery()
        .and_then(|gallery| {
            gallery
                .find_by_id(photo_id.trim())
                .map(|record| gallery.resolve_display_src(&record))
        })
        .unwrap_or_default()
}

fn lock_gallery() -> std::sync::MutexGuard<'static, Option<Arc<Gallery>>> {
    GALLERY.lock().unwrap_or_else(PoisonError::into_inner)
}

fn current_gallery() -> Option<Arc<Gallery>> {
    lock_gallery().clone()
}

fn list_response(select: impl FnOnce(&Gallery) -> Vec<PhotoRecord>) -> GalleryListResponse {
    let Some(gallery) = current_gallery() else {
        return GalleryListResponse {
            items: Vec::new(),
            message: "gallery is not open".to_string(),
        };
    };
    let items = select(&gallery)
        .into_iter()
        .map(to_photo_item)
        .collect::<Vec<_>>();
    let message = if items.is_empty() {
        "No photos.".to_string()
    } else {
        format!("{} photo(s).", items.len())
    };
    GalleryListResponse { items, message }
}

fn to_photo_item(record: PhotoRecord) -> PhotoItem {
    PhotoItem {
        id: record.id,
        captured_at_ms: record.captured_at,
        latitude: record.latitude,
        longitude: record.longitude,
        liked: record.liked,
        filename: record.filename,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        core_version, gallery_add_photo, gallery_clear_all, gallery_close, gallery_geotagged,
        gallery_list, gallery_open, gallery_photo_src, gallery_remove, gallery_toggle_like,
        current_gallery, init_logging, ping,
    };
    use std::sync::Mutex;

    // Gallery tests share the process-level handle.
    static GALLERY_TEST_LOCK: Mutex<()> = Mutex::new(());

    const TINY_JPEG_BASE64: &str = "/9j/4AAQSkZJRgABAQAAAQABAAD/2wBDAP//////////////////////////////////////////////////////////////////////////////////////wgALCAABAAEBAREA/8QAFBABAAAAAAAAAAAAAAAAAAAAAP/aAAgBAQABPxA=";

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn gallery_open_rejects_unknown_platform() {
        let response = gallery_open("/tmp".to_string(), "symbian".to_string(), None);
        assert!(!response.ok);
        assert!(response.message.contains("unsupported platform"));
    }

    #[test]
    fn calls_before_open_fail_softly() {
        let _guard = GALLERY_TEST_LOCK.lock().unwrap();
        gallery_close();

        assert!(gallery_list().items.is_empty());
        assert!(!gallery_toggle_like("x".to_string()).ok);
        assert!(!gallery_add_photo(TINY_JPEG_BASE64.to_string(), None, None, None).ok);
        assert_eq!(gallery_photo_src("x".to_string()), "");
    }

    #[test]
    fn native_gallery_lifecycle() {
        let _guard = GALLERY_TEST_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().to_str().unwrap().to_string();

        let opened = gallery_open(data_dir.clone(), "android".to_string(), None);
        assert!(opened.ok, "{}", opened.message);

        let added = gallery_add_photo(
            format!("data:image/jpeg;base64,{TINY_JPEG_BASE64}"),
            Some("beach.jpg".to_string()),
            Some(48.85),
            Some(2.35),
        );
        assert!(added.ok, "{}", added.message);
        let photo_id = added.photo_id.expect("added photo id");

        let listed = gallery_list();
        assert_eq!(listed.items.len(), 1);
        assert_eq!(listed.items[0].id, photo_id);
        assert_eq!(gallery_geotagged().items.len(), 1);
        assert!(gallery_photo_src(photo_id.clone()).starts_with("file://"));

        let liked = gallery_toggle_like(photo_id.clone());
        assert_eq!(liked.message, "Photo liked.");

        gallery_close();
        let reopened = gallery_open(data_dir, "android".to_string(), None);
        assert_eq!(reopened.message, "Loaded 1 photo(s).");
        assert!(gallery_list().items[0].liked);

        assert!(gallery_remove(photo_id.clone()).ok);
        assert_eq!(gallery_remove(photo_id).message, "Photo not found.");
        assert_eq!(gallery_clear_all().message, "Deleted 0 photo(s).");
        gallery_close();
    }

    #[test]
    fn reopening_closes_previous_gallery() {
        let _guard = GALLERY_TEST_LOCK.lock().unwrap();
        let first_dir = tempfile::tempdir().unwrap();
        let second_dir = tempfile::tempdir().unwrap();

        let opened = gallery_open(
            first_dir.path().to_str().unwrap().to_string(),
            "web".to_string(),
            None,
        );
        assert!(opened.ok, "{}", opened.message);
        assert!(gallery_add_photo(TINY_JPEG_BASE64.to_string(), None, None, None).ok);
        let previous = current_gallery().expect("open gallery");

        let reopened = gallery_open(
            second_dir.path().to_str().unwrap().to_string(),
            "web".to_string(),
            None,
        );
        assert!(reopened.ok, "{}", reopened.message);
        assert!(!previous.is_initialized());
        assert!(previous.is_empty());
        assert!(gallery_list().items.is_empty());
        gallery_close();
    }

    #[test]
    fn web_gallery_rejects_oversized_capture() {
        let _guard = GALLERY_TEST_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();

        let opened = gallery_open(
            dir.path().to_str().unwrap().to_string(),
            "web".to_string(),
            Some(16),
        );
        assert!(opened.ok, "{}", opened.message);

        let rejected = gallery_add_photo(TINY_JPEG_BASE64.to_string(), None, None, None);
        assert!(!rejected.ok);
        assert!(rejected.message.contains("too large"));
        assert!(gallery_list().items.is_empty());
        gallery_close();
    }
}
