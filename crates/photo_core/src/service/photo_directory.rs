//! Photo directory use-case service.
//!
//! # Responsibility
//! - Own the in-memory photo list and serve snapshots of it to callers.
//! - Sequence blob and metadata store calls for every mutation.
//! - Derive display sources for records.
//!
//! # Invariants
//! - Ids are unique within the list; the list is ordered newest first.
//!   Duplicates found in a loaded document are dropped, keeping the first.
//! - A record is only added after its bytes were accepted by the blob store.
//! - Mutations hold one lock across the whole blob + metadata sequence, so
//!   concurrent callers are applied one after another and the last persisted
//!   list reflects every applied mutation.
//! - Unknown ids are silent no-ops.

use crate::config::DEFAULT_MAX_ENCODED_LEN;
use crate::model::photo::{
    new_photo_id, now_epoch_ms, Coordinates, PhotoRecord, PhotoValidationError,
};
use crate::outcome::{DegradationKind, Outcome};
use crate::repo::blob_store::BlobStore;
use crate::repo::metadata_store::MetadataStore;
use crate::repo::RepoError;
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, MutexGuard, PoisonError};

static UNSAFE_FILENAME_CHARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("valid filename regex"));
static DOT_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{2,}").expect("valid dot regex"));

const DEFAULT_EXTENSION: &str = "jpeg";

/// Failures the caller must be told about. Nothing was changed.
#[derive(Debug)]
pub enum DirectoryError {
    /// Capture payload is empty.
    EmptyCapture,
    /// Capture exceeds the configured base64 ceiling.
    CaptureTooLarge {
        encoded_len: usize,
        max_encoded_len: usize,
    },
    /// Record fails validation.
    InvalidRecord(PhotoValidationError),
    /// Blob store rejected the bytes.
    BlobSave(RepoError),
    /// Blob store returned an unusable reference.
    UnusableBlobRef,
}

impl Display for DirectoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyCapture => write!(f, "capture contains no image data"),
            Self::CaptureTooLarge {
                encoded_len,
                max_encoded_len,
            } => write!(
                f,
                "capture is too large ({encoded_len} encoded chars, limit {max_encoded_len})"
            ),
            Self::InvalidRecord(err) => write!(f, "{err}"),
            Self::BlobSave(err) => write!(f, "failed to store photo bytes: {err}"),
            Self::UnusableBlobRef => write!(f, "blob store returned an empty reference"),
        }
    }
}

impl Error for DirectoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidRecord(err) => Some(err),
            Self::BlobSave(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PhotoValidationError> for DirectoryError {
    fn from(value: PhotoValidationError) -> Self {
        Self::InvalidRecord(value)
    }
}

/// Producer-side policy applied before any store write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryOptions {
    pub max_encoded_len: usize,
}

impl Default for DirectoryOptions {
    fn default() -> Self {
        Self {
            max_encoded_len: DEFAULT_MAX_ENCODED_LEN,
        }
    }
}

/// One captured image ready to be added.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureInput {
    /// Base64 text without a `data:` prefix.
    pub base64_data: String,
    /// Suggested file name; sanitized and prefixed with the record id.
    pub filename: Option<String>,
    pub coordinates: Option<Coordinates>,
}

impl CaptureInput {
    pub fn new(base64_data: impl Into<String>) -> Self {
        Self {
            base64_data: base64_data.into(),
            filename: None,
            coordinates: None,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_coordinates(mut self, coordinates: Coordinates) -> Self {
        self.coordinates = Some(coordinates);
        self
    }
}

#[derive(Default)]
struct DirectoryState {
    photos: Vec<PhotoRecord>,
    initialized: bool,
}

/// The gallery's single entry point for photo CRUD.
pub struct PhotoDirectory<B: BlobStore, M: MetadataStore> {
    blobs: B,
    metadata: M,
    options: DirectoryOptions,
    state: Mutex<DirectoryState>,
}

impl<B: BlobStore, M: MetadataStore> PhotoDirectory<B, M> {
    /// Creates an empty, not yet initialized directory.
    pub fn new(blobs: B, metadata: M) -> Self {
        Self::with_options(blobs, metadata, DirectoryOptions::default())
    }

    pub fn with_options(blobs: B, metadata: M, options: DirectoryOptions) -> Self {
        Self {
            blobs,
            metadata,
            options,
            state: Mutex::new(DirectoryState::default()),
        }
    }

    pub fn options(&self) -> DirectoryOptions {
        self.options
    }

    pub fn blob_store(&self) -> &B {
        &self.blobs
    }

    // A poisoned lock still guards a structurally valid list; keep serving it.
    fn lock(&self) -> MutexGuard<'_, DirectoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Loads the persisted list, replacing the cache.
    ///
    /// Returns the number of loaded records; corrupt or unreadable documents
    /// load as empty and are reported as degraded.
    pub fn initialize(&self) -> Outcome<usize> {
        let mut state = self.lock();
        let loaded = self.metadata.load();
        let degraded = loaded.degradation().cloned();
        let (photos, dropped) = dedupe_by_id(loaded.into_value());
        state.photos = photos;
        state.initialized = true;
        let count = state.photos.len();

        if dropped > 0 {
            warn!(
                "event=directory_init module=directory status=degraded error_code=duplicate_ids dropped={}",
                dropped
            );
        }
        info!(
            "event=directory_init module=directory status={} count={}",
            if degraded.is_some() || dropped > 0 { "degraded" } else { "ok" },
            count
        );
        let outcome = match degraded {
            None => Outcome::Complete(count),
            Some(reason) => Outcome::Degraded {
                value: count,
                reason,
            },
        };
        if dropped == 0 {
            return outcome;
        }
        outcome.merge(&Outcome::degraded(
            (),
            DegradationKind::DuplicateIds,
            format!("dropped {dropped} record(s) with an already listed id"),
        ))
    }

    /// Drops the cache; the directory behaves as empty until re-initialized.
    pub fn close(&self) {
        let mut state = self.lock();
        state.photos.clear();
        state.initialized = false;
        info!("event=directory_close module=directory status=ok");
    }

    pub fn is_initialized(&self) -> bool {
        self.lock().initialized
    }

    /// Snapshot of the list, newest first.
    pub fn list(&self) -> Vec<PhotoRecord> {
        self.lock().photos.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().photos.is_empty()
    }

    pub fn find_by_id(&self, id: &str) -> Option<PhotoRecord> {
        self.lock().photos.iter().find(|photo| photo.id == id).cloned()
    }

    /// Liked records, in list order.
    pub fn liked(&self) -> Vec<PhotoRecord> {
        self.lock()
            .photos
            .iter()
            .filter(|photo| photo.liked)
            .cloned()
            .collect()
    }

    /// Records carrying both coordinates, in list order.
    pub fn geotagged(&self) -> Vec<PhotoRecord> {
        self.lock()
            .photos
            .iter()
            .filter(|photo| photo.is_geotagged())
            .cloned()
            .collect()
    }

    /// Stores a capture and prepends its record.
    ///
    /// # Errors
    /// - `EmptyCapture` / `CaptureTooLarge` before any store write.
    /// - `InvalidRecord` for out-of-range coordinates.
    /// - `BlobSave` / `UnusableBlobRef` when the bytes were not stored.
    ///
    /// A degraded outcome means the record is in the list but the metadata
    /// document could not be written.
    pub fn add_captured(&self, input: CaptureInput) -> Result<Outcome<PhotoRecord>, DirectoryError> {
        let base64_data = input.base64_data.trim();
        if base64_data.is_empty() {
            return Err(DirectoryError::EmptyCapture);
        }
        if base64_data.len() > self.options.max_encoded_len {
            warn!(
                "event=photo_add module=directory status=rejected error_code=capture_too_large encoded_len={} limit={}",
                base64_data.len(),
                self.options.max_encoded_len
            );
            return Err(DirectoryError::CaptureTooLarge {
                encoded_len: base64_data.len(),
                max_encoded_len: self.options.max_encoded_len,
            });
        }

        let mut state = self.lock();
        let mut id = new_photo_id();
        while state.photos.iter().any(|photo| photo.id == id) {
            id = new_photo_id();
        }

        let filename = blob_filename(&id, input.filename.as_deref());
        let mut record = PhotoRecord {
            id,
            blob_ref: None,
            display_hint: None,
            captured_at: now_epoch_ms(),
            latitude: None,
            longitude: None,
            liked: false,
            filename: Some(filename.clone()),
        };
        record.set_coordinates(input.coordinates);
        record.validate()?;

        let blob_ref = self
            .blobs
            .save(&record.id, base64_data, &filename)
            .map_err(|err| {
                warn!(
                    "event=photo_add module=directory status=error error_code=blob_save_failed id={} error={}",
                    record.id, err
                );
                DirectoryError::BlobSave(err)
            })?;
        if blob_ref.trim().is_empty() {
            return Err(DirectoryError::UnusableBlobRef);
        }
        record.blob_ref = Some(blob_ref);

        state.photos.insert(0, record.clone());
        let persisted = self.metadata.save(&state.photos);
        info!(
            "event=photo_add module=directory status={} id={} geotagged={} count={}",
            status_label(&persisted),
            record.id,
            record.is_geotagged(),
            state.photos.len()
        );
        Ok(persisted.map(|()| record))
    }

    /// Flips `liked` and persists; returns the new value, `None` if unknown.
    pub fn toggle_liked(&self, id: &str) -> Outcome<Option<bool>> {
        let mut state = self.lock();
        let Some(photo) = state.photos.iter_mut().find(|photo| photo.id == id) else {
            return Outcome::Complete(None);
        };
        photo.liked = !photo.liked;
        let liked = photo.liked;

        let persisted = self.metadata.save(&state.photos);
        info!(
            "event=photo_like module=directory status={} id={} liked={}",
            status_label(&persisted),
            id,
            liked
        );
        persisted.map(|()| Some(liked))
    }

    /// Replaces the record with the same id, keeping its position.
    ///
    /// Returns `false` when the id is unknown.
    pub fn replace(&self, record: PhotoRecord) -> Result<Outcome<bool>, DirectoryError> {
        record.validate()?;

        let mut state = self.lock();
        let Some(slot) = state.photos.iter_mut().find(|photo| photo.id == record.id) else {
            return Ok(Outcome::Complete(false));
        };
        *slot = record;

        let persisted = self.metadata.save(&state.photos);
        info!(
            "event=photo_replace module=directory status={}",
            status_label(&persisted)
        );
        Ok(persisted.map(|()| true))
    }

    /// Deletes a record and, best-effort, its blob.
    ///
    /// Returns `false` when the id is unknown.
    pub fn remove(&self, id: &str) -> Outcome<bool> {
        let mut state = self.lock();
        let Some(index) = state.photos.iter().position(|photo| photo.id == id) else {
            return Outcome::Complete(false);
        };

        let removed = state.photos.remove(index);
        let blob_deleted = match removed.blob_ref.as_deref() {
            Some(blob_ref) => self.blobs.delete(blob_ref),
            None => Outcome::Complete(()),
        };
        let persisted = self.metadata.save(&state.photos);
        let outcome = Outcome::Complete(true).merge(&blob_deleted).merge(&persisted);

        info!(
            "event=photo_remove module=directory status={} id={} count={}",
            status_label(&outcome),
            id,
            state.photos.len()
        );
        outcome
    }

    /// Deletes every record and blob; returns how many records were removed.
    pub fn clear_all(&self) -> Outcome<usize> {
        let mut state = self.lock();
        let removed = std::mem::take(&mut state.photos);

        let mut outcome = Outcome::Complete(removed.len());
        for blob_ref in removed.iter().filter_map(|photo| photo.blob_ref.as_deref()) {
            outcome = outcome.merge(&self.blobs.delete(blob_ref));
        }
        outcome = outcome.merge(&self.metadata.save(&state.photos));

        info!(
            "event=photo_clear module=directory status={} removed={}",
            status_label(&outcome),
            removed.len()
        );
        outcome
    }

    /// Returns a display source for `record`, or `""` when none is available.
    pub fn resolve_display_src(&self, record: &PhotoRecord) -> String {
        if let Some(hint) = record.display_hint.as_deref().filter(|hint| !hint.is_empty()) {
            return hint.to_string();
        }
        record
            .blob_ref
            .as_deref()
            .and_then(|blob_ref| self.blobs.resolve_display_url(blob_ref))
            .unwrap_or_default()
    }
}

/// Builds the on-disk name for a capture: `<id>.jpeg` or `<id>-<name>`.
pub fn blob_filename(id: &str, suggested: Option<&str>) -> String {
    let sanitized = suggested
        .map(|name| {
            let replaced = UNSAFE_FILENAME_CHARS_RE.replace_all(name.trim(), "_");
            let collapsed = DOT_RUN_RE.replace_all(&replaced, ".");
            collapsed.trim_matches(|c| c == '.' || c == '_').to_string()
        })
        .unwrap_or_default();

    if sanitized.is_empty() {
        return format!("{id}.{DEFAULT_EXTENSION}");
    }
    if sanitized.contains('.') {
        format!("{id}-{sanitized}")
    } else {
        format!("{id}-{sanitized}.{DEFAULT_EXTENSION}")
    }
}

// Keeps the first occurrence of each id, i.e. the newest record.
fn dedupe_by_id(photos: Vec<PhotoRecord>) -> (Vec<PhotoRecord>, usize) {
    let total = photos.len();
    let mut seen = HashSet::with_capacity(total);
    let unique: Vec<PhotoRecord> = photos
        .into_iter()
        .filter(|photo| seen.insert(photo.id.clone()))
        .collect();
    let dropped = total - unique.len();
    (unique, dropped)
}

fn status_label<T>(outcome: &Outcome<T>) -> &'static str {
    if outcome.is_degraded() {
        "degraded"
    } else {
        "ok"
    }
}

#[cfg(test)]
mod tests {
    use super::blob_filename;
    use crate::repo::blob_store::validate_blob_filename;

    #[test]
    fn blob_filename_defaults_to_id_jpeg() {
        assert_eq!(blob_filename("abc", None), "abc.jpeg");
        assert_eq!(blob_filename("abc", Some("  ")), "abc.jpeg");
    }

    #[test]
    fn blob_filename_sanitizes_suggested_name() {
        assert_eq!(blob_filename("abc", Some("my photo.png")), "abc-my_photo.png");
        assert_eq!(blob_filename("abc", Some("../../etc/passwd")), "abc-etc_passwd.jpeg");
        assert_eq!(blob_filename("abc", Some("beach")), "abc-beach.jpeg");
    }

    #[test]
    fn blob_filename_never_yields_path_components() {
        for hostile in ["../x", "..\\..\\x", "a/../../b.jpg", "....", "/etc/", "x\0y", "..."] {
            let name = blob_filename("abc", Some(hostile));
            assert!(validate_blob_filename(&name).is_ok(), "{hostile} -> {name}");
            assert!(name.starts_with("abc"));
        }
    }
}
