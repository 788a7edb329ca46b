//! Filesystem blob storage for native environments.
//!
//! # Responsibility
//! - Decode base64 payloads and write them to `<files dir>/photos/<filename>`.
//! - Hand back `file://` URIs as blob references.
//! - Resolve and delete blobs strictly inside the files directory.
//!
//! # Invariants
//! - No read or delete touches a path outside the files directory.
//! - A reference whose file no longer exists resolves to `None`.

use super::blob_store::{validate_blob_filename, BlobStore, DisplayUrlBridge};
use super::{RepoError, RepoResult};
use crate::logging::blob_ref_label;
use crate::outcome::{DegradationKind, Outcome};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Subdirectory of the files directory holding photo blobs.
pub const PHOTOS_DIR_NAME: &str = "photos";
const FILE_URI_SCHEME: &str = "file://";

// Captures the part after the last `/files/` segment of a native URI.
static FILES_SEGMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^.*/files/(.+)$").expect("valid files segment regex"));

/// Blob store writing discrete files under an application-private directory.
pub struct FileBlobStore {
    files_dir: PathBuf,
    bridge: Option<Arc<dyn DisplayUrlBridge>>,
}

impl FileBlobStore {
    pub fn new(files_dir: impl Into<PathBuf>) -> Self {
        Self {
            files_dir: files_dir.into(),
            bridge: None,
        }
    }

    /// Attaches a bridge converting file URIs into webview URLs.
    pub fn with_bridge(mut self, bridge: Arc<dyn DisplayUrlBridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    pub fn files_dir(&self) -> &Path {
        &self.files_dir
    }

    // Canonical root so URIs and containment checks agree across symlinks.
    fn root(&self) -> PathBuf {
        std::fs::canonicalize(&self.files_dir).unwrap_or_else(|_| self.files_dir.clone())
    }

    /// Maps a reference to a local path inside the files directory.
    fn local_path(&self, root: &Path, blob_ref: &str) -> Option<PathBuf> {
        let raw = blob_ref.strip_prefix(FILE_URI_SCHEME).unwrap_or(blob_ref);
        if raw.trim().is_empty() {
            return None;
        }
        let path = Path::new(raw);
        let resolved = if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        };
        is_confined(root, &resolved).then_some(resolved)
    }

    fn delete_candidates(&self, root: &Path, blob_ref: &str) -> Vec<PathBuf> {
        let mut candidates = Vec::with_capacity(2);
        if let Some(relative) = derive_relative_path(blob_ref) {
            let derived = root.join(relative);
            if is_confined(root, &derived) {
                candidates.push(derived);
            }
        }
        if let Some(fallback) = self.local_path(root, blob_ref) {
            if !candidates.contains(&fallback) {
                candidates.push(fallback);
            }
        }
        candidates
    }
}

impl BlobStore for FileBlobStore {
    fn save(&self, owner_id: &str, base64_data: &str, filename: &str) -> RepoResult<String> {
        validate_blob_filename(filename)?;
        let bytes = STANDARD.decode(base64_data.trim())?;
        if bytes.is_empty() {
            return Err(RepoError::InvalidInput("blob payload is empty".to_string()));
        }

        let photos_dir = self.files_dir.join(PHOTOS_DIR_NAME);
        std::fs::create_dir_all(&photos_dir)?;
        let path = std::fs::canonicalize(&photos_dir)?.join(filename.trim());
        std::fs::write(&path, &bytes)?;

        info!(
            "event=blob_save module=blob status=ok backend=file owner_id={} file={} bytes={}",
            owner_id,
            filename.trim(),
            bytes.len()
        );
        Ok(format!("{FILE_URI_SCHEME}{}", path.display()))
    }

    fn resolve_display_url(&self, blob_ref: &str) -> Option<String> {
        let root = self.root();
        let path = self.local_path(&root, blob_ref)?;
        if !path.is_file() {
            debug!(
                "event=blob_resolve module=blob status=missing backend=file file={}",
                blob_ref_label(blob_ref)
            );
            return None;
        }

        let converted = self
            .bridge
            .as_ref()
            .and_then(|bridge| bridge.convert_file_src(blob_ref));
        Some(converted.unwrap_or_else(|| blob_ref.to_string()))
    }

    fn delete(&self, blob_ref: &str) -> Outcome<()> {
        if blob_ref.trim().is_empty() {
            return Outcome::Complete(());
        }

        let root = self.root();
        let candidates = self.delete_candidates(&root, blob_ref);
        if candidates.is_empty() {
            warn!(
                "event=blob_delete module=blob status=degraded backend=file error_code=path_not_derivable file={}",
                blob_ref_label(blob_ref)
            );
            return Outcome::degraded(
                (),
                DegradationKind::BlobDeleteFailed,
                "blob reference does not resolve inside the files directory",
            );
        }

        let mut last_error = None;
        for candidate in &candidates {
            match std::fs::remove_file(candidate) {
                Ok(()) => {
                    info!(
                        "event=blob_delete module=blob status=ok backend=file file={}",
                        blob_ref_label(blob_ref)
                    );
                    return Outcome::Complete(());
                }
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(err) => last_error = Some(err),
            }
        }

        match last_error {
            None => {
                debug!("event=blob_delete module=blob status=ok backend=file already_absent=true");
                Outcome::Complete(())
            }
            Some(err) => {
                warn!(
                    "event=blob_delete module=blob status=degraded backend=file file={} error={}",
                    blob_ref_label(blob_ref),
                    err
                );
                Outcome::degraded((), DegradationKind::BlobDeleteFailed, err.to_string())
            }
        }
    }
}

/// Extracts the path relative to the files directory from a native URI.
pub fn derive_relative_path(blob_ref: &str) -> Option<String> {
    FILES_SEGMENT_RE
        .captures(blob_ref)
        .and_then(|captures| captures.get(1))
        .map(|capture| capture.as_str().to_string())
}

fn is_confined(root: &Path, path: &Path) -> bool {
    path.starts_with(root)
        && path != root
        && !path
            .components()
            .any(|component| matches!(component, Component::ParentDir))
}

#[cfg(test)]
mod tests {
    use super::{derive_relative_path, is_confined};
    use std::path::Path;

    #[test]
    fn derives_path_after_last_files_segment() {
        assert_eq!(
            derive_relative_path("file:///data/user/0/app/files/photos/a.jpeg").as_deref(),
            Some("photos/a.jpeg")
        );
        assert_eq!(
            derive_relative_path("file:///home/files/x/files/photos/b.jpeg").as_deref(),
            Some("photos/b.jpeg")
        );
        assert_eq!(derive_relative_path("photos/c.jpeg"), None);
        assert_eq!(derive_relative_path("file:///data/files/"), None);
    }

    #[test]
    fn confinement_rejects_escape_and_root() {
        let root = Path::new("/data/files");
        assert!(is_confined(root, Path::new("/data/files/photos/a.jpeg")));
        assert!(!is_confined(root, Path::new("/data/files")));
        assert!(!is_confined(root, Path::new("/data/other/a.jpeg")));
        assert!(!is_confined(root, Path::new("/data/files/../secret")));
    }
}
