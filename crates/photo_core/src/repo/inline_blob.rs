//! Inline blob storage for constrained environments.
//!
//! Blobs are JSON records `{ "data": <base64>, "filename": <name> }` stored
//! under `photo:<owner id>` in the key-value store; the key is the reference.

use super::blob_store::{validate_blob_filename, BlobStore, JPEG_DATA_URL_PREFIX};
use super::kv_store::KeyValueStore;
use super::{RepoError, RepoResult};
use crate::outcome::{DegradationKind, Outcome};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// Key prefix reserved for inline blob records.
pub const INLINE_BLOB_KEY_PREFIX: &str = "photo:";

#[derive(Debug, Serialize, Deserialize)]
struct InlineBlob {
    data: String,
    filename: String,
}

/// Blob store keeping encoded bytes inside key-value storage.
pub struct InlineBlobStore<K: KeyValueStore> {
    kv: K,
}

impl<K: KeyValueStore> InlineBlobStore<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    /// Returns every stored inline blob key.
    ///
    /// Diagnostics only; the metadata document decides which photos exist.
    pub fn stored_keys(&self) -> RepoResult<Vec<String>> {
        self.kv.keys_with_prefix(INLINE_BLOB_KEY_PREFIX)
    }
}

impl<K: KeyValueStore> BlobStore for InlineBlobStore<K> {
    fn save(&self, owner_id: &str, base64_data: &str, filename: &str) -> RepoResult<String> {
        if owner_id.trim().is_empty() {
            return Err(RepoError::InvalidInput("blob owner id is empty".to_string()));
        }
        if base64_data.is_empty() {
            return Err(RepoError::InvalidInput("blob payload is empty".to_string()));
        }
        validate_blob_filename(filename)?;

        let key = format!("{INLINE_BLOB_KEY_PREFIX}{owner_id}");
        let record = InlineBlob {
            data: base64_data.to_string(),
            filename: filename.to_string(),
        };
        self.kv.set(&key, &serde_json::to_string(&record)?)?;

        info!(
            "event=blob_save module=blob status=ok backend=inline key={} encoded_len={}",
            key,
            base64_data.len()
        );
        Ok(key)
    }

    fn resolve_display_url(&self, blob_ref: &str) -> Option<String> {
        if blob_ref.trim().is_empty() {
            return None;
        }

        let raw = match self.kv.get(blob_ref) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("event=blob_resolve module=blob status=missing backend=inline key={blob_ref}");
                return None;
            }
            Err(err) => {
                warn!(
                    "event=blob_resolve module=blob status=error backend=inline key={} error={}",
                    blob_ref, err
                );
                return None;
            }
        };

        match serde_json::from_str::<InlineBlob>(&raw) {
            Ok(record) if !record.data.is_empty() => {
                Some(format!("{JPEG_DATA_URL_PREFIX}{}", record.data))
            }
            Ok(_) => None,
            Err(err) => {
                warn!(
                    "event=blob_resolve module=blob status=error backend=inline key={} error_code=malformed_blob error={}",
                    blob_ref, err
                );
                None
            }
        }
    }

    fn delete(&self, blob_ref: &str) -> Outcome<()> {
        if blob_ref.trim().is_empty() {
            return Outcome::Complete(());
        }
        if !blob_ref.starts_with(INLINE_BLOB_KEY_PREFIX) {
            warn!(
                "event=blob_delete module=blob status=degraded backend=inline error_code=foreign_key key={}",
                blob_ref
            );
            return Outcome::degraded(
                (),
                DegradationKind::BlobDeleteFailed,
                format!("`{blob_ref}` is not an inline blob key"),
            );
        }

        match self.kv.remove(blob_ref) {
            Ok(existed) => {
                info!(
                    "event=blob_delete module=blob status=ok backend=inline key={} existed={}",
                    blob_ref, existed
                );
                Outcome::Complete(())
            }
            Err(err) => {
                warn!(
                    "event=blob_delete module=blob status=degraded backend=inline key={} error={}",
                    blob_ref, err
                );
                Outcome::degraded((), DegradationKind::BlobDeleteFailed, err.to_string())
            }
        }
    }
}
