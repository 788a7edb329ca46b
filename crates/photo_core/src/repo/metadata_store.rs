//! Metadata document persistence.
//!
//! # Responsibility
//! - Persist the full ordered photo list as one JSON document under one key.
//! - Self-heal corrupted documents by discarding them.
//!
//! # Invariants
//! - Every save replaces the whole document; there are no partial updates.
//! - A document that is not a JSON array is erased on load.
//! - Inside an array, unusable entries are skipped one by one; the remaining
//!   records load and the document itself is kept.
//! - Neither `load` nor `save` returns an error to the caller.

use super::kv_store::KeyValueStore;
use crate::model::photo::PhotoRecord;
use crate::outcome::{DegradationKind, Outcome};
use log::{debug, error, info, warn};
use serde_json::Value;

/// Well-known key holding the metadata document.
pub const PHOTOS_DOCUMENT_KEY: &str = "photos";

/// Durable storage for the ordered photo list.
pub trait MetadataStore: Send + Sync {
    /// Loads the persisted list; absent or corrupt documents load as empty.
    fn load(&self) -> Outcome<Vec<PhotoRecord>>;
    /// Replaces the persisted list with `records`.
    fn save(&self, records: &[PhotoRecord]) -> Outcome<()>;
}

/// Metadata store writing the document into key-value preferences.
pub struct KvMetadataStore<K: KeyValueStore> {
    kv: K,
    key: String,
}

impl<K: KeyValueStore> KvMetadataStore<K> {
    pub fn new(kv: K) -> Self {
        Self::with_key(kv, PHOTOS_DOCUMENT_KEY)
    }

    /// Uses a custom document key, e.g. for side-by-side galleries.
    pub fn with_key(kv: K, key: impl Into<String>) -> Self {
        Self {
            kv,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn discard_corrupt(&self, detail: String) -> Outcome<Vec<PhotoRecord>> {
        warn!(
            "event=metadata_load module=metadata status=degraded error_code=corrupt_document key={} error={}",
            self.key, detail
        );
        if let Err(err) = self.kv.remove(&self.key) {
            error!(
                "event=metadata_erase module=metadata status=error key={} error={}",
                self.key, err
            );
        }
        Outcome::degraded(Vec::new(), DegradationKind::CorruptDocument, detail)
    }

    fn decode_entries(&self, entries: Vec<Value>) -> Outcome<Vec<PhotoRecord>> {
        let total = entries.len();
        let mut records = Vec::with_capacity(total);
        let mut first_error = None;
        for (index, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<PhotoRecord>(entry) {
                Ok(record) => records.push(record),
                Err(err) => {
                    warn!(
                        "event=metadata_load module=metadata status=continue error_code=malformed_entry key={} index={} error={}",
                        self.key, index, err
                    );
                    first_error.get_or_insert_with(|| format!("entry {index}: {err}"));
                }
            }
        }

        let skipped = total - records.len();
        info!(
            "event=metadata_load module=metadata status={} key={} count={} skipped={}",
            if skipped == 0 { "ok" } else { "degraded" },
            self.key,
            records.len(),
            skipped
        );
        match first_error {
            None => Outcome::Complete(records),
            Some(detail) => Outcome::degraded(
                records,
                DegradationKind::SkippedEntries,
                format!("skipped {skipped} of {total} entries ({detail})"),
            ),
        }
    }
}

impl<K: KeyValueStore> MetadataStore for KvMetadataStore<K> {
    fn load(&self) -> Outcome<Vec<PhotoRecord>> {
        let raw = match self.kv.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("event=metadata_load module=metadata status=ok key={} count=0 absent=true", self.key);
                return Outcome::Complete(Vec::new());
            }
            Err(err) => {
                error!(
                    "event=metadata_load module=metadata status=error key={} error={}",
                    self.key, err
                );
                return Outcome::degraded(Vec::new(), DegradationKind::ReadFailed, err.to_string());
            }
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(entries)) => self.decode_entries(entries),
            Ok(_) => self.discard_corrupt("document is not a JSON array".to_string()),
            Err(err) => self.discard_corrupt(format!("document is not JSON: {err}")),
        }
    }

    fn save(&self, records: &[PhotoRecord]) -> Outcome<()> {
        let written = serde_json::to_string(records)
            .map_err(|err| err.to_string())
            .and_then(|document| {
                self.kv
                    .set(&self.key, &document)
                    .map_err(|err| err.to_string())
            });

        match written {
            Ok(()) => {
                debug!(
                    "event=metadata_save module=metadata status=ok key={} count={}",
                    self.key,
                    records.len()
                );
                Outcome::Complete(())
            }
            Err(detail) => {
                error!(
                    "event=metadata_save module=metadata status=error key={} error={}",
                    self.key, detail
                );
                warn!(
                    "event=metadata_erase module=metadata status=start key={} reason=save_failed",
                    self.key
                );
                if let Err(err) = self.kv.remove(&self.key) {
                    error!(
                        "event=metadata_erase module=metadata status=error key={} error={}",
                        self.key, err
                    );
                }
                Outcome::degraded((), DegradationKind::WriteFailed, detail)
            }
        }
    }
}
