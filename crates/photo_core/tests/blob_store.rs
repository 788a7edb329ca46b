use photo_core::repo::file_blob::PHOTOS_DIR_NAME;
use photo_core::{
    BlobStore, DegradationKind, DisplayUrlBridge, FileBlobStore, InlineBlobStore, KeyValueStore,
    MemoryKeyValueStore, Platform, PlatformBlobStore, RepoError, SqliteKeyValueStore,
    JPEG_DATA_URL_PREFIX, PHOTOS_DOCUMENT_KEY,
};
use std::sync::Arc;

const PAYLOAD: &str = "QUJDREVGR0g="; // "ABCDEFGH"

#[test]
fn inline_save_returns_key_and_resolves_to_data_url() {
    let kv = Arc::new(SqliteKeyValueStore::open_in_memory().unwrap());
    let store = InlineBlobStore::new(Arc::clone(&kv));

    let blob_ref = store.save("p1", PAYLOAD, "p1.jpeg").unwrap();
    assert_eq!(blob_ref, "photo:p1");
    assert_eq!(
        store.resolve_display_url(&blob_ref).as_deref(),
        Some(format!("{JPEG_DATA_URL_PREFIX}{PAYLOAD}").as_str())
    );
    assert_eq!(store.stored_keys().unwrap(), vec!["photo:p1".to_string()]);

    let raw = kv.get("photo:p1").unwrap().unwrap();
    let record: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(record["data"], PAYLOAD);
    assert_eq!(record["filename"], "p1.jpeg");
}

#[test]
fn inline_resolve_of_unknown_or_malformed_blob_is_none() {
    let kv = Arc::new(MemoryKeyValueStore::new());
    kv.set("photo:bad", "not json").unwrap();
    let store = InlineBlobStore::new(Arc::clone(&kv));

    assert_eq!(store.resolve_display_url("photo:missing"), None);
    assert_eq!(store.resolve_display_url("photo:bad"), None);
    assert_eq!(store.resolve_display_url(""), None);
}

#[test]
fn inline_delete_removes_record_and_is_repeatable() {
    let store = InlineBlobStore::new(MemoryKeyValueStore::new());
    let blob_ref = store.save("p1", PAYLOAD, "p1.jpeg").unwrap();

    assert!(!store.delete(&blob_ref).is_degraded());
    assert_eq!(store.resolve_display_url(&blob_ref), None);
    assert!(!store.delete(&blob_ref).is_degraded());
}

#[test]
fn inline_delete_refuses_foreign_keys() {
    let kv = Arc::new(MemoryKeyValueStore::new());
    kv.set(PHOTOS_DOCUMENT_KEY, "[]").unwrap();
    let store = InlineBlobStore::new(Arc::clone(&kv));

    let outcome = store.delete(PHOTOS_DOCUMENT_KEY);
    assert_eq!(
        outcome.degradation().map(|reason| reason.kind),
        Some(DegradationKind::BlobDeleteFailed)
    );
    assert!(kv.get(PHOTOS_DOCUMENT_KEY).unwrap().is_some());
}

#[test]
fn inline_save_rejects_empty_payload_and_bad_filename() {
    let store = InlineBlobStore::new(MemoryKeyValueStore::new());
    assert!(matches!(
        store.save("p1", "", "p1.jpeg"),
        Err(RepoError::InvalidInput(_))
    ));
    assert!(matches!(
        store.save("p1", PAYLOAD, "../p1.jpeg"),
        Err(RepoError::InvalidInput(_))
    ));
}

#[test]
fn file_save_writes_decoded_bytes_under_photos_dir() {
    let dir = tempfile::tempdir().unwrap();
    let files_dir = dir.path().join("files");
    let store = FileBlobStore::new(&files_dir);

    let blob_ref = store.save("p1", PAYLOAD, "p1.jpeg").unwrap();
    assert!(blob_ref.starts_with("file://"));
    assert!(blob_ref.ends_with("/files/photos/p1.jpeg"));

    let written = std::fs::read(files_dir.join(PHOTOS_DIR_NAME).join("p1.jpeg")).unwrap();
    assert_eq!(written, b"ABCDEFGH");
    assert_eq!(store.resolve_display_url(&blob_ref).as_deref(), Some(blob_ref.as_str()));
}

#[test]
fn file_save_rejects_invalid_base64() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileBlobStore::new(dir.path().join("files"));
    assert!(matches!(
        store.save("p1", "***", "p1.jpeg"),
        Err(RepoError::Encoding(_))
    ));
}

struct CapacitorLikeBridge;

impl DisplayUrlBridge for CapacitorLikeBridge {
    fn convert_file_src(&self, file_uri: &str) -> Option<String> {
        file_uri
            .strip_prefix("file://")
            .map(|path| format!("https://localhost/_capacitor_file_{path}"))
    }
}

#[test]
fn file_resolve_uses_bridge_when_available() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileBlobStore::new(dir.path().join("files")).with_bridge(Arc::new(CapacitorLikeBridge));

    let blob_ref = store.save("p1", PAYLOAD, "p1.jpeg").unwrap();
    let url = store.resolve_display_url(&blob_ref).unwrap();
    assert!(url.starts_with("https://localhost/_capacitor_file_/"));
    assert!(url.ends_with("/files/photos/p1.jpeg"));
}

#[test]
fn file_resolve_of_missing_or_outside_file_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileBlobStore::new(dir.path().join("files"));
    let blob_ref = store.save("p1", PAYLOAD, "p1.jpeg").unwrap();

    std::fs::write(dir.path().join("secret.txt"), b"x").unwrap();
    let outside = format!("file://{}", dir.path().join("secret.txt").display());
    assert_eq!(store.resolve_display_url(&outside), None);

    assert!(!store.delete(&blob_ref).is_degraded());
    assert_eq!(store.resolve_display_url(&blob_ref), None);
}

#[test]
fn file_delete_uses_derived_relative_path() {
    let dir = tempfile::tempdir().unwrap();
    let files_dir = dir.path().join("files");
    let store = FileBlobStore::new(&files_dir);
    store.save("p1", PAYLOAD, "p1.jpeg").unwrap();

    // Reference minted on another device layout; only the `/files/` tail matches.
    let outcome = store.delete("file:///data/user/0/app/files/photos/p1.jpeg");
    assert!(!outcome.is_degraded());
    assert!(!files_dir.join(PHOTOS_DIR_NAME).join("p1.jpeg").exists());
}

#[test]
fn file_delete_falls_back_to_raw_relative_reference() {
    let dir = tempfile::tempdir().unwrap();
    let files_dir = dir.path().join("files");
    let store = FileBlobStore::new(&files_dir);
    store.save("p1", PAYLOAD, "p1.jpeg").unwrap();

    assert!(!store.delete("photos/p1.jpeg").is_degraded());
    assert!(!files_dir.join(PHOTOS_DIR_NAME).join("p1.jpeg").exists());
}

#[test]
fn file_delete_never_leaves_the_files_directory() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileBlobStore::new(dir.path().join("files"));
    std::fs::create_dir_all(dir.path().join("files")).unwrap();
    let victim = dir.path().join("victim.txt");
    std::fs::write(&victim, b"keep me").unwrap();

    let outcome = store.delete(&format!("file://{}", victim.display()));
    assert!(outcome.is_degraded());
    assert!(store.delete("../victim.txt").is_degraded());
    assert!(victim.exists());
}

#[test]
fn platform_store_selects_strategy_once() {
    let dir = tempfile::tempdir().unwrap();
    let kv = Arc::new(MemoryKeyValueStore::new());

    let inline = PlatformBlobStore::for_platform(Platform::Constrained, Arc::clone(&kv), dir.path());
    assert_eq!(inline.platform(), Platform::Constrained);
    assert_eq!(inline.save("p1", PAYLOAD, "p1.jpeg").unwrap(), "photo:p1");

    let native = PlatformBlobStore::for_platform(
        Platform::FilesystemCapable,
        Arc::clone(&kv),
        dir.path().join("files"),
    );
    assert_eq!(native.platform(), Platform::FilesystemCapable);
    assert!(native.save("p2", PAYLOAD, "p2.jpeg").unwrap().starts_with("file://"));
    assert_eq!(kv.keys_with_prefix("photo:").unwrap().len(), 1);
}
