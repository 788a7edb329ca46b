//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `photo_core` linkage without the Flutter runtime.
//! - When `PHOTO_GALLERY_DATA_DIR` is set, summarize the persisted gallery.

use photo_core::{open_gallery, GalleryConfig};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("photo_core ping={}", photo_core::ping());
    println!("photo_core version={}", photo_core::core_version());

    if std::env::var_os(photo_core::config::ENV_DATA_DIR).is_none() {
        return ExitCode::SUCCESS;
    }

    let config = match GalleryConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("config error: {err}");
            return ExitCode::FAILURE;
        }
    };
    let gallery = match open_gallery(&config) {
        Ok(gallery) => gallery,
        Err(err) => {
            eprintln!("open error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let loaded = gallery.initialize();
    if let Some(reason) = loaded.degradation() {
        eprintln!("warning: {reason}");
    }
    println!(
        "gallery platform={} photos={} liked={} geotagged={}",
        config.platform.as_str(),
        loaded.value(),
        gallery.liked().len(),
        gallery.geotagged().len()
    );
    for photo in gallery.list() {
        let resolved = !gallery.resolve_display_src(&photo).is_empty();
        println!(
            "  {} captured_at={} liked={} image={}",
            photo.id,
            photo.captured_at,
            photo.liked,
            if resolved { "ok" } else { "missing" }
        );
    }
    ExitCode::SUCCESS
}
