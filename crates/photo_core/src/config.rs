//! Gallery runtime configuration.
//!
//! # Responsibility
//! - Select the storage strategy once at startup.
//! - Hold producer-side limits applied before any store write.
//!
//! # Invariants
//! - `max_encoded_len` is counted in base64 characters, not decoded bytes.
//! - Paths derived from `data_dir` are stable for the process lifetime.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default ceiling for one capture's base64 text.
pub const DEFAULT_MAX_ENCODED_LEN: usize = 4_500_000;
/// Default timeout for the best-effort location lookup.
pub const DEFAULT_LOCATION_TIMEOUT_MS: u64 = 4_000;

const PREFERENCES_DB_FILE_NAME: &str = "photo_gallery.sqlite3";
const FILES_DIR_NAME: &str = "files";

pub const ENV_DATA_DIR: &str = "PHOTO_GALLERY_DATA_DIR";
pub const ENV_PLATFORM: &str = "PHOTO_GALLERY_PLATFORM";
pub const ENV_MAX_ENCODED_LEN: &str = "PHOTO_GALLERY_MAX_ENCODED_LEN";
pub const ENV_LOCATION_TIMEOUT_MS: &str = "PHOTO_GALLERY_LOCATION_TIMEOUT_MS";

/// Storage/display strategy of the running environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// No direct filesystem access; blobs live inline in key-value storage.
    Constrained,
    /// Application-private data directory; blobs live in discrete files.
    FilesystemCapable,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Constrained => "constrained",
            Self::FilesystemCapable => "filesystem",
        }
    }

    /// Parses a platform label as reported by the host shell.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "web" | "browser" | "constrained" => Ok(Self::Constrained),
            "native" | "android" | "ios" | "filesystem" => Ok(Self::FilesystemCapable),
            other => Err(ConfigError::UnsupportedPlatform(other.to_string())),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MissingDataDir,
    UnsupportedPlatform(String),
    InvalidNumber { key: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingDataDir => write!(f, "{ENV_DATA_DIR} must be set to a directory"),
            Self::UnsupportedPlatform(value) => write!(
                f,
                "unsupported platform `{value}`; expected web|native|android|ios"
            ),
            Self::InvalidNumber { key, value } => {
                write!(f, "{key} must be a positive integer, got `{value}`")
            }
        }
    }
}

impl Error for ConfigError {}

/// Startup configuration for one gallery instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryConfig {
    pub data_dir: PathBuf,
    pub platform: Platform,
    pub max_encoded_len: usize,
    pub location_timeout: Duration,
}

impl GalleryConfig {
    pub fn new(data_dir: impl Into<PathBuf>, platform: Platform) -> Self {
        Self {
            data_dir: data_dir.into(),
            platform,
            max_encoded_len: DEFAULT_MAX_ENCODED_LEN,
            location_timeout: Duration::from_millis(DEFAULT_LOCATION_TIMEOUT_MS),
        }
    }

    /// Reads configuration from `PHOTO_GALLERY_*` environment variables.
    ///
    /// Platform defaults to filesystem-capable when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let data_dir = lookup(ENV_DATA_DIR)
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .ok_or(ConfigError::MissingDataDir)?;

        let platform = match lookup(ENV_PLATFORM) {
            Some(raw) if !raw.trim().is_empty() => Platform::parse(&raw)?,
            _ => Platform::FilesystemCapable,
        };

        let mut config = Self::new(data_dir, platform);
        if let Some(value) = parse_positive(&lookup, ENV_MAX_ENCODED_LEN)? {
            config.max_encoded_len = value as usize;
        }
        if let Some(value) = parse_positive(&lookup, ENV_LOCATION_TIMEOUT_MS)? {
            config.location_timeout = Duration::from_millis(value);
        }
        Ok(config)
    }

    /// SQLite file holding key-value preferences.
    pub fn preferences_db_path(&self) -> PathBuf {
        self.data_dir.join(PREFERENCES_DB_FILE_NAME)
    }

    /// Application-private directory that file blobs are written under.
    pub fn files_dir(&self) -> PathBuf {
        self.data_dir.join(FILES_DIR_NAME)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

fn parse_positive(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<u64>, ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match trimmed.parse::<u64>() {
        Ok(value) if value > 0 => Ok(Some(value)),
        _ => Err(ConfigError::InvalidNumber {
            key,
            value: trimmed.to_string(),
        }),
    }
}
