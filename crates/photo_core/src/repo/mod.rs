//! Persistence layer: key-value preferences, blob stores and the metadata
//! document store.
//!
//! # Responsibility
//! - Define storage contracts consumed by the photo directory.
//! - Hide platform-specific byte storage behind one `BlobStore` interface.
//!
//! # Invariants
//! - The metadata document is the only source of which photos exist; blob
//!   stores are never listed.
//! - Blob deletion and metadata persistence never raise to callers; they
//!   report degradation instead.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod blob_store;
pub mod file_blob;
pub mod inline_blob;
pub mod kv_store;
pub mod metadata_store;

pub type RepoResult<T> = Result<T, RepoError>;

/// Storage failure shared by key-value, blob and metadata stores.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    Io(std::io::Error),
    Serialization(serde_json::Error),
    Encoding(base64::DecodeError),
    InvalidInput(String),
    LockPoisoned(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "{err}"),
            Self::Serialization(err) => write!(f, "serialization failed: {err}"),
            Self::Encoding(err) => write!(f, "invalid base64 payload: {err}"),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::LockPoisoned(what) => write!(f, "{what} lock poisoned"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::Encoding(err) => Some(err),
            Self::InvalidInput(_) | Self::LockPoisoned(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<std::io::Error> for RepoError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

impl From<base64::DecodeError> for RepoError {
    fn from(value: base64::DecodeError) -> Self {
        Self::Encoding(value)
    }
}
