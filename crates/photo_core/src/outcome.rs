//! Non-fatal operation results.
//!
//! Gallery operations distinguish three results:
//! - `Ok(Outcome::Complete(value))`: everything succeeded.
//! - `Ok(Outcome::Degraded { .. })`: something failed, state was degraded to a
//!   smaller or emptier shape, and the caller may continue.
//! - `Err(..)`: the caller must be informed and nothing was changed.

use std::fmt::{Display, Formatter};

/// Category of a non-fatal failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegradationKind {
    /// Persisted metadata document was malformed and has been discarded.
    CorruptDocument,
    /// Some entries of the metadata document were unusable and were skipped.
    SkippedEntries,
    /// Loaded records shared an id; later duplicates were dropped.
    DuplicateIds,
    /// Persisted metadata could not be read; started empty.
    ReadFailed,
    /// Metadata write failed; in-memory and persisted state may differ.
    WriteFailed,
    /// Blob bytes could not be deleted and may be orphaned.
    BlobDeleteFailed,
}

impl DegradationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CorruptDocument => "corrupt_document",
            Self::SkippedEntries => "skipped_entries",
            Self::DuplicateIds => "duplicate_ids",
            Self::ReadFailed => "read_failed",
            Self::WriteFailed => "write_failed",
            Self::BlobDeleteFailed => "blob_delete_failed",
        }
    }
}

/// Description of why an operation degraded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Degradation {
    pub kind: DegradationKind,
    pub detail: String,
}

impl Display for Degradation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.detail)
    }
}

/// Result of an operation that never fails hard.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Complete(T),
    Degraded { value: T, reason: Degradation },
}

impl<T> Outcome<T> {
    pub fn degraded(value: T, kind: DegradationKind, detail: impl Into<String>) -> Self {
        Self::Degraded {
            value,
            reason: Degradation {
                kind,
                detail: detail.into(),
            },
        }
    }

    pub fn value(&self) -> &T {
        match self {
            Self::Complete(value) | Self::Degraded { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Self::Complete(value) | Self::Degraded { value, .. } => value,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    pub fn degradation(&self) -> Option<&Degradation> {
        match self {
            Self::Complete(_) => None,
            Self::Degraded { reason, .. } => Some(reason),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Complete(value) => Outcome::Complete(f(value)),
            Self::Degraded { value, reason } => Outcome::Degraded {
                value: f(value),
                reason,
            },
        }
    }

    /// Folds another outcome's degradation into this one.
    ///
    /// The first recorded degradation wins.
    pub fn merge<U>(self, other: &Outcome<U>) -> Self {
        match (self, other.degradation()) {
            (Self::Complete(value), Some(reason)) => Self::Degraded {
                value,
                reason: reason.clone(),
            },
            (this, _) => this,
        }
    }
}
