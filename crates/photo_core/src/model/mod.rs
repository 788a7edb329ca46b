//! Gallery domain model.
//!
//! # Responsibility
//! - Define the canonical photo metadata record persisted in the metadata document.
//!
//! # Invariants
//! - Every record is identified by a stable, unique `PhotoId`.
//! - Records are destroyed by hard delete; there are no tombstones.

pub mod photo;
