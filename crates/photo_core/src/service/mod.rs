//! Gallery use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls into use-case level APIs.
//! - Keep UI/FFI layers decoupled from storage details.

pub mod capture_flow;
pub mod gallery;
pub mod photo_directory;
