//! Flutter bridge for the photo gallery core.

pub mod api;
