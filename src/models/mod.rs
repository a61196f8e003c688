//! Core data models for the thumbnail gallery.
//!
//! These are plain values passed between the store, the thumbnail cache and
//! the HTTP layer. Response-facing types serialize as JSON via `serde`.

pub mod exif;
pub mod gallery;
pub mod object;
