//! One entry of the gallery listing returned by `GET /images`.

use serde::Serialize;

/// A pair of absolute URLs: the untouched original and its cached preview.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct GalleryEntry {
    pub original: String,
    pub thumbnail: String,
}
