//! Camera metadata surfaced by `GET /exif/{key}`.

use serde::Serialize;

/// The three EXIF tags the gallery exposes.
///
/// Each field is `None` when the tag is missing from the image; it is
/// serialized as `null`, never as zero.
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct ExifRecord {
    #[serde(rename = "FNumber")]
    pub f_number: Option<f64>,

    /// Exposure time in seconds.
    #[serde(rename = "ExposureTime")]
    pub exposure_time: Option<f64>,

    #[serde(rename = "ISO")]
    pub iso: Option<u32>,
}
