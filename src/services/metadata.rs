//! EXIF extraction for `GET /exif/{key}`.

use crate::models::exif::ExifRecord;
use exif::{Exif, In, Reader, Tag, Value};
use std::io::Cursor;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("no EXIF data found")]
    Missing,
    #[error("malformed EXIF data: {0}")]
    Malformed(#[source] exif::Error),
}

/// Parse the EXIF block of an encoded image and keep the camera settings
/// the gallery shows. Other tags are dropped.
///
/// An image without an EXIF block is an error, not an empty record.
pub fn extract(source: &[u8]) -> Result<ExifRecord, MetadataError> {
    let exif = Reader::new()
        .read_from_container(&mut Cursor::new(source))
        .map_err(|err| match err {
            exif::Error::NotFound(_) => MetadataError::Missing,
            other => MetadataError::Malformed(other),
        })?;

    Ok(ExifRecord {
        f_number: rational(&exif, Tag::FNumber),
        exposure_time: rational(&exif, Tag::ExposureTime),
        iso: integer(&exif, Tag::PhotographicSensitivity),
    })
}

fn rational(exif: &Exif, tag: Tag) -> Option<f64> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match &field.value {
        Value::Rational(values) => values
            .first()
            .filter(|r| r.denom != 0)
            .map(|r| r.to_f64()),
        Value::SRational(values) => values
            .first()
            .filter(|r| r.denom != 0)
            .map(|r| r.to_f64()),
        _ => None,
    }
}

fn integer(exif: &Exif, tag: Tag) -> Option<u32> {
    exif.get_field(tag, In::PRIMARY)?.value.get_uint(0)
}
