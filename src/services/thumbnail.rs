//! Thumbnail generation: decode, orient, downscale, re-encode as JPEG.
//!
//! Everything here is synchronous and CPU-bound. Async callers run it on
//! the blocking pool.

use image::{
    DynamicImage, ImageDecoder, ImageError, ImageReader, codecs::jpeg::JpegEncoder,
    imageops::FilterType,
};
use std::io::Cursor;
use thiserror::Error;

/// Target thumbnail width in pixels. Height follows the source aspect ratio.
pub const THUMBNAIL_WIDTH: u32 = 200;

pub const THUMBNAIL_CONTENT_TYPE: &str = "image/jpeg";

#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("cannot decode source image: {0}")]
    Decode(#[source] ImageError),
    #[error("cannot encode thumbnail: {0}")]
    Encode(#[source] ImageError),
}

/// JPEG quality for re-encoding. Construct through [`JpegQuality::from_setting`]
/// so out-of-range values fall back to the encoder default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegQuality(u8);

impl JpegQuality {
    /// `Some` for 0-100 inclusive, `None` (encoder default) otherwise.
    pub fn from_setting(value: i64) -> Option<Self> {
        u8::try_from(value)
            .ok()
            .filter(|q| *q <= 100)
            .map(JpegQuality)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

/// Produce the thumbnail bytes for one source image.
///
/// The EXIF orientation of the source is applied to the pixels before
/// resizing, since the re-encoded JPEG carries no EXIF block. Sources
/// narrower than [`THUMBNAIL_WIDTH`] keep their size.
pub fn generate(source: &[u8], quality: Option<JpegQuality>) -> Result<Vec<u8>, ThumbnailError> {
    let image = decode_oriented(source)?;
    let resized = downscale(image);
    encode_jpeg(&resized, quality)
}

fn decode_oriented(source: &[u8]) -> Result<DynamicImage, ThumbnailError> {
    let reader = ImageReader::new(Cursor::new(source))
        .with_guessed_format()
        .map_err(|err| ThumbnailError::Decode(ImageError::IoError(err)))?;
    let mut decoder = reader.into_decoder().map_err(ThumbnailError::Decode)?;
    let orientation = decoder.orientation().map_err(ThumbnailError::Decode)?;
    let mut image = DynamicImage::from_decoder(decoder).map_err(ThumbnailError::Decode)?;
    image.apply_orientation(orientation);
    Ok(image)
}

fn downscale(image: DynamicImage) -> DynamicImage {
    let (width, height) = (image.width(), image.height());
    if width <= THUMBNAIL_WIDTH {
        return image;
    }
    let scaled_height = (f64::from(height) * f64::from(THUMBNAIL_WIDTH) / f64::from(width))
        .round()
        .max(1.0) as u32;
    image.resize_exact(THUMBNAIL_WIDTH, scaled_height, FilterType::Lanczos3)
}

fn encode_jpeg(
    image: &DynamicImage,
    quality: Option<JpegQuality>,
) -> Result<Vec<u8>, ThumbnailError> {
    // JPEG has no alpha channel.
    let rgb = image.to_rgb8();
    let mut buffer = Vec::new();
    {
        let mut encoder = match quality {
            // The encoder's scale starts at 1.
            Some(q) => JpegEncoder::new_with_quality(&mut buffer, q.value().max(1)),
            None => JpegEncoder::new(&mut buffer),
        };
        encoder.encode_image(&rgb).map_err(ThumbnailError::Encode)?;
    }
    Ok(buffer)
}
