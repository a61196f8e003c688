//! Synthetic images for tests: plain JPEGs/PNGs and JPEGs carrying a
//! hand-built EXIF (APP1) segment.

use image::{ImageEncoder, Rgb, RgbImage, Rgba, RgbaImage};

/// A gradient JPEG of the given size.
pub fn synthetic_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut out = Vec::new();
    image::codecs::jpeg::JpegEncoder::new(&mut out)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    out
}

/// A half-transparent RGBA PNG of the given size.
pub fn png_with_alpha(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, _| Rgba([200, (x % 256) as u8, 40, 128]));
    let mut out = Vec::new();
    image::codecs::png::PngEncoder::new(&mut out)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgba8)
        .unwrap();
    out
}

#[derive(Default, Clone, Debug)]
pub struct TestExif {
    pub orientation: Option<u16>,
    /// (numerator, denominator)
    pub f_number: Option<(u32, u32)>,
    pub exposure_time: Option<(u32, u32)>,
    pub iso: Option<u16>,
}

const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;
const TYPE_RATIONAL: u16 = 5;

enum Entry {
    Short(u16, u16),
    Long(u16, u32),
    Rational(u16, (u32, u32)),
}

impl Entry {
    fn tag(&self) -> u16 {
        match self {
            Entry::Short(tag, _) | Entry::Long(tag, _) | Entry::Rational(tag, _) => *tag,
        }
    }
}

fn ifd_len(entries: usize) -> u32 {
    2 + 12 * entries as u32 + 4
}

/// Append one big-endian IFD. Rational payloads go to `data`, whose first
/// byte sits at TIFF offset `data_offset`.
fn write_ifd(out: &mut Vec<u8>, data: &mut Vec<u8>, data_offset: u32, mut entries: Vec<Entry>) {
    entries.sort_by_key(Entry::tag);
    out.extend_from_slice(&(entries.len() as u16).to_be_bytes());
    for entry in entries {
        out.extend_from_slice(&entry.tag().to_be_bytes());
        match entry {
            Entry::Short(_, value) => {
                out.extend_from_slice(&TYPE_SHORT.to_be_bytes());
                out.extend_from_slice(&1u32.to_be_bytes());
                out.extend_from_slice(&value.to_be_bytes());
                out.extend_from_slice(&[0, 0]);
            }
            Entry::Long(_, value) => {
                out.extend_from_slice(&TYPE_LONG.to_be_bytes());
                out.extend_from_slice(&1u32.to_be_bytes());
                out.extend_from_slice(&value.to_be_bytes());
            }
            Entry::Rational(_, (num, denom)) => {
                out.extend_from_slice(&TYPE_RATIONAL.to_be_bytes());
                out.extend_from_slice(&1u32.to_be_bytes());
                let offset = data_offset + data.len() as u32;
                out.extend_from_slice(&offset.to_be_bytes());
                data.extend_from_slice(&num.to_be_bytes());
                data.extend_from_slice(&denom.to_be_bytes());
            }
        }
    }
    out.extend_from_slice(&0u32.to_be_bytes());
}

/// Insert an EXIF APP1 segment right after the SOI marker of `jpeg`.
pub fn with_exif(jpeg: &[u8], exif: &TestExif) -> Vec<u8> {
    let mut ifd0 = Vec::new();
    if let Some(orientation) = exif.orientation {
        ifd0.push(Entry::Short(0x0112, orientation));
    }
    let mut exif_ifd = Vec::new();
    if let Some(exposure) = exif.exposure_time {
        exif_ifd.push(Entry::Rational(0x829A, exposure));
    }
    if let Some(f_number) = exif.f_number {
        exif_ifd.push(Entry::Rational(0x829D, f_number));
    }
    if let Some(iso) = exif.iso {
        exif_ifd.push(Entry::Short(0x8827, iso));
    }

    let ifd0_offset = 8u32;
    let ifd0_entries = ifd0.len() + 1;
    let exif_ifd_offset = ifd0_offset + ifd_len(ifd0_entries);
    let data_offset = exif_ifd_offset + ifd_len(exif_ifd.len());
    ifd0.push(Entry::Long(0x8769, exif_ifd_offset));

    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"MM");
    tiff.extend_from_slice(&42u16.to_be_bytes());
    tiff.extend_from_slice(&ifd0_offset.to_be_bytes());
    let mut data = Vec::new();
    write_ifd(&mut tiff, &mut data, data_offset, ifd0);
    write_ifd(&mut tiff, &mut data, data_offset, exif_ifd);
    tiff.extend_from_slice(&data);

    let mut segment = vec![0xFF, 0xE1];
    segment.extend_from_slice(&((2 + 6 + tiff.len()) as u16).to_be_bytes());
    segment.extend_from_slice(b"Exif\0\0");
    segment.extend_from_slice(&tiff);

    let mut out = Vec::with_capacity(jpeg.len() + segment.len());
    out.extend_from_slice(&jpeg[..2]);
    out.extend_from_slice(&segment);
    out.extend_from_slice(&jpeg[2..]);
    out
}

/// Router state over an in-memory store, serving static files from a fresh
/// temp dir that holds a landing page.
pub fn test_state(
    store: std::sync::Arc<crate::services::memory_store::MemoryStore>,
) -> (crate::state::AppState, tempfile::TempDir) {
    use crate::services::{
        gallery::GalleryService, naming::KeyNamer, retry::RetryConfig,
        thumbnail_cache::ThumbnailCache,
    };

    let static_dir = tempfile::tempdir().unwrap();
    std::fs::write(static_dir.path().join("index.html"), INDEX_HTML).unwrap();

    let cache = ThumbnailCache::new(
        store.clone(),
        KeyNamer::new("images"),
        None,
        RetryConfig::none(),
    );
    let gallery = GalleryService::new(store, cache, "images", "http://localhost:3000/objects", 2);
    let state = crate::state::AppState {
        gallery,
        retry: RetryConfig::none(),
        image_base_url: "http://localhost:3000/objects".into(),
        static_dir: std::sync::Arc::new(static_dir.path().to_path_buf()),
    };
    (state, static_dir)
}

pub const INDEX_HTML: &str = "<!doctype html><title>gallery</title>";
