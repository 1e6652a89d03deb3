//! Thumbnail rendering — pure `image`-crate pipeline, no disk writes.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP, BMP, GIF) | `image` crate (pure Rust decoders) |
//! | Alpha flattening | `image::imageops::overlay` onto a white canvas |
//! | Resize | `image::DynamicImage::resize` with `Lanczos3` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//!
//! [`render_thumbnail`] produces an in-memory image only; persisting it is
//! the cache's job ([`crate::thumbs`]), which keeps the single-writer
//! section and the atomic-rename discipline in one place.

use crate::catalog::CatalogError;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader, Rgba, RgbaImage};
use std::io::Write;
use std::path::Path;

/// Neither thumbnail dimension may exceed this.
pub const THUMB_BOUND: u32 = 200;

/// JPEG quality for persisted thumbnails.
pub const THUMB_QUALITY: u8 = 85;

/// Decode `source` and produce a bounded, format-normalized thumbnail.
///
/// Transparent and palette-derived sources are composited onto an opaque
/// white background (transparent regions become white), then everything is
/// normalized to RGB8. The image is downscaled so neither dimension exceeds
/// [`THUMB_BOUND`], preserving aspect ratio; sources already within the
/// bound are not upscaled.
///
/// Failure is a [`CatalogError::Decode`] and is non-fatal to callers — the
/// warm-up walk skips the file, request handlers surface the error.
pub fn render_thumbnail(source: &Path) -> Result<DynamicImage, CatalogError> {
    let decode_err = |reason: String| CatalogError::Decode {
        path: source.display().to_string(),
        reason,
    };

    let img = ImageReader::open(source)
        .map_err(|e| decode_err(e.to_string()))?
        .decode()
        .map_err(|e| decode_err(e.to_string()))?;

    let img = flatten_onto_white(img);

    if img.width() <= THUMB_BOUND && img.height() <= THUMB_BOUND {
        return Ok(img);
    }
    Ok(img.resize(THUMB_BOUND, THUMB_BOUND, FilterType::Lanczos3))
}

/// Composite alpha-carrying images onto white; normalize everything to RGB8.
fn flatten_onto_white(img: DynamicImage) -> DynamicImage {
    if !img.color().has_alpha() {
        return DynamicImage::ImageRgb8(img.to_rgb8());
    }

    let rgba = img.to_rgba8();
    let mut canvas = RgbaImage::from_pixel(rgba.width(), rgba.height(), Rgba([255, 255, 255, 255]));
    image::imageops::overlay(&mut canvas, &rgba, 0, 0);
    DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8())
}

/// Encode `img` as JPEG at the given quality into `writer`.
pub fn encode_jpeg<W: Write>(
    img: &DynamicImage,
    writer: W,
    quality: u8,
) -> Result<(), image::ImageError> {
    let encoder = JpegEncoder::new_with_quality(writer, quality);
    img.write_with_encoder(encoder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{write_test_jpeg, write_test_png_rgba};
    use tempfile::TempDir;

    #[test]
    fn large_image_bounded_with_aspect_preserved() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("wide.jpg");
        write_test_jpeg(&path, 400, 300);

        let thumb = render_thumbnail(&path).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (200, 150));
    }

    #[test]
    fn portrait_image_bounded_on_height() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tall.jpg");
        write_test_jpeg(&path, 300, 600);

        let thumb = render_thumbnail(&path).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (100, 200));
    }

    #[test]
    fn small_image_not_upscaled() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("small.jpg");
        write_test_jpeg(&path, 50, 40);

        let thumb = render_thumbnail(&path).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (50, 40));
    }

    #[test]
    fn transparent_regions_become_white() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("clear.png");
        // Fully transparent source: every output pixel must be pure white.
        write_test_png_rgba(&path, 64, 64, Rgba([200, 10, 10, 0]));

        let thumb = render_thumbnail(&path).unwrap().to_rgb8();
        assert_eq!(thumb.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(thumb.get_pixel(63, 63).0, [255, 255, 255]);
    }

    #[test]
    fn opaque_alpha_pixels_keep_their_color() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("solid.png");
        write_test_png_rgba(&path, 32, 32, Rgba([10, 200, 30, 255]));

        let thumb = render_thumbnail(&path).unwrap().to_rgb8();
        assert_eq!(thumb.get_pixel(5, 5).0, [10, 200, 30]);
    }

    #[test]
    fn output_is_rgb8() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("any.png");
        write_test_png_rgba(&path, 16, 16, Rgba([0, 0, 0, 128]));

        let thumb = render_thumbnail(&path).unwrap();
        assert_eq!(thumb.color(), image::ColorType::Rgb8);
    }

    #[test]
    fn corrupt_file_is_decode_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("junk.png");
        std::fs::write(&path, b"this is not a png").unwrap();

        let err = render_thumbnail(&path).unwrap_err();
        assert!(matches!(err, CatalogError::Decode { .. }));
    }

    #[test]
    fn missing_file_is_decode_error() {
        let err = render_thumbnail(Path::new("/nope/missing.png")).unwrap_err();
        assert!(matches!(err, CatalogError::Decode { .. }));
    }

    #[test]
    fn encode_jpeg_writes_bytes() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("src.jpg");
        write_test_jpeg(&path, 80, 60);
        let thumb = render_thumbnail(&path).unwrap();

        let mut buf = Vec::new();
        encode_jpeg(&thumb, &mut buf, THUMB_QUALITY).unwrap();
        assert!(!buf.is_empty());
        // JPEG SOI marker
        assert_eq!(&buf[..2], &[0xFF, 0xD8]);
    }
}
