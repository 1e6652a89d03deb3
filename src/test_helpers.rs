//! Shared test utilities: temp catalog roots and tiny real images.
//!
//! Tests get an isolated originals/thumbnails pair under a `TempDir` they
//! can mutate freely. Image helpers write small but genuinely decodable
//! files — thumbnail tests exercise the real codec path, not stubs.

use crate::catalog::Catalog;
use image::{Rgb, RgbImage, Rgba, RgbaImage};
use std::path::Path;
use tempfile::TempDir;

/// Fresh catalog over `<tmp>/images` and `<tmp>/thumbnails`, both created.
pub fn catalog_fixture() -> (TempDir, Catalog) {
    let tmp = TempDir::new().unwrap();
    let catalog = Catalog::new(tmp.path().join("images"), tmp.path().join("thumbnails"));
    catalog.ensure_roots().unwrap();
    (tmp, catalog)
}

/// Write a small valid JPEG with a gradient pattern.
pub fn write_test_jpeg(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    img.save(path).unwrap();
}

/// Write a small valid PNG filled with one RGBA pixel value.
pub fn write_test_png_rgba(path: &Path, width: u32, height: u32, pixel: Rgba<u8>) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let img = RgbaImage::from_pixel(width, height, pixel);
    img.save(path).unwrap();
}
