//! Shared test utilities for the imagecraft test suite.
//!
//! Synthetic images are generated with the `image` crate, so no binary
//! fixtures are checked in.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = tempfile::TempDir::new().unwrap();
//! let path = tmp.path().join("photo.jpg");
//! create_test_jpeg(&path, 800, 600);
//! ```

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::path::Path;

// =========================================================================
// In-memory images
// =========================================================================

/// RGB image with a diagonal gradient, so resampling and JPEG quality
/// produce measurable differences.
pub fn gradient_rgb(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x + y) % 256) as u8,
        ])
    }))
}

/// RGBA image: opaque red disc on a fully transparent background.
pub fn disc_rgba(width: u32, height: u32) -> DynamicImage {
    let (cx, cy) = (width as i64 / 2, height as i64 / 2);
    let r2 = (width.min(height) as i64 / 3).pow(2);
    DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
        let (dx, dy) = (x as i64 - cx, y as i64 - cy);
        if dx * dx + dy * dy <= r2 {
            Rgba([220, 30, 30, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    }))
}

// =========================================================================
// Files on disk
// =========================================================================

/// Write a gradient JPEG of the given size.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    gradient_rgb(width, height)
        .save_with_format(path, ImageFormat::Jpeg)
        .unwrap();
}

/// Write a transparent PNG with an opaque disc, regardless of extension.
pub fn create_test_png_rgba(path: &Path, width: u32, height: u32) {
    disc_rgba(width, height)
        .save_with_format(path, ImageFormat::Png)
        .unwrap();
}
