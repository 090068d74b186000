//! End-to-end runs through the real `image`-crate backend.
//!
//! Every test generates its sources into a temp dir, runs a public entry
//! point, and decodes what came out.

use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use imagecraft::batch::{BatchOperation, BatchStatus, run_batch};
use imagecraft::imaging::{
    BudgetStrategy, CropAnchor, EncodeSpec, OutputFormat, Pipeline, Quality, RustBackend, Size,
};
use imagecraft::presets::{CustomGeometry, CustomSpec, Preset, PresetOptions, process_custom};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width) as u8,
            (y * 255 / height) as u8,
            ((x + y) % 256) as u8,
        ])
    }))
}

/// Opaque blue square in the middle, transparent everywhere else.
fn badge(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
        let inside = x > width / 4 && x < width * 3 / 4 && y > height / 4 && y < height * 3 / 4;
        if inside {
            Rgba([20, 40, 200, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    }))
}

fn write_jpeg(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    gradient(width, height)
        .save_with_format(&path, ImageFormat::Jpeg)
        .unwrap();
    path
}

fn write_png_rgba(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    badge(width, height)
        .save_with_format(&path, ImageFormat::Png)
        .unwrap();
    path
}

// =========================================================================
// Presets
// =========================================================================

#[test]
fn banner_from_landscape_photo() {
    let tmp = TempDir::new().unwrap();
    let src = write_jpeg(tmp.path(), "photo.jpg", 1920, 1080);
    let backend = RustBackend::new();
    let pipeline = Pipeline::new(&backend);

    let out = Preset::Banner
        .apply(&pipeline, &src, &PresetOptions::default())
        .unwrap()
        .unwrap();

    assert_eq!(out.size(), Size::new(1920, 600));
    assert!(!out.has_alpha());
}

#[test]
fn avatar_is_square_from_portrait() {
    let tmp = TempDir::new().unwrap();
    let src = write_jpeg(tmp.path(), "portrait.jpg", 600, 900);
    let backend = RustBackend::new();
    let pipeline = Pipeline::new(&backend);

    let out = Preset::Profile
        .apply(&pipeline, &src, &PresetOptions::default())
        .unwrap()
        .unwrap();

    assert_eq!(out.size(), Size::new(256, 256));
}

#[test]
fn logo_square_png_keeps_transparency() {
    let tmp = TempDir::new().unwrap();
    let src = write_png_rgba(tmp.path(), "logo.png", 300, 300);
    let backend = RustBackend::new();
    let pipeline = Pipeline::new(&backend);

    let out = Preset::LogoSquare
        .apply(&pipeline, &src, &PresetOptions::default())
        .unwrap()
        .unwrap();

    assert_eq!(out.size(), Size::new(512, 512));
    assert!(out.has_alpha());
    assert_eq!(out.image().get_pixel(0, 0)[3], 0);
    assert_eq!(out.image().get_pixel(256, 256)[3], 255);
}

#[test]
fn logo_square_png_from_jpeg_is_rgba() {
    let tmp = TempDir::new().unwrap();
    let src = write_jpeg(tmp.path(), "logo.jpg", 640, 480);
    let backend = RustBackend::new();
    let pipeline = Pipeline::new(&backend);

    let out = Preset::LogoSquare
        .apply(&pipeline, &src, &PresetOptions::default())
        .unwrap()
        .unwrap();

    assert_eq!(out.size(), Size::new(512, 512));
    assert!(out.has_alpha());
}

#[test]
fn explicit_resize_truncates_derived_side() {
    let tmp = TempDir::new().unwrap();
    let src = write_jpeg(tmp.path(), "strip.jpg", 1000, 333);
    let backend = RustBackend::new();
    let pipeline = Pipeline::new(&backend);
    let handle = pipeline.load(&src).unwrap();

    let out = pipeline.resize(handle, Some(200), None, true).unwrap();

    assert_eq!(out.size(), Size::new(200, 66));
}

#[test]
fn preset_on_garbage_is_none() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("fake.jpg");
    std::fs::write(&src, b"definitely not a jpeg").unwrap();
    let backend = RustBackend::new();
    let pipeline = Pipeline::new(&backend);

    assert!(!pipeline.validate(&src));
    assert!(pipeline.load(&src).is_none());
    let out = Preset::Thumbnail
        .apply(&pipeline, &src, &PresetOptions::default())
        .unwrap();
    assert!(out.is_none());
}

#[test]
fn custom_rect_crops_to_box() {
    let tmp = TempDir::new().unwrap();
    let src = write_jpeg(tmp.path(), "wide.jpg", 1600, 900);
    let backend = RustBackend::new();
    let pipeline = Pipeline::new(&backend);
    let spec = CustomSpec {
        geometry: CustomGeometry::Rect(Size::new(800, 300)),
        brightness: 1.1,
        ..CustomSpec::default()
    };

    let out = process_custom(&pipeline, &src, &spec).unwrap().unwrap();

    assert_eq!(out.size(), Size::new(800, 300));
}

// =========================================================================
// Transforms
// =========================================================================

#[test]
fn anchored_crop_keeps_requested_edge() {
    let tmp = TempDir::new().unwrap();
    let src = write_jpeg(tmp.path(), "wide.jpg", 1200, 600);
    let backend = RustBackend::new();
    let pipeline = Pipeline::new(&backend);
    let handle = pipeline.load(&src).unwrap();

    let out = pipeline
        .crop_anchored(handle, Size::new(300, 300), CropAnchor::Start)
        .unwrap();

    assert_eq!(out.size(), Size::new(300, 300));
    // Left edge of the gradient is dark in the red channel.
    assert!(out.image().get_pixel(5, 150)[0] < 40);
}

#[test]
fn resize_within_never_enlarges() {
    let tmp = TempDir::new().unwrap();
    let src = write_jpeg(tmp.path(), "small.jpg", 320, 200);
    let backend = RustBackend::new();
    let pipeline = Pipeline::new(&backend);
    let handle = pipeline.load(&src).unwrap();

    let out = pipeline
        .resize_within(handle, Size::new(1000, 1000), false)
        .unwrap();

    assert_eq!(out.size(), Size::new(320, 200));
}

// =========================================================================
// Encoding
// =========================================================================

#[test]
fn jpeg_output_flattens_onto_white() {
    let tmp = TempDir::new().unwrap();
    let src = write_png_rgba(tmp.path(), "badge.png", 200, 200);
    let dest = tmp.path().join("badge.jpg");
    let backend = RustBackend::new();
    let pipeline = Pipeline::new(&backend);
    let handle = pipeline.load(&src).unwrap();

    let encoded = pipeline
        .save(&handle, &dest, &EncodeSpec::new(OutputFormat::Jpeg))
        .unwrap();

    assert_eq!(encoded.format, OutputFormat::Jpeg);
    let written = image::open(&dest).unwrap();
    assert_eq!(written.dimensions(), (200, 200));
    assert!(!written.color().has_alpha());
    let corner = written.get_pixel(2, 2);
    assert!(corner[0] > 245 && corner[1] > 245 && corner[2] > 245);
}

#[test]
fn png_round_trip_keeps_size_and_alpha() {
    let tmp = TempDir::new().unwrap();
    let src = write_png_rgba(tmp.path(), "badge.png", 120, 80);
    let dest = tmp.path().join("copy.png");
    let backend = RustBackend::new();
    let pipeline = Pipeline::new(&backend);
    let handle = pipeline.load(&src).unwrap();

    pipeline
        .save(&handle, &dest, &EncodeSpec::new(OutputFormat::Png))
        .unwrap();

    let back = pipeline.load(&dest).unwrap();
    assert_eq!(back.size(), Size::new(120, 80));
    assert!(back.has_alpha());
    assert_eq!(back.image().get_pixel(0, 0)[3], 0);
}

#[test]
fn byte_budget_lowers_jpeg_quality() {
    let tmp = TempDir::new().unwrap();
    let src = write_jpeg(tmp.path(), "photo.jpg", 800, 600);
    let backend = RustBackend::new();
    let pipeline = Pipeline::new(&backend);
    let handle = pipeline.load(&src).unwrap();
    let base = EncodeSpec::new(OutputFormat::Jpeg).with_quality(Quality::new(90));

    let full = pipeline.encode(&handle, &base).unwrap();
    let limit = (full.len() / 2) as u64;

    for budget in [BudgetStrategy::SingleRetry, BudgetStrategy::Bisect] {
        let spec = base.with_max_size(Some(limit)).with_budget(budget);
        let budgeted = pipeline.encode(&handle, &spec).unwrap();
        assert!(budgeted.quality < Quality::new(90), "{budget:?}");
        assert!(budgeted.len() < full.len(), "{budget:?}");
    }
}

// =========================================================================
// Batch
// =========================================================================

#[test]
fn batch_writes_thumbnails_and_skips_garbage() {
    let tmp = TempDir::new().unwrap();
    let a = write_jpeg(tmp.path(), "a.jpg", 1000, 800);
    let b = write_jpeg(tmp.path(), "b.jpg", 640, 480);
    let junk = tmp.path().join("junk.jpg");
    std::fs::write(&junk, b"junk").unwrap();
    let out_dir = tmp.path().join("out");

    let backend = RustBackend::new();
    let pipeline = Pipeline::new(&backend);
    let operation = BatchOperation::Preset {
        preset: Preset::Thumbnail,
        options: PresetOptions::default(),
    };

    let outcomes = run_batch(&pipeline, &[a.clone(), junk.clone(), b.clone()], &out_dir, &operation)
        .unwrap();

    let sources: Vec<_> = outcomes.iter().map(|o| o.source.clone()).collect();
    assert_eq!(sources, vec![a, junk, b]);
    assert_eq!(outcomes[1].status, BatchStatus::Skipped);
    for index in [0, 2] {
        match &outcomes[index].status {
            BatchStatus::Written { output, size, .. } => {
                assert_eq!(size.width, 400);
                assert!(output.exists());
            }
            other => panic!("expected written, got {other:?}"),
        }
    }
    assert_eq!(
        image::open(out_dir.join("a.jpg")).unwrap().dimensions(),
        (400, 320)
    );
}
