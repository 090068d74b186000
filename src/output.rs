//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Info
//!
//! ```text
//! photo.jpg
//!     Format: JPEG
//!     Mode: RGB
//!     Size: 1920x1080
//!     Alpha: no
//! ```
//!
//! ## Write (convert, resize, crop, adjust, preset, custom)
//!
//! ```text
//! photo.jpg → photo-banner.jpg
//!     1920x600, JPEG q85, 182.4 KB
//! ```
//!
//! ## Batch
//!
//! ```text
//! 001 a.jpg → out/a.jpg (256x256, 14.0 KB)
//! 002 b.jpg: skipped, not a decodable image
//! 003 c.jpg: failed, invalid dimension: square side must be positive
//!
//! Wrote 1 of 3 images (1 skipped, 1 failed)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::batch::{BatchOutcome, BatchStatus};
use crate::imaging::{EncodedImage, ImageInfo, Size};
use crate::presets::{Preset, PresetGeometry};
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// File name for display, falling back to the full path.
fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Human byte count: `812 B`, `14.0 KB`, `2.3 MB`.
pub fn format_bytes(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{bytes} B")
    } else if b < KB * KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.1} MB", b / (KB * KB))
    }
}

// ============================================================================
// Info / validate
// ============================================================================

pub fn format_info(path: &Path, info: &ImageInfo) -> Vec<String> {
    let format = info
        .format
        .map(|f| f.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    vec![
        display_name(path),
        format!("{}Format: {}", indent(1), format),
        format!("{}Mode: {}", indent(1), info.mode),
        format!("{}Size: {}x{}", indent(1), info.width, info.height),
        format!(
            "{}Alpha: {}",
            indent(1),
            if info.has_alpha { "yes" } else { "no" }
        ),
    ]
}

pub fn print_info(path: &Path, info: &ImageInfo) {
    for line in format_info(path, info) {
        println!("{}", line);
    }
}

pub fn format_validation(results: &[(&Path, bool)]) -> Vec<String> {
    let mut lines: Vec<String> = results
        .iter()
        .map(|(path, ok)| {
            let verdict = if *ok { "ok" } else { "invalid" };
            format!("{}: {}", path.display(), verdict)
        })
        .collect();
    if results.len() > 1 {
        let valid = results.iter().filter(|(_, ok)| *ok).count();
        lines.push(String::new());
        lines.push(format!("{} of {} valid", valid, results.len()));
    }
    lines
}

pub fn print_validation(results: &[(&Path, bool)]) {
    for line in format_validation(results) {
        println!("{}", line);
    }
}

// ============================================================================
// Single write
// ============================================================================

pub fn format_written(source: &Path, output: &Path, size: Size, encoded: &EncodedImage) -> Vec<String> {
    let quality = if encoded.format.is_lossy() {
        format!(" q{}", encoded.quality.value())
    } else {
        String::new()
    };
    vec![
        format!("{} → {}", display_name(source), output.display()),
        format!(
            "{}{}, {}{}, {}",
            indent(1),
            size,
            encoded.format,
            quality,
            format_bytes(encoded.len())
        ),
    ]
}

pub fn print_written(source: &Path, output: &Path, size: Size, encoded: &EncodedImage) {
    for line in format_written(source, output, size, encoded) {
        println!("{}", line);
    }
}

/// Printed when a command's source could not be decoded.
pub fn format_absent(source: &Path) -> String {
    format!("{}: not a decodable image, nothing written", source.display())
}

// ============================================================================
// Batch
// ============================================================================

pub fn format_batch(outcomes: &[BatchOutcome]) -> Vec<String> {
    let mut lines = Vec::with_capacity(outcomes.len() + 2);
    let (mut written, mut skipped, mut failed) = (0, 0, 0);

    for (i, outcome) in outcomes.iter().enumerate() {
        let name = display_name(&outcome.source);
        let line = match &outcome.status {
            BatchStatus::Written {
                output,
                size,
                bytes,
            } => {
                written += 1;
                format!(
                    "{} {} → {} ({}, {})",
                    format_index(i + 1),
                    name,
                    output.display(),
                    size,
                    format_bytes(*bytes)
                )
            }
            BatchStatus::Skipped => {
                skipped += 1;
                format!(
                    "{} {}: skipped, not a decodable image",
                    format_index(i + 1),
                    name
                )
            }
            BatchStatus::Failed(error) => {
                failed += 1;
                format!("{} {}: failed, {}", format_index(i + 1), name, error)
            }
        };
        lines.push(line);
    }

    lines.push(String::new());
    let mut summary = format!("Wrote {} of {} images", written, outcomes.len());
    match (skipped, failed) {
        (0, 0) => {}
        (s, 0) => summary.push_str(&format!(" ({} skipped)", s)),
        (0, f) => summary.push_str(&format!(" ({} failed)", f)),
        (s, f) => summary.push_str(&format!(" ({} skipped, {} failed)", s, f)),
    }
    lines.push(summary);
    lines
}

pub fn print_batch(outcomes: &[BatchOutcome]) {
    for line in format_batch(outcomes) {
        println!("{}", line);
    }
}

// ============================================================================
// Preset catalog
// ============================================================================

fn describe_geometry(geometry: PresetGeometry) -> String {
    match geometry {
        PresetGeometry::Square { side } => format!("square {side}"),
        PresetGeometry::Width { width } => format!("width {width}"),
        PresetGeometry::WidthThenCrop { size } => format!("width-fit, crop to {size}"),
        PresetGeometry::HeightThenCrop { size } => format!("height-fit, crop to {size}"),
        PresetGeometry::WidthWithRatio {
            width,
            height_ratio,
        } => format!("width {width}, height ≤ ×{height_ratio}"),
        PresetGeometry::HeightWithRatio { height, width_ratio } => {
            format!("height {height}, width ≤ ×{width_ratio}")
        }
    }
}

pub fn format_presets() -> Vec<String> {
    Preset::ALL
        .iter()
        .map(|preset| {
            let def = preset.definition();
            let sharpness = if def.sharpness == 1.0 {
                String::new()
            } else {
                format!(", sharpness ×{}", def.sharpness)
            };
            format!(
                "{:<16} {}{}, {} q{}",
                preset.name(),
                describe_geometry(def.geometry),
                sharpness,
                def.encode.format,
                def.encode.quality.value()
            )
        })
        .collect()
}

pub fn print_presets() {
    for line in format_presets() {
        println!("{}", line);
    }
}
