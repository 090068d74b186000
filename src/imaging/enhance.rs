//! Factor-driven enhancements.
//!
//! Each adjustment blends the image with a *degenerate* version of itself:
//! `out = degenerate + factor * (pixel - degenerate)`, clamped to `0..=255`.
//!
//! | Adjustment | Degenerate image |
//! |---|---|
//! | Brightness | black |
//! | Contrast | solid gray at the mean luma |
//! | Sharpness | 3×3 smoothed copy (center weight 5), borders unchanged |
//!
//! So `factor = 1.0` is identity, `0.0` yields the degenerate image, and
//! values above one extrapolate away from it. Alpha is never touched.
//! Images are processed at 8 bits per channel.

use super::params::Adjustment;
use image::{DynamicImage, GrayAlphaImage, GrayImage, RgbImage, RgbaImage, imageops};

/// 8-bit channel layout the kernels operate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    L,
    La,
    Rgb,
    Rgba,
}

impl Layout {
    fn channels(self) -> usize {
        match self {
            Layout::L => 1,
            Layout::La => 2,
            Layout::Rgb => 3,
            Layout::Rgba => 4,
        }
    }

    fn color_channels(self) -> usize {
        match self {
            Layout::L | Layout::La => 1,
            Layout::Rgb | Layout::Rgba => 3,
        }
    }
}

fn flatten_to_bytes(image: &DynamicImage) -> (Vec<u8>, Layout) {
    let color = image.color();
    match (color.has_color(), color.has_alpha()) {
        (true, true) => (image.to_rgba8().into_raw(), Layout::Rgba),
        (true, false) => (image.to_rgb8().into_raw(), Layout::Rgb),
        (false, true) => (image.to_luma_alpha8().into_raw(), Layout::La),
        (false, false) => (image.to_luma8().into_raw(), Layout::L),
    }
}

fn rebuild(raw: Vec<u8>, layout: Layout, width: u32, height: u32) -> Option<DynamicImage> {
    match layout {
        Layout::L => GrayImage::from_raw(width, height, raw).map(DynamicImage::ImageLuma8),
        Layout::La => GrayAlphaImage::from_raw(width, height, raw).map(DynamicImage::ImageLumaA8),
        Layout::Rgb => RgbImage::from_raw(width, height, raw).map(DynamicImage::ImageRgb8),
        Layout::Rgba => RgbaImage::from_raw(width, height, raw).map(DynamicImage::ImageRgba8),
    }
}

/// Apply `kind` with `factor`. Returns `None` only if the pixel buffer
/// could not be reassembled, which indicates a size mismatch.
pub fn apply(image: &DynamicImage, kind: Adjustment, factor: f32) -> Option<DynamicImage> {
    let (width, height) = (image.width(), image.height());
    let (raw, layout) = flatten_to_bytes(image);

    let degenerate = match kind {
        Adjustment::Brightness => vec![0u8; raw.len()],
        Adjustment::Contrast => {
            let mean = mean_luma(&raw, layout);
            vec![mean; raw.len()]
        }
        Adjustment::Sharpness => smooth(&raw, layout, width, height)?,
    };

    let blended = blend(&raw, &degenerate, layout, factor);
    rebuild(blended, layout, width, height)
}

/// Extrapolate each color channel from `degenerate` towards `raw` by `factor`.
fn blend(raw: &[u8], degenerate: &[u8], layout: Layout, factor: f32) -> Vec<u8> {
    let channels = layout.channels();
    let color_channels = layout.color_channels();

    raw.iter()
        .zip(degenerate)
        .enumerate()
        .map(|(i, (&px, &deg))| {
            if i % channels >= color_channels {
                return px;
            }
            let deg = deg as f32;
            (deg + factor * (px as f32 - deg)).round().clamp(0.0, 255.0) as u8
        })
        .collect()
}

/// Mean luma (ITU-R 601-2) rounded to the nearest integer.
fn mean_luma(raw: &[u8], layout: Layout) -> u8 {
    let channels = layout.channels();
    let pixels = raw.len() / channels;
    if pixels == 0 {
        return 0;
    }

    let total: u64 = raw
        .chunks_exact(channels)
        .map(|px| match layout {
            Layout::L | Layout::La => px[0] as u64 * 1000,
            Layout::Rgb | Layout::Rgba => {
                px[0] as u64 * 299 + px[1] as u64 * 587 + px[2] as u64 * 114
            }
        })
        .sum();

    let mean = total as f64 / 1000.0 / pixels as f64;
    (mean + 0.5).floor().min(255.0) as u8
}

/// 3×3 smoothing with weights `[1 1 1; 1 5 1; 1 1 1] / 13`.
///
/// Border pixels are copied from the source. `None` if `raw` does not
/// match the dimensions.
fn smooth(raw: &[u8], layout: Layout, width: u32, height: u32) -> Option<Vec<u8>> {
    const KERNEL: [f32; 9] = [1.0, 1.0, 1.0, 1.0, 5.0, 1.0, 1.0, 1.0, 1.0];

    if width < 3 || height < 3 {
        return Some(raw.to_vec());
    }
    let filtered = match rebuild(raw.to_vec(), layout, width, height)? {
        DynamicImage::ImageLuma8(buf) => imageops::filter3x3(&buf, &KERNEL).into_raw(),
        DynamicImage::ImageLumaA8(buf) => imageops::filter3x3(&buf, &KERNEL).into_raw(),
        DynamicImage::ImageRgb8(buf) => imageops::filter3x3(&buf, &KERNEL).into_raw(),
        DynamicImage::ImageRgba8(buf) => imageops::filter3x3(&buf, &KERNEL).into_raw(),
        _ => return None,
    };

    let row = width as usize * layout.channels();
    let inner = (width as usize - 2) * layout.channels();
    let mut out = raw.to_vec();
    for y in 1..height as usize - 1 {
        let start = y * row + layout.channels();
        out[start..start + inner].copy_from_slice(&filtered[start..start + inner]);
    }
    Some(out)
}
