//! Web output: alpha flattening and byte-budget encoding.
//!
//! ## Budget strategies
//!
//! | Strategy | Encodes | Result |
//! |---|---|---|
//! | [`BudgetStrategy::SingleRetry`] | at most 2 | `max(10, ⌊q · budget / size⌋)`, may still overshoot |
//! | [`BudgetStrategy::Bisect`] | `O(log q)` | highest quality that fits, else the smallest attempt |
//!
//! Both keep whichever attempt is smaller when nothing fits, so a budget
//! never makes the output larger than the unconstrained encode. Formats
//! whose encoder ignores quality skip the retry entirely.

use super::backend::ImageBackend;
use super::handle::ImageHandle;
use super::observer::{PipelineEvent, Stage};
use super::operations::{Pipeline, Result};
use super::params::{Background, BudgetStrategy, EncodeSpec, OutputFormat, Quality};
use image::{DynamicImage, Rgb, RgbImage};
use std::path::Path;

/// Encoded output plus the quality it was actually produced at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub quality: Quality,
}

impl EncodedImage {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Composite `image` over an opaque `background`, using alpha as the mask.
///
/// Always returns RGB8. Images without alpha are only converted.
pub fn flatten_alpha(image: &DynamicImage, background: Background) -> DynamicImage {
    if !image.color().has_alpha() {
        return DynamicImage::ImageRgb8(image.to_rgb8());
    }
    let rgba = image.to_rgba8();
    let Background(bg) = background;
    let flat = RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let a = a as u32;
        let mix = |fg: u8, bg: u8| ((fg as u32 * a + bg as u32 * (255 - a) + 127) / 255) as u8;
        Rgb([mix(r, bg[0]), mix(g, bg[1]), mix(b, bg[2])])
    });
    DynamicImage::ImageRgb8(flat)
}

/// Whether encoding `handle` to `format` needs a flatten first.
pub fn needs_flatten(handle: &ImageHandle, format: OutputFormat) -> bool {
    handle.has_alpha() && !format.supports_alpha()
}

/// Quality for the single retry: `max(10, ⌊quality · limit / actual⌋)`.
fn retry_quality(quality: Quality, limit: u64, actual: u64) -> Quality {
    let scaled = quality.value() as u64 * limit / actual.max(1);
    Quality::new(scaled as u32).max(Quality::BUDGET_FLOOR)
}

impl<B: ImageBackend> Pipeline<'_, B> {
    fn encode_at(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<EncodedImage> {
        let bytes = self.backend().encode(image, format, quality)?;
        Ok(EncodedImage {
            bytes,
            format,
            quality,
        })
    }

    /// Encode once at `spec.quality`, then apply the budget strategy if a
    /// byte ceiling is set and the first attempt exceeds it.
    pub fn encode_with_budget(&self, image: &DynamicImage, spec: &EncodeSpec) -> Result<EncodedImage> {
        let first = self.encode_at(image, spec.format, spec.quality)?;
        let Some(limit) = spec.max_size_bytes else {
            return Ok(first);
        };
        let actual = first.len() as u64;
        if actual <= limit {
            return Ok(first);
        }
        if !spec.format.is_lossy() {
            self.emit(PipelineEvent::Note {
                stage: Stage::Encode,
                message: format!(
                    "{} ignores quality, keeping {actual} bytes over {limit} byte budget",
                    spec.format
                ),
            });
            return Ok(first);
        }

        match spec.budget {
            BudgetStrategy::SingleRetry => {
                let quality = retry_quality(spec.quality, limit, actual);
                if quality >= first.quality {
                    return Ok(first);
                }
                let second = self.encode_at(image, spec.format, quality)?;
                self.emit(PipelineEvent::Note {
                    stage: Stage::Encode,
                    message: format!(
                        "budget retry at q{}: {actual} -> {} bytes (limit {limit})",
                        quality.value(),
                        second.len()
                    ),
                });
                Ok(if second.len() < first.len() {
                    second
                } else {
                    first
                })
            }
            BudgetStrategy::Bisect => self.bisect_quality(image, spec, limit, first),
        }
    }

    /// Binary search `[10, quality - 1]` for the highest quality within `limit`.
    fn bisect_quality(
        &self,
        image: &DynamicImage,
        spec: &EncodeSpec,
        limit: u64,
        first: EncodedImage,
    ) -> Result<EncodedImage> {
        let mut lo = Quality::BUDGET_FLOOR.value();
        let mut hi = spec.quality.value().saturating_sub(1);
        let mut best: Option<EncodedImage> = None;
        let mut smallest = first;

        while lo <= hi {
            let mid = lo + (hi - lo) / 2;
            let attempt = self.encode_at(image, spec.format, Quality::new(mid as u32))?;
            if attempt.len() as u64 <= limit {
                lo = mid + 1;
                best = Some(attempt);
            } else {
                hi = mid - 1;
                if attempt.len() < smallest.len() {
                    smallest = attempt;
                }
            }
        }

        let chosen = best.unwrap_or(smallest);
        self.emit(PipelineEvent::Note {
            stage: Stage::Encode,
            message: format!(
                "bisected to q{}: {} bytes (limit {limit})",
                chosen.quality.value(),
                chosen.len()
            ),
        });
        Ok(chosen)
    }

    /// Flatten if the format needs it, then budget-encode.
    pub fn encode(&self, handle: &ImageHandle, spec: &EncodeSpec) -> Result<EncodedImage> {
        self.emit(PipelineEvent::Started {
            stage: Stage::Encode,
            detail: format!("{} q{}", spec.format, spec.quality.value()),
        });
        let flattened;
        let image = if needs_flatten(handle, spec.format) {
            flattened = flatten_alpha(handle.image(), spec.background);
            &flattened
        } else {
            handle.image()
        };
        match self.encode_with_budget(image, spec) {
            Ok(encoded) => {
                self.emit(PipelineEvent::Finished {
                    stage: Stage::Encode,
                    size: handle.size(),
                });
                Ok(encoded)
            }
            Err(e) => {
                self.emit(PipelineEvent::Failed {
                    stage: Stage::Encode,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Re-encode for the web and decode the result back into a handle.
    ///
    /// If the encoder rejects the pixels the pre-optimization handle is
    /// returned unchanged. Decoding the freshly encoded bytes must succeed.
    pub fn optimize_for_web(&self, handle: ImageHandle, spec: &EncodeSpec) -> Result<ImageHandle> {
        let encoded = match self.encode(&handle, spec) {
            Ok(encoded) => encoded,
            Err(_) => {
                self.emit(PipelineEvent::Note {
                    stage: Stage::Optimize,
                    message: "encode failed, keeping unoptimized image".to_string(),
                });
                return Ok(handle);
            }
        };
        self.run_stage(Stage::Optimize, format!("{} bytes", encoded.len()), || {
            Ok(self.backend().decode_bytes(&encoded.bytes)?)
        })
    }

    /// Convert pixels for `format`: flatten over `background` when the
    /// format has no alpha, normalize to RGBA when it does. Opaque sources
    /// bound for an alpha-capable format come out RGBA too.
    pub fn convert(
        &self,
        handle: ImageHandle,
        format: OutputFormat,
        background: Background,
    ) -> ImageHandle {
        if format.supports_alpha() {
            if matches!(handle.image(), DynamicImage::ImageRgba8(_)) {
                return handle;
            }
            let rgba = DynamicImage::ImageRgba8(handle.image().to_rgba8());
            return handle.with_image(rgba);
        }
        if !handle.has_alpha() {
            return handle;
        }
        self.emit(PipelineEvent::Note {
            stage: Stage::Flatten,
            message: format!("flattening alpha for {format}"),
        });
        let flat = flatten_alpha(handle.image(), background);
        handle.with_image(flat)
    }

    /// Encode with `spec` and write the bytes to `path`.
    pub fn save(&self, handle: &ImageHandle, path: &Path, spec: &EncodeSpec) -> Result<EncodedImage> {
        let encoded = self.encode(handle, spec)?;
        std::fs::write(path, &encoded.bytes).map_err(super::backend::BackendError::from)?;
        Ok(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp, blank_handle};
    use crate::imaging::calculations::Size;
    use crate::imaging::operations::PipelineError;
    use image::{ColorType, Rgba, RgbaImage};
    use std::sync::Mutex;

    fn rgba_handle(width: u32, height: u32) -> ImageHandle {
        blank_handle(width, height, ColorType::Rgba8)
    }

    #[test]
    fn flatten_turns_transparent_pixels_into_background() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 3, Rgba([10, 20, 30, 0])));
        let flat = flatten_alpha(&img, Background::WHITE).to_rgb8();
        assert!(flat.pixels().all(|p| p.0 == [255, 255, 255]));
    }

    #[test]
    fn flatten_keeps_opaque_pixels() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 255])));
        let flat = flatten_alpha(&img, Background::WHITE).to_rgb8();
        assert_eq!(flat.get_pixel(0, 0).0, [10, 20, 30]);
    }

    #[test]
    fn flatten_blends_half_alpha() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 128])));
        let flat = flatten_alpha(&img, Background::WHITE).to_rgb8();
        // 255 * 127 / 255 rounded
        assert_eq!(flat.get_pixel(0, 0).0, [127, 127, 127]);
    }

    #[test]
    fn no_budget_encodes_once() {
        let backend = MockBackend::new();
        let pipeline = Pipeline::new(&backend);
        let spec = EncodeSpec::new(OutputFormat::Jpeg);

        let out = pipeline.encode(&rgba_handle(8, 8), &spec).unwrap();

        assert_eq!(out.len(), 9500);
        assert_eq!(backend.encodes(), vec![(OutputFormat::Jpeg, 95)]);
    }

    #[test]
    fn single_retry_scales_quality_once() {
        let backend = MockBackend::new();
        let spec = EncodeSpec::new(OutputFormat::Jpeg).with_max_size(Some(5000));

        let out = Pipeline::new(&backend)
            .encode(&rgba_handle(8, 8), &spec)
            .unwrap();

        // 95 * 5000 / 9500 = 50
        assert_eq!(out.quality, Quality::new(50));
        assert!(out.len() <= 5000);
        assert_eq!(
            backend.encodes(),
            vec![(OutputFormat::Jpeg, 95), (OutputFormat::Jpeg, 50)]
        );
    }

    #[test]
    fn single_retry_floors_at_ten_and_still_shrinks() {
        let backend = MockBackend::new();
        let spec = EncodeSpec::new(OutputFormat::Jpeg).with_max_size(Some(500));

        let out = Pipeline::new(&backend)
            .encode(&rgba_handle(8, 8), &spec)
            .unwrap();

        assert_eq!(out.quality, Quality::BUDGET_FLOOR);
        assert!(out.len() > 500);
        assert!(out.len() < 9500);
        assert_eq!(backend.encodes().len(), 2);
    }

    #[test]
    fn budget_already_met_skips_retry() {
        let backend = MockBackend::new();
        let spec = EncodeSpec::new(OutputFormat::Jpeg).with_max_size(Some(1_000_000));
        Pipeline::new(&backend)
            .encode(&rgba_handle(8, 8), &spec)
            .unwrap();
        assert_eq!(backend.encodes().len(), 1);
    }

    #[test]
    fn lossless_format_skips_retry() {
        let backend = MockBackend::new();
        let spec = EncodeSpec::new(OutputFormat::Png).with_max_size(Some(10));
        let out = Pipeline::new(&backend)
            .encode(&rgba_handle(8, 8), &spec)
            .unwrap();
        assert_eq!(out.quality, Quality::new(95));
        assert_eq!(backend.encodes().len(), 1);
    }

    #[test]
    fn bisect_finds_highest_fitting_quality() {
        let backend = MockBackend::new();
        let spec = EncodeSpec::new(OutputFormat::Jpeg)
            .with_max_size(Some(4321))
            .with_budget(BudgetStrategy::Bisect);

        let out = Pipeline::new(&backend)
            .encode(&rgba_handle(8, 8), &spec)
            .unwrap();

        assert_eq!(out.quality, Quality::new(43));
        assert!(backend.encodes().len() <= 8);
    }

    #[test]
    fn bisect_falls_back_to_smallest_attempt() {
        let backend = MockBackend::new();
        let spec = EncodeSpec::new(OutputFormat::Jpeg)
            .with_max_size(Some(100))
            .with_budget(BudgetStrategy::Bisect);

        let out = Pipeline::new(&backend)
            .encode(&rgba_handle(8, 8), &spec)
            .unwrap();

        assert_eq!(out.quality, Quality::BUDGET_FLOOR);
        assert_eq!(out.len(), 1000);
    }

    #[test]
    fn optimize_flattens_for_jpeg() {
        let backend = MockBackend::new();
        let spec = EncodeSpec::new(OutputFormat::Jpeg);

        let out = Pipeline::new(&backend)
            .optimize_for_web(rgba_handle(40, 30), &spec)
            .unwrap();

        assert_eq!(out.size(), Size::new(40, 30));
        assert!(!out.has_alpha());
    }

    #[test]
    fn optimize_keeps_alpha_for_png() {
        let backend = MockBackend::new();
        let spec = EncodeSpec::new(OutputFormat::Png);

        let out = Pipeline::new(&backend)
            .optimize_for_web(rgba_handle(40, 30), &spec)
            .unwrap();

        assert!(out.has_alpha());
        assert!(matches!(
            backend.get_operations().last(),
            Some(RecordedOp::DecodeBytes(_))
        ));
    }

    #[test]
    fn optimize_degrades_to_input_on_encode_failure() {
        let backend = MockBackend {
            fail_encode: true,
            ..MockBackend::default()
        };
        let events = Mutex::new(Vec::new());
        let observer = |event: &PipelineEvent| events.lock().unwrap().push(event.clone());
        let pipeline = Pipeline::new(&backend).with_observer(&observer);

        let handle = rgba_handle(12, 7);
        let out = pipeline
            .optimize_for_web(handle, &EncodeSpec::new(OutputFormat::Jpeg))
            .unwrap();

        assert_eq!(out.size(), Size::new(12, 7));
        assert!(out.has_alpha(), "pre-optimization handle comes back as-is");
        assert!(events.into_inner().unwrap().iter().any(|e| matches!(
            e,
            PipelineEvent::Failed {
                stage: Stage::Encode,
                ..
            }
        )));
    }

    #[test]
    fn encode_propagates_failure_outside_optimize() {
        let backend = MockBackend {
            fail_encode: true,
            ..MockBackend::default()
        };
        let result = Pipeline::new(&backend).encode(&rgba_handle(2, 2), &EncodeSpec::default());
        assert!(matches!(result, Err(PipelineError::Backend(_))));
    }

    #[test]
    fn convert_flattens_only_for_alpha_incapable_formats() {
        let backend = MockBackend::new();
        let pipeline = Pipeline::new(&backend);

        let png = pipeline.convert(rgba_handle(2, 2), OutputFormat::Png, Background::WHITE);
        assert!(png.has_alpha());

        let jpeg = pipeline.convert(rgba_handle(2, 2), OutputFormat::Jpeg, Background::WHITE);
        assert!(!jpeg.has_alpha());
        assert_eq!(jpeg.image().to_rgb8().get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn convert_promotes_opaque_sources_to_rgba_for_alpha_formats() {
        let backend = MockBackend::new();
        let pipeline = Pipeline::new(&backend);

        for format in [OutputFormat::Png, OutputFormat::WebP, OutputFormat::Tiff] {
            let out = pipeline.convert(blank_handle(4, 3, ColorType::Rgb8), format, Background::WHITE);
            assert!(matches!(out.image(), DynamicImage::ImageRgba8(_)), "{format}");
            assert_eq!(out.size(), Size::new(4, 3));
        }

        let jpeg = pipeline.convert(
            blank_handle(4, 3, ColorType::Rgb8),
            OutputFormat::Jpeg,
            Background::WHITE,
        );
        assert!(matches!(jpeg.image(), DynamicImage::ImageRgb8(_)));
    }

    #[test]
    fn save_writes_encoded_bytes() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("out.png");
        let backend = MockBackend::new();

        let encoded = Pipeline::new(&backend)
            .save(&rgba_handle(5, 5), &path, &EncodeSpec::new(OutputFormat::Png))
            .unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), encoded.bytes);
    }
}
