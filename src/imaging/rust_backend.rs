//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP, TIFF, BMP, GIF, ICO) | `image::ImageReader` with content sniffing |
//! | Resample | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Crop | `DynamicImage::crop_imm` |
//! | Brightness / contrast / sharpness | [`enhance`](super::enhance) factor kernels |
//! | Encode → JPEG | `JpegEncoder::new_with_quality` |
//! | Encode → PNG | `PngEncoder` with best compression |
//! | Encode → WebP | `WebPEncoder::new_lossless` |
//! | Encode → TIFF / BMP / GIF / ICO | `DynamicImage::write_to` |

use super::backend::{BackendError, ImageBackend};
use super::calculations::{CropRect, Size};
use super::enhance;
use super::handle::ImageHandle;
use super::params::{Adjustment, OutputFormat, Quality};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::borrow::Cow;
use std::io::{BufRead, Cursor, Seek};
use std::path::Path;
use std::sync::LazyLock;

const INPUT_CANDIDATES: &[(&str, image::ImageFormat)] = &[
    ("jpg", image::ImageFormat::Jpeg),
    ("jpeg", image::ImageFormat::Jpeg),
    ("png", image::ImageFormat::Png),
    ("webp", image::ImageFormat::WebP),
    ("tif", image::ImageFormat::Tiff),
    ("tiff", image::ImageFormat::Tiff),
    ("bmp", image::ImageFormat::Bmp),
    ("gif", image::ImageFormat::Gif),
    ("ico", image::ImageFormat::Ico),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    INPUT_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Backend built on the `image` crate.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_reader<R: BufRead + Seek>(
    reader: ImageReader<R>,
    origin: &str,
) -> Result<ImageHandle, BackendError> {
    let reader = reader.with_guessed_format()?;
    let format = reader.format().and_then(OutputFormat::from_image_format);
    let image = reader
        .decode()
        .map_err(|e| BackendError::Decode(format!("Failed to decode {origin}: {e}")))?;
    Ok(ImageHandle::new(image, format))
}

/// Convert to the 8-bit layout the target encoder accepts.
///
/// JPEG gets RGB or L (alpha dropped here if nobody flattened it);
/// everything else gets RGBA when alpha is present, RGB otherwise.
fn prepare_for_encoder(image: &DynamicImage, format: OutputFormat) -> Cow<'_, DynamicImage> {
    let color = image.color();
    match format {
        OutputFormat::Jpeg => match image {
            DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_) => Cow::Borrowed(image),
            _ if !color.has_color() => Cow::Owned(DynamicImage::ImageLuma8(image.to_luma8())),
            _ => Cow::Owned(DynamicImage::ImageRgb8(image.to_rgb8())),
        },
        _ => match image {
            DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => Cow::Borrowed(image),
            _ if color.has_alpha() => Cow::Owned(DynamicImage::ImageRgba8(image.to_rgba8())),
            _ => Cow::Owned(DynamicImage::ImageRgb8(image.to_rgb8())),
        },
    }
}

impl ImageBackend for RustBackend {
    fn decode(&self, path: &Path) -> Result<ImageHandle, BackendError> {
        let reader = ImageReader::open(path)?;
        decode_reader(reader, &path.display().to_string())
    }

    fn decode_bytes(&self, bytes: &[u8]) -> Result<ImageHandle, BackendError> {
        decode_reader(ImageReader::new(Cursor::new(bytes)), "buffer")
    }

    fn resample(&self, image: &DynamicImage, size: Size) -> Result<DynamicImage, BackendError> {
        if size.width == 0 || size.height == 0 {
            return Err(BackendError::ProcessingFailed(format!(
                "cannot resample to {size}"
            )));
        }
        if image.width() == size.width && image.height() == size.height {
            return Ok(image.clone());
        }
        Ok(image.resize_exact(size.width, size.height, FilterType::Lanczos3))
    }

    fn crop(&self, image: &DynamicImage, rect: CropRect) -> Result<DynamicImage, BackendError> {
        if rect.right > image.width()
            || rect.bottom > image.height()
            || rect.right <= rect.left
            || rect.bottom <= rect.top
        {
            return Err(BackendError::ProcessingFailed(format!(
                "crop {rect:?} outside {}x{} image",
                image.width(),
                image.height()
            )));
        }
        Ok(image.crop_imm(rect.left, rect.top, rect.width(), rect.height()))
    }

    fn enhance(
        &self,
        image: &DynamicImage,
        kind: Adjustment,
        factor: f32,
    ) -> Result<DynamicImage, BackendError> {
        enhance::apply(image, kind, factor).ok_or_else(|| {
            BackendError::ProcessingFailed(format!("{kind} enhancement produced a bad buffer"))
        })
    }

    fn encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError> {
        let prepared = prepare_for_encoder(image, format);
        let mut buf = Vec::new();

        let result = match format {
            OutputFormat::Jpeg => {
                prepared.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality.value()))
            }
            OutputFormat::Png => prepared.write_with_encoder(PngEncoder::new_with_quality(
                &mut buf,
                CompressionType::Best,
                PngFilter::Adaptive,
            )),
            OutputFormat::WebP => prepared.write_with_encoder(WebPEncoder::new_lossless(&mut buf)),
            other => prepared.write_to(&mut Cursor::new(&mut buf), other.to_image_format()),
        };

        result.map_err(|e| BackendError::Encode {
            format,
            message: e.to_string(),
        })?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{create_test_jpeg, create_test_png_rgba, gradient_rgb};

    #[test]
    fn supported_extensions_match_decodable_formats() {
        let exts = super::supported_input_extensions();
        for expected in &["jpg", "jpeg", "png", "tif", "tiff", "webp", "bmp", "gif", "ico"] {
            assert!(
                exts.contains(expected),
                "expected {expected} in supported extensions"
            );
        }
    }

    #[test]
    fn decode_synthetic_jpeg() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("test.jpg");
        create_test_jpeg(&path, 200, 150);

        let handle = RustBackend::new().decode(&path).unwrap();
        assert_eq!((handle.width(), handle.height()), (200, 150));
        assert_eq!(handle.source_format(), Some(OutputFormat::Jpeg));
    }

    #[test]
    fn decode_sniffs_content_not_extension() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("actually-png.jpg");
        create_test_png_rgba(&path, 20, 10);

        let handle = RustBackend::new().decode(&path).unwrap();
        assert_eq!(handle.source_format(), Some(OutputFormat::Png));
        assert!(handle.has_alpha());
    }

    #[test]
    fn decode_nonexistent_file_errors() {
        let result = RustBackend::new().decode(Path::new("/nonexistent/image.jpg"));
        assert!(result.unwrap_err().is_decode());
    }

    #[test]
    fn decode_garbage_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("garbage.png");
        std::fs::write(&path, b"definitely not an image").unwrap();

        let result = RustBackend::new().decode(&path);
        assert!(result.unwrap_err().is_decode());
    }

    #[test]
    fn resample_exact_size() {
        let img = gradient_rgb(400, 300);
        let out = RustBackend::new()
            .resample(&img, Size::new(123, 77))
            .unwrap();
        assert_eq!((out.width(), out.height()), (123, 77));
    }

    #[test]
    fn crop_out_of_bounds_errors() {
        let img = gradient_rgb(100, 100);
        let rect = CropRect {
            left: 50,
            top: 0,
            right: 150,
            bottom: 100,
        };
        assert!(RustBackend::new().crop(&img, rect).is_err());
    }

    #[test]
    fn encode_every_format_roundtrips_dimensions() {
        let backend = RustBackend::new();
        let img = gradient_rgb(48, 32);
        for format in OutputFormat::ALL {
            let bytes = backend.encode(&img, format, Quality::new(80)).unwrap();
            let decoded = backend.decode_bytes(&bytes).unwrap();
            assert_eq!(
                (decoded.width(), decoded.height()),
                (48, 32),
                "{format} changed dimensions"
            );
            assert_eq!(decoded.source_format(), Some(format));
        }
    }

    #[test]
    fn jpeg_quality_changes_size() {
        let backend = RustBackend::new();
        let img = gradient_rgb(256, 256);
        let high = backend.encode(&img, OutputFormat::Jpeg, Quality::new(95)).unwrap();
        let low = backend.encode(&img, OutputFormat::Jpeg, Quality::new(10)).unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn jpeg_drops_alpha() {
        let backend = RustBackend::new();
        let img = DynamicImage::ImageRgba8(image::RgbaImage::new(16, 16));
        let bytes = backend.encode(&img, OutputFormat::Jpeg, Quality::new(80)).unwrap();
        assert!(!backend.decode_bytes(&bytes).unwrap().has_alpha());
    }

    #[test]
    fn png_keeps_alpha() {
        let backend = RustBackend::new();
        let img = DynamicImage::ImageRgba8(image::RgbaImage::new(16, 16));
        let bytes = backend.encode(&img, OutputFormat::Png, Quality::new(80)).unwrap();
        assert!(backend.decode_bytes(&bytes).unwrap().has_alpha());
    }

    #[test]
    fn ico_rejects_oversized_images() {
        let backend = RustBackend::new();
        let img = gradient_rgb(300, 300);
        let err = backend
            .encode(&img, OutputFormat::Ico, Quality::new(80))
            .unwrap_err();
        assert!(matches!(
            err,
            BackendError::Encode {
                format: OutputFormat::Ico,
                ..
            }
        ));
    }
}
