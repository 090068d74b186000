//! Image processing backend trait and shared error type.
//!
//! The [`ImageBackend`] trait is the seam to the codec/resampling library:
//! decode, resample, crop, enhance and encode. Everything above it (geometry,
//! stage sequencing, budget logic, presets) is backend-agnostic.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests use a recording mock so pipeline decisions can be asserted
//! without touching pixels.

use super::calculations::{CropRect, Size};
use super::handle::ImageHandle;
use super::params::{Adjustment, OutputFormat, Quality};
use image::DynamicImage;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("{format} encode failed: {message}")]
    Encode {
        format: OutputFormat,
        message: String,
    },
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

impl BackendError {
    /// Errors that mean "the source is not a usable image".
    pub fn is_decode(&self) -> bool {
        matches!(self, BackendError::Io(_) | BackendError::Decode(_))
    }
}

/// Pixel-level operations delegated to an image library.
///
/// Methods borrow their input and return fresh pixels; ownership of the
/// [`ImageHandle`] chain stays with the caller.
pub trait ImageBackend: Sync {
    /// Decode an image file, recording the detected format.
    fn decode(&self, path: &Path) -> Result<ImageHandle, BackendError>;

    /// Decode an in-memory encoded image.
    fn decode_bytes(&self, bytes: &[u8]) -> Result<ImageHandle, BackendError>;

    /// Resample to exactly `size` with a high-quality (Lanczos-class) filter.
    fn resample(&self, image: &DynamicImage, size: Size) -> Result<DynamicImage, BackendError>;

    /// Cut `rect` out of `image`. The rectangle must lie within bounds.
    fn crop(&self, image: &DynamicImage, rect: CropRect) -> Result<DynamicImage, BackendError>;

    /// Apply a factor-driven enhancement.
    fn enhance(
        &self,
        image: &DynamicImage,
        kind: Adjustment,
        factor: f32,
    ) -> Result<DynamicImage, BackendError>;

    /// Encode to `format`. Alpha is dropped if the format cannot carry it.
    fn encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, BackendError>;
}
