//! The decoded image as it moves through the pipeline.

use super::calculations::Size;
use super::params::OutputFormat;
use image::{ColorType, DynamicImage};
use serde::Serialize;

/// Channel layout of a decoded image.
///
/// Palette images are expanded by the decoder, so they arrive as
/// [`ColorMode::Rgb`] or [`ColorMode::Rgba`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColorMode {
    #[serde(rename = "RGB")]
    Rgb,
    #[serde(rename = "RGBA")]
    Rgba,
    #[serde(rename = "L")]
    Grayscale,
    #[serde(rename = "LA")]
    GrayscaleAlpha,
}

impl ColorMode {
    pub fn of(color: ColorType) -> Self {
        match (color.has_color(), color.has_alpha()) {
            (true, true) => ColorMode::Rgba,
            (true, false) => ColorMode::Rgb,
            (false, true) => ColorMode::GrayscaleAlpha,
            (false, false) => ColorMode::Grayscale,
        }
    }

    pub fn has_alpha(self) -> bool {
        matches!(self, ColorMode::Rgba | ColorMode::GrayscaleAlpha)
    }
}

impl std::fmt::Display for ColorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ColorMode::Rgb => "RGB",
            ColorMode::Rgba => "RGBA",
            ColorMode::Grayscale => "L",
            ColorMode::GrayscaleAlpha => "LA",
        })
    }
}

/// Decoded pixels plus the format they were read from.
///
/// Each pipeline stage takes the handle by value and hands back a new one,
/// so a handle is never shared between stages.
#[derive(Debug, Clone)]
pub struct ImageHandle {
    image: DynamicImage,
    source_format: Option<OutputFormat>,
}

impl ImageHandle {
    pub fn new(image: DynamicImage, source_format: Option<OutputFormat>) -> Self {
        Self {
            image,
            source_format,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }

    pub fn color_mode(&self) -> ColorMode {
        ColorMode::of(self.image.color())
    }

    pub fn has_alpha(&self) -> bool {
        self.color_mode().has_alpha()
    }

    pub fn source_format(&self) -> Option<OutputFormat> {
        self.source_format
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_image(self) -> DynamicImage {
        self.image
    }

    /// Replace the pixels, keeping the source format.
    pub fn with_image(self, image: DynamicImage) -> Self {
        Self {
            image,
            source_format: self.source_format,
        }
    }

    pub fn info(&self) -> ImageInfo {
        ImageInfo {
            format: self.source_format,
            mode: self.color_mode(),
            width: self.width(),
            height: self.height(),
            has_alpha: self.has_alpha(),
        }
    }
}

/// Summary of a handle, suitable for printing or JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    pub format: Option<OutputFormat>,
    pub mode: ColorMode,
    pub width: u32,
    pub height: u32,
    pub has_alpha: bool,
}
