//! Parameter types for image operations.
//!
//! These describe *what* to do, not *how*. The [`operations`](super::operations)
//! and [`web`](super::web) modules turn them into calls on an
//! [`ImageBackend`](super::backend::ImageBackend).
//!
//! ## Types
//!
//! - [`Quality`] — Lossy encoding quality (1–100). Clamped on construction.
//! - [`Background`] — Opaque RGB color used when flattening alpha.
//! - [`OutputFormat`] — The closed set of encodable formats and their alpha capability.
//! - [`EncodeSpec`] — Format + quality + background + optional byte budget.
//! - [`Adjustment`] — Brightness, contrast or sharpness, driven by a factor.
//! - [`CropAnchor`] — Where a crop sits along one axis.
//! - [`BudgetStrategy`] — How a byte budget is chased once the first encode is too big.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Quality(u8);

impl Quality {
    /// Floor used when shrinking quality to meet a byte budget.
    pub const BUDGET_FLOOR: Quality = Quality(10);

    pub const fn new(value: u32) -> Self {
        let value = if value < 1 {
            1
        } else if value > 100 {
            100
        } else {
            value
        };
        Self(value as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(95)
    }
}

/// Opaque background color for alpha flattening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Background(pub [u8; 3]);

impl Background {
    pub const WHITE: Background = Background([255, 255, 255]);
    pub const BLACK: Background = Background([0, 0, 0]);
}

impl Default for Background {
    fn default() -> Self {
        Self::WHITE
    }
}

impl FromStr for Background {
    type Err = String;

    /// Parses `#rrggbb`, `rrggbb` or `r,g,b`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.contains(',') {
            let parts: Vec<&str> = s.split(',').map(str::trim).collect();
            if parts.len() != 3 {
                return Err(format!("expected r,g,b but got '{s}'"));
            }
            let mut rgb = [0u8; 3];
            for (slot, part) in rgb.iter_mut().zip(parts) {
                *slot = part
                    .parse()
                    .map_err(|_| format!("invalid color component '{part}'"))?;
            }
            return Ok(Self(rgb));
        }

        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(format!("expected #rrggbb but got '{s}'"));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| format!("invalid hex color '{s}'"))
        };
        Ok(Self([channel(0)?, channel(2)?, channel(4)?]))
    }
}

/// Formats the pipeline can encode to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[serde(alias = "jpg")]
    Jpeg,
    Png,
    #[serde(rename = "webp")]
    WebP,
    Tiff,
    Bmp,
    Gif,
    Ico,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 7] = [
        OutputFormat::Jpeg,
        OutputFormat::Png,
        OutputFormat::WebP,
        OutputFormat::Tiff,
        OutputFormat::Bmp,
        OutputFormat::Gif,
        OutputFormat::Ico,
    ];

    /// Whether the encoded file can carry an alpha channel.
    ///
    /// Only JPEG cannot; BMP is written as 32-bit when alpha is present.
    pub fn supports_alpha(self) -> bool {
        !matches!(self, OutputFormat::Jpeg)
    }

    /// Whether the codec honors the quality setting.
    pub fn is_lossy(self) -> bool {
        matches!(self, OutputFormat::Jpeg)
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
            OutputFormat::Tiff => "tiff",
            OutputFormat::Bmp => "bmp",
            OutputFormat::Gif => "gif",
            OutputFormat::Ico => "ico",
        }
    }

    pub fn to_image_format(self) -> image::ImageFormat {
        match self {
            OutputFormat::Jpeg => image::ImageFormat::Jpeg,
            OutputFormat::Png => image::ImageFormat::Png,
            OutputFormat::WebP => image::ImageFormat::WebP,
            OutputFormat::Tiff => image::ImageFormat::Tiff,
            OutputFormat::Bmp => image::ImageFormat::Bmp,
            OutputFormat::Gif => image::ImageFormat::Gif,
            OutputFormat::Ico => image::ImageFormat::Ico,
        }
    }

    pub fn from_image_format(format: image::ImageFormat) -> Option<Self> {
        OutputFormat::ALL
            .into_iter()
            .find(|f| f.to_image_format() == format)
    }

    /// Guess the format from a file extension (case-insensitive).
    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.parse().ok())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::WebP),
            "tif" | "tiff" => Ok(OutputFormat::Tiff),
            "bmp" => Ok(OutputFormat::Bmp),
            "gif" => Ok(OutputFormat::Gif),
            "ico" => Ok(OutputFormat::Ico),
            other => Err(format!("unsupported output format: {other}")),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::Png => "PNG",
            OutputFormat::WebP => "WEBP",
            OutputFormat::Tiff => "TIFF",
            OutputFormat::Bmp => "BMP",
            OutputFormat::Gif => "GIF",
            OutputFormat::Ico => "ICO",
        };
        f.write_str(name)
    }
}

/// How to react when the first encode exceeds the byte budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BudgetStrategy {
    /// One re-encode at `max(10, quality * budget / actual)`. May still overshoot.
    #[default]
    SingleRetry,
    /// Binary search over quality for the highest setting within budget.
    Bisect,
}

impl FromStr for BudgetStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single-retry" => Ok(BudgetStrategy::SingleRetry),
            "bisect" => Ok(BudgetStrategy::Bisect),
            other => Err(format!("unknown budget strategy: {other}")),
        }
    }
}

/// Everything the encode step needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeSpec {
    pub format: OutputFormat,
    pub quality: Quality,
    pub background: Background,
    /// Byte ceiling; `None` skips the budget step entirely.
    pub max_size_bytes: Option<u64>,
    pub budget: BudgetStrategy,
}

impl EncodeSpec {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_background(mut self, background: Background) -> Self {
        self.background = background;
        self
    }

    pub fn with_max_size(mut self, bytes: Option<u64>) -> Self {
        self.max_size_bytes = bytes;
        self
    }

    pub fn with_budget(mut self, budget: BudgetStrategy) -> Self {
        self.budget = budget;
        self
    }
}

impl Default for EncodeSpec {
    fn default() -> Self {
        Self {
            format: OutputFormat::Jpeg,
            quality: Quality::default(),
            background: Background::WHITE,
            max_size_bytes: None,
            budget: BudgetStrategy::SingleRetry,
        }
    }
}

/// Enhancement kinds. A factor of `1.0` leaves the image untouched.
///
/// - Brightness: `0.0` is black, `> 1.0` brightens.
/// - Contrast: `0.0` is flat mean gray, `> 1.0` increases contrast.
/// - Sharpness: `0.0` is smoothed, `> 1.0` sharpens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Adjustment {
    Brightness,
    Contrast,
    Sharpness,
}

impl std::fmt::Display for Adjustment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Adjustment::Brightness => "brightness",
            Adjustment::Contrast => "contrast",
            Adjustment::Sharpness => "sharpness",
        })
    }
}

/// Placement of a crop along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CropAnchor {
    /// Left or top edge.
    Start,
    #[default]
    Center,
    /// Right or bottom edge.
    End,
}

impl CropAnchor {
    /// Offset of the crop given the total margin on this axis.
    pub fn offset(self, margin: u32) -> u32 {
        match self {
            CropAnchor::Start => 0,
            CropAnchor::Center => margin / 2,
            CropAnchor::End => margin,
        }
    }
}

impl FromStr for CropAnchor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" | "top" | "start" => Ok(CropAnchor::Start),
            "center" | "middle" => Ok(CropAnchor::Center),
            "right" | "bottom" | "end" => Ok(CropAnchor::End),
            other => Err(format!("unknown crop position: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_95() {
        assert_eq!(Quality::default().value(), 95);
    }

    #[test]
    fn background_parses_hex_and_triplets() {
        assert_eq!("#ff8000".parse::<Background>().unwrap().0, [255, 128, 0]);
        assert_eq!("000000".parse::<Background>().unwrap(), Background::BLACK);
        assert_eq!("10, 20, 30".parse::<Background>().unwrap().0, [10, 20, 30]);
        assert!("#fff".parse::<Background>().is_err());
        assert!("1,2".parse::<Background>().is_err());
        assert!("300,0,0".parse::<Background>().is_err());
    }

    #[test]
    fn output_format_parses_aliases() {
        assert_eq!("JPG".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!("jpeg".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!("tif".parse::<OutputFormat>().unwrap(), OutputFormat::Tiff);
        assert!("avif".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn output_format_from_path() {
        let path = std::path::Path::new("/out/logo.PNG");
        assert_eq!(OutputFormat::from_path(path), Some(OutputFormat::Png));
        assert_eq!(OutputFormat::from_path(std::path::Path::new("noext")), None);
    }

    #[test]
    fn only_jpeg_lacks_alpha() {
        let without: Vec<_> = OutputFormat::ALL
            .into_iter()
            .filter(|f| !f.supports_alpha())
            .collect();
        assert_eq!(without, vec![OutputFormat::Jpeg]);
    }

    #[test]
    fn image_format_mapping_is_bijective() {
        for format in OutputFormat::ALL {
            assert_eq!(
                OutputFormat::from_image_format(format.to_image_format()),
                Some(format)
            );
        }
    }

    #[test]
    fn crop_anchor_offsets() {
        assert_eq!(CropAnchor::Start.offset(9), 0);
        assert_eq!(CropAnchor::Center.offset(9), 4);
        assert_eq!(CropAnchor::End.offset(9), 9);
        assert_eq!("bottom".parse::<CropAnchor>().unwrap(), CropAnchor::End);
    }

    #[test]
    fn encode_spec_builder() {
        let spec = EncodeSpec::new(OutputFormat::Png)
            .with_quality(Quality::new(70))
            .with_max_size(Some(1024));
        assert_eq!(spec.format, OutputFormat::Png);
        assert_eq!(spec.quality.value(), 70);
        assert_eq!(spec.background, Background::WHITE);
        assert_eq!(spec.max_size_bytes, Some(1024));
        assert_eq!(spec.budget, BudgetStrategy::SingleRetry);
    }
}
