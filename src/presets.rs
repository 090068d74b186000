//! Named one-call transforms.
//!
//! Every preset is a fixed [`PresetDefinition`]: a geometry, a sharpness
//! factor and an [`EncodeSpec`]. Running a preset is always
//! `load → geometry → sharpness → optimize_for_web`.
//!
//! | Preset | Geometry | Sharpness | Encode |
//! |---|---|---|---|
//! | `profile` (`avatar`) | square 256 | 1.2 | JPEG q85 |
//! | `icon` | square 256 | 5.0 | JPEG q85 |
//! | `thumbnail` | width 400, no crop | — | JPEG q85 |
//! | `logo-square` | square 512 | 2.0 | PNG q95, white background |
//! | `logo-horizontal` | width 512, height ≤ width × 0.5 | 2.0 | PNG q95, white background |
//! | `logo-vertical` | height 512, width ≤ height × 0.6 | 2.0 | PNG q95, white background |
//! | `poster` | height-fit then crop to 1200×1800 | — | JPEG q85 |
//! | `banner` | width-fit then crop to 1920×600 | — | JPEG q85 |
//! | `cover` | width-fit then crop to 1500×500 | — | JPEG q85 |
//! | `gallery` | square 1080 | — | JPEG q85 |
//!
//! Presets fail soft on the source: an undecodable file gives `Ok(None)`.
//! Bad sizes passed through [`PresetOptions`] are still explicit errors.

use crate::imaging::observer::{PipelineEvent, Stage};
use crate::imaging::{
    Adjustment, Background, BudgetStrategy, EncodeSpec, ImageBackend, ImageHandle,
    InvalidDimension, OutputFormat, Pipeline, PipelineError, Quality, Size,
};
use std::path::Path;
use std::str::FromStr;

type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preset {
    Profile,
    Icon,
    Thumbnail,
    LogoSquare,
    LogoHorizontal,
    LogoVertical,
    Poster,
    Banner,
    Cover,
    Gallery,
}

impl Preset {
    pub const ALL: [Preset; 10] = [
        Preset::Profile,
        Preset::Icon,
        Preset::Thumbnail,
        Preset::LogoSquare,
        Preset::LogoHorizontal,
        Preset::LogoVertical,
        Preset::Poster,
        Preset::Banner,
        Preset::Cover,
        Preset::Gallery,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Preset::Profile => "profile",
            Preset::Icon => "icon",
            Preset::Thumbnail => "thumbnail",
            Preset::LogoSquare => "logo-square",
            Preset::LogoHorizontal => "logo-horizontal",
            Preset::LogoVertical => "logo-vertical",
            Preset::Poster => "poster",
            Preset::Banner => "banner",
            Preset::Cover => "cover",
            Preset::Gallery => "gallery",
        }
    }

    /// The fixed parameterization behind this preset.
    pub const fn definition(self) -> PresetDefinition {
        const fn web(quality: u32) -> EncodeSpec {
            EncodeSpec {
                format: OutputFormat::Jpeg,
                quality: Quality::new(quality),
                background: Background::WHITE,
                max_size_bytes: None,
                budget: BudgetStrategy::SingleRetry,
            }
        }
        const LOGO: EncodeSpec = EncodeSpec {
            format: OutputFormat::Png,
            quality: Quality::new(95),
            background: Background::WHITE,
            max_size_bytes: None,
            budget: BudgetStrategy::SingleRetry,
        };

        let (geometry, sharpness, encode) = match self {
            Preset::Profile => (PresetGeometry::Square { side: 256 }, 1.2, web(85)),
            Preset::Icon => (PresetGeometry::Square { side: 256 }, 5.0, web(85)),
            Preset::Thumbnail => (PresetGeometry::Width { width: 400 }, 1.0, web(85)),
            Preset::LogoSquare => (PresetGeometry::Square { side: 512 }, 2.0, LOGO),
            Preset::LogoHorizontal => (
                PresetGeometry::WidthWithRatio {
                    width: 512,
                    height_ratio: 0.5,
                },
                2.0,
                LOGO,
            ),
            Preset::LogoVertical => (
                PresetGeometry::HeightWithRatio {
                    height: 512,
                    width_ratio: 0.6,
                },
                2.0,
                LOGO,
            ),
            Preset::Poster => (
                PresetGeometry::HeightThenCrop {
                    size: Size::new(1200, 1800),
                },
                1.0,
                web(85),
            ),
            Preset::Banner => (
                PresetGeometry::WidthThenCrop {
                    size: Size::new(1920, 600),
                },
                1.0,
                web(85),
            ),
            Preset::Cover => (
                PresetGeometry::WidthThenCrop {
                    size: Size::new(1500, 500),
                },
                1.0,
                web(85),
            ),
            Preset::Gallery => (PresetGeometry::Square { side: 1080 }, 1.0, web(85)),
        };

        PresetDefinition {
            preset: self,
            geometry,
            sharpness,
            encode,
        }
    }

    /// Run the preset on the image at `path`.
    ///
    /// Pixels are converted for the target format before optimizing, so
    /// alpha-capable targets always come back RGBA.
    pub fn apply<B: ImageBackend>(
        self,
        pipeline: &Pipeline<'_, B>,
        path: &Path,
        options: &PresetOptions,
    ) -> Result<Option<ImageHandle>> {
        let definition = self.definition().with_options(options);
        let Some(handle) = pipeline.load(path) else {
            pipeline.emit(PipelineEvent::Note {
                stage: Stage::Preset,
                message: format!("{}: source not decodable, skipping", self.name()),
            });
            return Ok(None);
        };

        let detail = format!("{} {}", self.name(), path.display());
        pipeline
            .run_stage(Stage::Preset, detail, || {
                let encode = &definition.encode;
                let handle = definition.geometry.apply(pipeline, handle)?;
                let handle = pipeline.adjust(handle, Adjustment::Sharpness, definition.sharpness)?;
                let handle = pipeline.convert(handle, encode.format, encode.background);
                pipeline.optimize_for_web(handle, encode)
            })
            .map(Some)
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.to_ascii_lowercase().replace('_', "-");
        if normalized == "avatar" {
            return Ok(Preset::Profile);
        }
        Preset::ALL
            .into_iter()
            .find(|p| p.name() == normalized)
            .ok_or_else(|| {
                let names: Vec<&str> = Preset::ALL.iter().map(|p| p.name()).collect();
                format!("unknown preset '{s}', expected one of: {}", names.join(", "))
            })
    }
}

/// How a preset shapes the image before adjustments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PresetGeometry {
    /// Short side to `side`, then centered square crop.
    Square { side: u32 },
    /// Width to `width`, height follows, nothing cropped.
    Width { width: u32 },
    /// Width-fit, then center-crop the height down to `size.height`.
    WidthThenCrop { size: Size },
    /// Height-fit, then center-crop the width down to `size.width`.
    HeightThenCrop { size: Size },
    /// Width-fit, height capped at `width * height_ratio`.
    WidthWithRatio { width: u32, height_ratio: f32 },
    /// Height-fit, width capped at `height * width_ratio`.
    HeightWithRatio { height: u32, width_ratio: f32 },
}

fn ratio_side(primary: u32, ratio: f32) -> u32 {
    (primary as f32 * ratio) as u32
}

impl PresetGeometry {
    /// Replace the preset's default dimensions with caller overrides.
    ///
    /// `side` sets the primary dimension (square side, width or height);
    /// `size` sets the target box of the crop presets.
    pub fn with_overrides(self, side: Option<u32>, size: Option<Size>) -> Self {
        match self {
            PresetGeometry::Square { side: default } => PresetGeometry::Square {
                side: side.unwrap_or(default),
            },
            PresetGeometry::Width { width } => PresetGeometry::Width {
                width: side.unwrap_or(width),
            },
            PresetGeometry::WidthThenCrop { size: default } => PresetGeometry::WidthThenCrop {
                size: size.unwrap_or(default),
            },
            PresetGeometry::HeightThenCrop { size: default } => PresetGeometry::HeightThenCrop {
                size: size.unwrap_or(default),
            },
            PresetGeometry::WidthWithRatio {
                width,
                height_ratio,
            } => PresetGeometry::WidthWithRatio {
                width: side.unwrap_or(width),
                height_ratio,
            },
            PresetGeometry::HeightWithRatio { height, width_ratio } => {
                PresetGeometry::HeightWithRatio {
                    height: side.unwrap_or(height),
                    width_ratio,
                }
            }
        }
    }

    pub fn apply<B: ImageBackend>(
        self,
        pipeline: &Pipeline<'_, B>,
        handle: ImageHandle,
    ) -> Result<ImageHandle> {
        match self {
            PresetGeometry::Square { side } => pipeline.resize_square(handle, side),
            PresetGeometry::Width { width } => pipeline.resize_to_width(handle, width, true),
            PresetGeometry::WidthThenCrop { size } => pipeline.apply_width_then_crop(handle, size),
            PresetGeometry::HeightThenCrop { size } => {
                pipeline.apply_height_then_crop(handle, size)
            }
            PresetGeometry::WidthWithRatio {
                width,
                height_ratio,
            } => {
                let size = Size::new(width, ratio_side(width, height_ratio));
                pipeline.apply_width_then_crop(handle, size)
            }
            PresetGeometry::HeightWithRatio { height, width_ratio } => {
                let size = Size::new(ratio_side(height, width_ratio), height);
                pipeline.apply_height_then_crop(handle, size)
            }
        }
    }
}

/// Immutable parameters of one preset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PresetDefinition {
    pub preset: Preset,
    pub geometry: PresetGeometry,
    pub sharpness: f32,
    pub encode: EncodeSpec,
}

impl PresetDefinition {
    /// A copy with the caller's overrides applied; the catalog is untouched.
    pub fn with_options(self, options: &PresetOptions) -> Self {
        let mut encode = self.encode;
        if let Some(format) = options.format {
            encode.format = format;
        }
        if let Some(quality) = options.quality {
            encode.quality = quality;
        }
        if let Some(background) = options.background {
            encode.background = background;
        }
        if options.max_size_bytes.is_some() {
            encode.max_size_bytes = options.max_size_bytes;
        }
        if let Some(budget) = options.budget {
            encode.budget = budget;
        }
        Self {
            geometry: self.geometry.with_overrides(options.side, options.size),
            sharpness: options.sharpness.unwrap_or(self.sharpness),
            encode,
            ..self
        }
    }
}

/// Per-call overrides. `None` keeps the preset default.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PresetOptions {
    pub side: Option<u32>,
    pub size: Option<Size>,
    pub sharpness: Option<f32>,
    pub format: Option<OutputFormat>,
    pub quality: Option<Quality>,
    pub background: Option<Background>,
    pub max_size_bytes: Option<u64>,
    pub budget: Option<BudgetStrategy>,
}

/// Geometry for an ad-hoc transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomGeometry {
    /// Square resize + centered crop.
    Square(u32),
    /// Width-fit, then centered crop to the box.
    Rect(Size),
    /// Return the decoded image untouched.
    Original,
}

impl FromStr for CustomGeometry {
    type Err = InvalidDimension;

    /// `"original"`, `"256"` or `"1200x900"`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("original") {
            return Ok(CustomGeometry::Original);
        }
        if s.contains(['x', 'X']) {
            return s.parse().map(CustomGeometry::Rect);
        }
        s.trim()
            .parse()
            .map(CustomGeometry::Square)
            .map_err(|e| InvalidDimension::new(format!("bad size '{s}': {e}")))
    }
}

/// Ad-hoc sequence: geometry, sharpness, brightness, web encode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CustomSpec {
    pub geometry: CustomGeometry,
    pub sharpness: f32,
    pub brightness: f32,
    pub encode: EncodeSpec,
}

impl Default for CustomSpec {
    fn default() -> Self {
        Self {
            geometry: CustomGeometry::Original,
            sharpness: 1.0,
            brightness: 1.0,
            encode: EncodeSpec::new(OutputFormat::Jpeg).with_quality(Quality::new(85)),
        }
    }
}

/// Run a [`CustomSpec`] on the image at `path`. `Ok(None)` if undecodable.
pub fn process_custom<B: ImageBackend>(
    pipeline: &Pipeline<'_, B>,
    path: &Path,
    spec: &CustomSpec,
) -> Result<Option<ImageHandle>> {
    let Some(handle) = pipeline.load(path) else {
        return Ok(None);
    };

    let handle = match spec.geometry {
        CustomGeometry::Original => return Ok(Some(handle)),
        CustomGeometry::Square(side) => pipeline.resize_square(handle, side)?,
        CustomGeometry::Rect(size) => pipeline.apply_width_then_crop(handle, size)?,
    };
    let handle = pipeline.adjust(handle, Adjustment::Sharpness, spec.sharpness)?;
    let handle = pipeline.adjust(handle, Adjustment::Brightness, spec.brightness)?;
    pipeline.optimize_for_web(handle, &spec.encode).map(Some)
}
