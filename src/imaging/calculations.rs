//! Pure calculation functions for image geometry.
//!
//! All functions here are pure and testable without any I/O or images. They
//! decide *where* pixels go; the [`backend`](super::backend) moves them.
//!
//! | Planner | Scales | Crops |
//! |---|---|---|
//! | [`plan_square_fit`] | short side → `side` (truncating) | centered `side × side` |
//! | [`plan_width_fit`] | width → target, height rounded | — |
//! | [`plan_height_fit`] | height → target, width rounded | — |
//! | [`plan_proportional_resize`] | given side(s) → target, missing side truncated | — |
//! | [`plan_fit_within`] | shrink-only into a bounding box | — |
//! | [`plan_center_crop`] | — | centered, clamped to source |
//! | [`plan_anchored_crop`] | — | start / center / end, clamped to source |

use super::params::CropAnchor;
use thiserror::Error;

/// A requested or computed size was zero, or a required size was missing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid dimension: {0}")]
pub struct InvalidDimension(pub String);

impl InvalidDimension {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Image size in pixels. Both sides are positive once it leaves a planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Reject zero-length sides.
    pub fn validated(self, what: &str) -> Result<Self, InvalidDimension> {
        if self.width == 0 || self.height == 0 {
            return Err(InvalidDimension::new(format!(
                "{what} must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(self)
    }

    pub fn contains(self, other: Size) -> bool {
        other.width <= self.width && other.height <= self.height
    }
}

impl From<(u32, u32)> for Size {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

impl std::str::FromStr for Size {
    type Err = InvalidDimension;

    /// Parse `"WxH"`. Zero sides are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || InvalidDimension::new(format!("expected WIDTHxHEIGHT, got '{s}'"));
        let (w, h) = s.split_once(['x', 'X']).ok_or_else(bad)?;
        let width = w.trim().parse().map_err(|_| bad())?;
        let height = h.trim().parse().map_err(|_| bad())?;
        Size::new(width, height).validated("size")
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Crop rectangle as `(left, top, right, bottom)` edges, right/bottom exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl CropRect {
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }

    pub fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }

    /// A rectangle covering the whole of `size`.
    pub fn full(size: Size) -> Self {
        Self {
            left: 0,
            top: 0,
            right: size.width,
            bottom: size.height,
        }
    }
}

/// Output of [`plan_square_fit`]: resample to `intermediate`, then cut `crop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SquarePlan {
    pub intermediate: Size,
    pub crop: CropRect,
}

fn require_positive(value: u32, what: &str) -> Result<u32, InvalidDimension> {
    if value == 0 {
        return Err(InvalidDimension::new(format!("{what} must be positive")));
    }
    Ok(value)
}

/// Narrow a planned side back to `u32`.
fn to_side(value: u64, what: &str) -> Result<u32, InvalidDimension> {
    u32::try_from(value)
        .map_err(|_| InvalidDimension::new(format!("{what} of {value} px does not fit in u32")))
}

/// `value * num / den` rounded half-up, in integer arithmetic.
fn scale_rounded(value: u32, num: u32, den: u32, what: &str) -> Result<u32, InvalidDimension> {
    let (value, num, den) = (value as u64, num as u64, den as u64);
    to_side((value * num * 2 + den) / (den * 2), what)
}

/// `value * num / den`, truncated.
fn scale_truncated(value: u32, num: u32, den: u32, what: &str) -> Result<u32, InvalidDimension> {
    to_side(value as u64 * num as u64 / den as u64, what)
}

/// Scale so the shorter side equals `side`, then center a `side × side` crop.
///
/// The other side is truncated after multiplication, so it is always at
/// least `side`.
///
/// # Examples
/// ```
/// # use imagecraft::imaging::calculations::{plan_square_fit, Size};
/// let plan = plan_square_fit(Size::new(1920, 1080), 256).unwrap();
/// assert_eq!(plan.intermediate, Size::new(455, 256));
/// assert_eq!((plan.crop.left, plan.crop.right), (99, 355));
/// ```
pub fn plan_square_fit(source: Size, side: u32) -> Result<SquarePlan, InvalidDimension> {
    let source = source.validated("source size")?;
    let side = require_positive(side, "square side")?;

    let short = source.width.min(source.height);
    let intermediate = Size::new(
        scale_truncated(source.width, side, short, "square-fit width")?,
        scale_truncated(source.height, side, short, "square-fit height")?,
    );
    let crop = plan_center_crop(intermediate, Size::new(side, side))?;

    Ok(SquarePlan { intermediate, crop })
}

/// Resize to `target_width`; height follows the aspect ratio when `keep_aspect`.
pub fn plan_width_fit(
    source: Size,
    target_width: u32,
    keep_aspect: bool,
) -> Result<Size, InvalidDimension> {
    let source = source.validated("source size")?;
    let target_width = require_positive(target_width, "target width")?;

    let height = if keep_aspect {
        scale_rounded(source.height, target_width, source.width, "width-fit height")?
    } else {
        source.height
    };
    Size::new(target_width, height).validated("width-fit result")
}

/// Resize to `target_height`; width follows the aspect ratio when `keep_aspect`.
pub fn plan_height_fit(
    source: Size,
    target_height: u32,
    keep_aspect: bool,
) -> Result<Size, InvalidDimension> {
    let source = source.validated("source size")?;
    let target_height = require_positive(target_height, "target height")?;

    let width = if keep_aspect {
        scale_rounded(source.width, target_height, source.height, "height-fit width")?
    } else {
        source.width
    };
    Size::new(width, target_height).validated("height-fit result")
}

/// Explicit resize. Two sides resize exactly; a single side derives the
/// other from the aspect ratio, truncated rather than rounded.
///
/// # Examples
/// ```
/// # use imagecraft::imaging::calculations::{plan_proportional_resize, Size};
/// // 333 * 200 / 1000 = 66.6 → 66
/// let size = plan_proportional_resize(Size::new(1000, 333), Some(200), None).unwrap();
/// assert_eq!(size, Size::new(200, 66));
/// ```
pub fn plan_proportional_resize(
    source: Size,
    width: Option<u32>,
    height: Option<u32>,
) -> Result<Size, InvalidDimension> {
    let source = source.validated("source size")?;
    let size = match (width, height) {
        (Some(width), Some(height)) => Size::new(width, height),
        (Some(width), None) => {
            let width = require_positive(width, "target width")?;
            let height = scale_truncated(source.height, width, source.width, "derived height")?;
            Size::new(width, height)
        }
        (None, Some(height)) => {
            let height = require_positive(height, "target height")?;
            let width = scale_truncated(source.width, height, source.height, "derived width")?;
            Size::new(width, height)
        }
        (None, None) => return Err(InvalidDimension::new("resize needs a width or a height")),
    };
    size.validated("resize result")
}

/// Shrink-only fit inside `bounds`, preserving aspect ratio.
///
/// Sources already inside the box are returned unchanged. The scaled side
/// is truncated, but never below one pixel.
pub fn plan_fit_within(source: Size, bounds: Size) -> Result<Size, InvalidDimension> {
    let source = source.validated("source size")?;
    let bounds = bounds.validated("bounding box")?;

    if bounds.contains(source) {
        return Ok(source);
    }

    // Compare width/height ratios without floats: src_w/bounds_w vs src_h/bounds_h.
    let width_bound = source.width as u64 * bounds.height as u64
        >= source.height as u64 * bounds.width as u64;
    let fitted = if width_bound {
        let h = scale_truncated(source.height, bounds.width, source.width, "fitted height")?;
        Size::new(bounds.width, h.max(1))
    } else {
        let w = scale_truncated(source.width, bounds.height, source.height, "fitted width")?;
        Size::new(w.max(1), bounds.height)
    };
    Ok(fitted)
}

/// Centered crop of `target` out of `current`.
///
/// A target larger than `current` on either axis is clamped to `current`
/// on that axis: the crop shrinks instead of failing.
///
/// # Examples
/// ```
/// # use imagecraft::imaging::calculations::{plan_center_crop, Size};
/// let rect = plan_center_crop(Size::new(1920, 1080), Size::new(1920, 600)).unwrap();
/// assert_eq!((rect.left, rect.top, rect.right, rect.bottom), (0, 240, 1920, 840));
/// ```
pub fn plan_center_crop(current: Size, target: Size) -> Result<CropRect, InvalidDimension> {
    plan_anchored_crop(current, target, CropAnchor::Center, CropAnchor::Center)
}

/// Crop `target` out of `current`, positioning each axis by its anchor.
///
/// `Start` keeps the left/top edge, `End` the right/bottom edge, `Center`
/// splits the margin with truncating division. Clamped like
/// [`plan_center_crop`].
pub fn plan_anchored_crop(
    current: Size,
    target: Size,
    horizontal: CropAnchor,
    vertical: CropAnchor,
) -> Result<CropRect, InvalidDimension> {
    let current = current.validated("current size")?;
    let target = target.validated("crop size")?;

    let width = target.width.min(current.width);
    let height = target.height.min(current.height);
    let left = horizontal.offset(current.width - width);
    let top = vertical.offset(current.height - height);

    Ok(CropRect {
        left,
        top,
        right: left + width,
        bottom: top + height,
    })
}
