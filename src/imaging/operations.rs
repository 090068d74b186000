//! High-level image operations.
//!
//! [`Pipeline`] combines the pure planners in
//! [`calculations`](super::calculations) with pixel work on an
//! [`ImageBackend`]. Every transform consumes an [`ImageHandle`] and returns
//! the next one, so a chain reads as
//! `load → resize → crop → adjust* → optimize`.
//!
//! Failure policy:
//! - [`Pipeline::load`] returns `None` for anything that cannot be decoded.
//! - Zero or missing sizes are [`PipelineError::InvalidDimension`].
//! - Backend failures on a valid handle propagate as [`PipelineError::Backend`].
//! - The web optimizer degrades instead of failing, see [`web`](super::web).

use super::backend::{BackendError, ImageBackend};
use super::calculations::{
    CropRect, InvalidDimension, Size, plan_anchored_crop, plan_center_crop, plan_fit_within,
    plan_height_fit, plan_proportional_resize, plan_square_fit, plan_width_fit,
};
use super::handle::ImageHandle;
use super::observer::{NoopObserver, PipelineEvent, PipelineObserver, Stage};
use super::params::{Adjustment, CropAnchor};
use image::DynamicImage;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    InvalidDimension(#[from] InvalidDimension),
    #[error("Image processing failed: {0}")]
    Backend(#[from] BackendError),
}

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// A backend plus an observer. Cheap to copy; holds no image state, so one
/// pipeline can serve many threads.
pub struct Pipeline<'a, B: ImageBackend> {
    backend: &'a B,
    observer: &'a dyn PipelineObserver,
}

impl<B: ImageBackend> Clone for Pipeline<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B: ImageBackend> Copy for Pipeline<'_, B> {}

impl<'a, B: ImageBackend> Pipeline<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self {
            backend,
            observer: &NoopObserver,
        }
    }

    pub fn with_observer(self, observer: &'a dyn PipelineObserver) -> Self {
        Self { observer, ..self }
    }

    pub fn backend(&self) -> &'a B {
        self.backend
    }

    pub(crate) fn emit(&self, event: PipelineEvent) {
        self.observer.on_event(&event);
    }

    /// Wrap one stage with entry, exit and failure checkpoints.
    pub(crate) fn run_stage(
        &self,
        stage: Stage,
        detail: String,
        op: impl FnOnce() -> Result<ImageHandle>,
    ) -> Result<ImageHandle> {
        self.emit(PipelineEvent::Started { stage, detail });
        match op() {
            Ok(handle) => {
                self.emit(PipelineEvent::Finished {
                    stage,
                    size: handle.size(),
                });
                Ok(handle)
            }
            Err(e) => {
                self.emit(PipelineEvent::Failed {
                    stage,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn resample(&self, handle: ImageHandle, size: Size) -> Result<ImageHandle> {
        let resized = self.backend.resample(handle.image(), size)?;
        Ok(handle.with_image(resized))
    }

    fn crop_to(&self, handle: ImageHandle, rect: CropRect) -> Result<ImageHandle> {
        if rect.left == 0 && rect.top == 0 && rect.size() == handle.size() {
            return Ok(handle);
        }
        let cropped = self.backend.crop(handle.image(), rect)?;
        Ok(handle.with_image(cropped))
    }

    /// Decode `path`. Unreadable or unrecognized files yield `None`.
    pub fn load(&self, path: &Path) -> Option<ImageHandle> {
        self.run_stage(Stage::Load, path.display().to_string(), || {
            let handle = self.backend.decode(path)?;
            handle.size().validated("decoded image")?;
            Ok(handle)
        })
        .ok()
    }

    /// Whether `path` decodes to a non-empty image. Never fails.
    pub fn validate(&self, path: &Path) -> bool {
        self.load(path).is_some()
    }

    /// Scale so the short side is `side`, then center-crop to `side × side`.
    pub fn resize_square(&self, handle: ImageHandle, side: u32) -> Result<ImageHandle> {
        self.run_stage(Stage::Resize, format!("square {side}"), || {
            let plan = plan_square_fit(handle.size(), side)?;
            let resized = self.resample(handle, plan.intermediate)?;
            self.crop_to(resized, plan.crop)
        })
    }

    /// Resize to `width`; height follows the aspect ratio unless `keep_aspect` is false.
    pub fn resize_to_width(
        &self,
        handle: ImageHandle,
        width: u32,
        keep_aspect: bool,
    ) -> Result<ImageHandle> {
        self.run_stage(Stage::Resize, format!("width {width}"), || {
            let size = plan_width_fit(handle.size(), width, keep_aspect)?;
            self.resample(handle, size)
        })
    }

    /// Resize to `height`; width follows the aspect ratio unless `keep_aspect` is false.
    pub fn resize_to_height(
        &self,
        handle: ImageHandle,
        height: u32,
        keep_aspect: bool,
    ) -> Result<ImageHandle> {
        self.run_stage(Stage::Resize, format!("height {height}"), || {
            let size = plan_height_fit(handle.size(), height, keep_aspect)?;
            self.resample(handle, size)
        })
    }

    /// Resize by width, height, or both.
    ///
    /// With `keep_aspect`, one given side derives the other (truncated) and
    /// two given sides resize exactly. Without it both sides are required.
    pub fn resize(
        &self,
        handle: ImageHandle,
        width: Option<u32>,
        height: Option<u32>,
        keep_aspect: bool,
    ) -> Result<ImageHandle> {
        if !keep_aspect && (width.is_none() || height.is_none()) {
            return Err(InvalidDimension::new(
                "width and height are both required without keep_aspect",
            )
            .into());
        }
        let side = |v: Option<u32>| v.map_or_else(|| "auto".to_string(), |v| v.to_string());
        let detail = format!("explicit {}x{}", side(width), side(height));
        self.run_stage(Stage::Resize, detail, || {
            let size = plan_proportional_resize(handle.size(), width, height)?;
            self.resample(handle, size)
        })
    }

    /// Shrink-only fit inside `bounds`; with `crop`, then center-crop to
    /// `bounds` (clamped, so a small image stays small).
    pub fn resize_within(
        &self,
        handle: ImageHandle,
        bounds: Size,
        crop: bool,
    ) -> Result<ImageHandle> {
        let fitted = self.run_stage(Stage::Resize, format!("within {bounds}"), || {
            let size = plan_fit_within(handle.size(), bounds)?;
            if size == handle.size() {
                return Ok(handle);
            }
            self.resample(handle, size)
        })?;
        if crop {
            self.crop_center(fitted, bounds)
        } else {
            Ok(fitted)
        }
    }

    /// Center-crop to `target`, clamped to the current size.
    pub fn crop_center(&self, handle: ImageHandle, target: Size) -> Result<ImageHandle> {
        self.run_stage(Stage::Crop, format!("center {target}"), || {
            let rect = plan_center_crop(handle.size(), target)?;
            self.crop_to(handle, rect)
        })
    }

    /// Fit to the target height, then crop the width at `anchor`
    /// (left/center/right).
    pub fn crop_anchored(
        &self,
        handle: ImageHandle,
        target: Size,
        anchor: CropAnchor,
    ) -> Result<ImageHandle> {
        let target = target.validated("crop size")?;
        let fitted = self.resize_to_height(handle, target.height, true)?;
        self.run_stage(Stage::Crop, format!("{anchor:?} {target}"), || {
            let rect = plan_anchored_crop(fitted.size(), target, anchor, CropAnchor::Start)?;
            self.crop_to(fitted, rect)
        })
    }

    /// Resize to the target width, then center-crop the height if it overflows.
    /// The width is never cropped on this path.
    pub fn apply_width_then_crop(&self, handle: ImageHandle, target: Size) -> Result<ImageHandle> {
        let target = target.validated("target size")?;
        let resized = self.resize_to_width(handle, target.width, true)?;
        if resized.height() > target.height {
            let keep = Size::new(resized.width(), target.height);
            self.crop_center(resized, keep)
        } else {
            Ok(resized)
        }
    }

    /// Resize to the target height, then center-crop the width if it overflows.
    pub fn apply_height_then_crop(&self, handle: ImageHandle, target: Size) -> Result<ImageHandle> {
        let target = target.validated("target size")?;
        let resized = self.resize_to_height(handle, target.height, true)?;
        if resized.width() > target.width {
            let keep = Size::new(target.width, resized.height());
            self.crop_center(resized, keep)
        } else {
            Ok(resized)
        }
    }

    /// Apply an enhancement. A factor of exactly `1.0` returns the handle
    /// untouched without calling the backend; other factors, including
    /// negative ones, are passed through as-is.
    pub fn adjust(&self, handle: ImageHandle, kind: Adjustment, factor: f32) -> Result<ImageHandle> {
        if factor == 1.0 {
            return Ok(handle);
        }
        self.run_stage(Stage::Adjust, format!("{kind} x{factor}"), || {
            let adjusted = self.backend.enhance(handle.image(), kind, factor)?;
            Ok(handle.with_image(adjusted))
        })
    }

    /// Drop the alpha channel without compositing, unless `keep_transparency`
    /// is set and the image has one.
    pub fn to_png(&self, handle: ImageHandle, keep_transparency: bool) -> ImageHandle {
        if keep_transparency && handle.has_alpha() {
            let rgba = DynamicImage::ImageRgba8(handle.image().to_rgba8());
            return handle.with_image(rgba);
        }
        let rgb = DynamicImage::ImageRgb8(handle.image().to_rgb8());
        handle.with_image(rgb)
    }
}
