//! Image processing on top of the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` with content sniffing |
//! | **Resample** | `resize_exact` with Lanczos3 |
//! | **Crop** | `crop_imm` on a planned [`CropRect`] |
//! | **Adjust** | blend-against-degenerate kernels (brightness, contrast, sharpness) |
//! | **Encode** | per-format encoders, JPEG quality, byte budgets |
//!
//! The module is split into:
//! - **Calculations**: pure geometry planners (unit testable, no pixels)
//! - **Parameters**: quality, formats, backgrounds, encode specs
//! - **Handle**: the decoded image plus its source format
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Observer**: pipeline checkpoints ([`PipelineObserver`])
//! - **Operations**: [`Pipeline`] combining calculations + backend
//! - **Web**: alpha flattening and budget encoding

pub mod backend;
pub mod calculations;
mod enhance;
pub mod handle;
pub mod observer;
pub mod operations;
pub mod params;
pub mod rust_backend;
pub mod web;

pub use backend::{BackendError, ImageBackend};
pub use calculations::{CropRect, InvalidDimension, Size};
pub use handle::{ColorMode, ImageHandle, ImageInfo};
pub use observer::{NoopObserver, PipelineEvent, PipelineObserver, Stage, TracingObserver};
pub use operations::{Pipeline, PipelineError};
pub use params::{
    Adjustment, Background, BudgetStrategy, CropAnchor, EncodeSpec, OutputFormat, Quality,
};
pub use rust_backend::{RustBackend, supported_input_extensions};
pub use web::{EncodedImage, flatten_alpha};
