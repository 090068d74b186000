//! # imagecraft
//!
//! One-call image transforms: aspect-aware resize and crop, brightness /
//! contrast / sharpness adjustments, format conversion, byte-budget web
//! encoding, and a catalog of named presets (avatar, icon, thumbnail,
//! banner, poster, cover, logos).
//!
//! # Architecture: One Linear Pipeline
//!
//! Every operation is a straight chain over a single owned [`ImageHandle`]:
//!
//! ```text
//! load → resize → crop → adjust* → optimize → encode
//! ```
//!
//! - **Geometry** is decided by pure planners in
//!   [`imaging::calculations`]: no pixels, fully unit tested.
//! - **Pixel work** goes through the [`ImageBackend`] trait, implemented by
//!   [`RustBackend`] on the `image` crate. Tests swap in a recording mock.
//! - **Sequencing** lives in [`Pipeline`]. Each stage takes the handle by
//!   value and returns the next one, so no two stages ever share pixels.
//! - **Presets** are constant [`presets::PresetDefinition`]s run through the
//!   same pipeline.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Geometry planners, backend seam, pipeline, web optimizer, observers |
//! | [`presets`] | Closed preset catalog plus ad-hoc custom transforms |
//! | [`batch`] | Order-preserving parallel processing over rayon |
//! | [`config`] | `imagecraft.toml` loading, validation, and merging |
//! | [`output`] | CLI output formatting |
//!
//! # Failure Model
//!
//! | Situation | Result |
//! |-----------|--------|
//! | Source unreadable or not an image | `None` from [`Pipeline::load`] and every preset |
//! | Zero or missing target size | `Err(PipelineError::InvalidDimension)` |
//! | Encoder rejects pixels during optimize | the pre-optimization handle, unchanged |
//! | Any other backend failure | `Err(PipelineError::Backend)` |
//!
//! # Observability
//!
//! The library never prints. Stage entry, exit and failure are reported to a
//! [`PipelineObserver`] given once to the pipeline; [`TracingObserver`]
//! forwards them to `tracing`, and the CLI installs a `tracing-subscriber`
//! formatter filtered by `RUST_LOG` or `-v`.
//!
//! # Example
//!
//! ```no_run
//! use imagecraft::imaging::{Pipeline, RustBackend, EncodeSpec, OutputFormat};
//! use imagecraft::presets::{Preset, PresetOptions};
//! use std::path::Path;
//!
//! let backend = RustBackend::new();
//! let pipeline = Pipeline::new(&backend);
//!
//! if let Some(banner) = Preset::Banner
//!     .apply(&pipeline, Path::new("photo.jpg"), &PresetOptions::default())
//!     .unwrap()
//! {
//!     let spec = EncodeSpec::new(OutputFormat::Jpeg);
//!     pipeline.save(&banner, Path::new("banner.jpg"), &spec).unwrap();
//! }
//! ```
//!
//! [`ImageHandle`]: imaging::ImageHandle
//! [`ImageBackend`]: imaging::ImageBackend
//! [`RustBackend`]: imaging::RustBackend
//! [`Pipeline`]: imaging::Pipeline
//! [`Pipeline::load`]: imaging::Pipeline::load
//! [`PipelineObserver`]: imaging::PipelineObserver
//! [`TracingObserver`]: imaging::TracingObserver

pub mod batch;
pub mod config;
pub mod imaging;
pub mod output;
pub mod presets;

#[cfg(test)]
pub(crate) mod test_helpers;
