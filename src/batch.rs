//! Apply one operation to many images.
//!
//! Images are processed in parallel with [rayon](https://docs.rs/rayon).
//! Results come back in input order regardless of which worker finished
//! first. A failing image never aborts the batch; its slot records the
//! failure instead.
//!
//! Thread count comes from `[processing] max_processes` via
//! [`effective_threads`](crate::config::effective_threads); the CLI builds
//! the global pool before calling [`run_batch`].

use crate::imaging::{EncodeSpec, ImageBackend, ImageHandle, Pipeline, PipelineError, Size};
use crate::presets::{CustomSpec, Preset, PresetOptions, process_custom};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Map `op` over `items` in parallel, keeping input order.
pub fn batch<T, R, F>(items: &[T], op: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    items.par_iter().map(op).collect()
}

/// What to do to every image in a batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BatchOperation {
    Preset {
        preset: Preset,
        options: PresetOptions,
    },
    Custom(CustomSpec),
    /// Re-encode as-is.
    Convert(EncodeSpec),
}

impl BatchOperation {
    /// Encode settings for the written file.
    pub fn encode_spec(&self) -> EncodeSpec {
        match self {
            BatchOperation::Preset { preset, options } => {
                preset.definition().with_options(options).encode
            }
            BatchOperation::Custom(spec) => spec.encode,
            BatchOperation::Convert(spec) => *spec,
        }
    }

    fn run<B: ImageBackend>(
        &self,
        pipeline: &Pipeline<'_, B>,
        path: &Path,
    ) -> Result<Option<ImageHandle>, PipelineError> {
        match self {
            BatchOperation::Preset { preset, options } => preset.apply(pipeline, path, options),
            BatchOperation::Custom(spec) => process_custom(pipeline, path, spec),
            BatchOperation::Convert(_) => Ok(pipeline.load(path)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchStatus {
    Written {
        output: PathBuf,
        size: Size,
        bytes: usize,
    },
    /// Source could not be decoded.
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub source: PathBuf,
    pub status: BatchStatus,
}

/// Output file names for `inputs`: `<stem>.<ext>`, with `-2`, `-3`, …
/// appended when two inputs share a stem.
pub fn output_names(inputs: &[PathBuf], extension: &str) -> Vec<String> {
    let mut taken = HashSet::new();
    inputs
        .iter()
        .map(|input| {
            let stem = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image".to_string());
            let mut name = format!("{stem}.{extension}");
            let mut n = 2;
            while !taken.insert(name.clone()) {
                name = format!("{stem}-{n}.{extension}");
                n += 1;
            }
            name
        })
        .collect()
}

/// Run `operation` on every input and write results into `output_dir`.
///
/// Returns one outcome per input, in input order.
pub fn run_batch<B: ImageBackend>(
    pipeline: &Pipeline<'_, B>,
    inputs: &[PathBuf],
    output_dir: &Path,
    operation: &BatchOperation,
) -> Result<Vec<BatchOutcome>, BatchError> {
    std::fs::create_dir_all(output_dir)?;
    let spec = operation.encode_spec();
    let names = output_names(inputs, spec.format.extension());
    let jobs: Vec<(&PathBuf, PathBuf)> = inputs
        .iter()
        .zip(names)
        .map(|(input, name)| (input, output_dir.join(name)))
        .collect();

    let outcomes = batch(&jobs, |(source, output)| {
        let status = match process_one(pipeline, source, output, operation, &spec) {
            Ok(Some((size, bytes))) => {
                debug!(source = %source.display(), output = %output.display(), bytes, "written");
                BatchStatus::Written {
                    output: output.clone(),
                    size,
                    bytes,
                }
            }
            Ok(None) => {
                warn!(source = %source.display(), "not a decodable image, skipped");
                BatchStatus::Skipped
            }
            Err(e) => {
                warn!(source = %source.display(), error = %e, "batch item failed");
                BatchStatus::Failed(e.to_string())
            }
        };
        BatchOutcome {
            source: (*source).clone(),
            status,
        }
    });
    Ok(outcomes)
}

fn process_one<B: ImageBackend>(
    pipeline: &Pipeline<'_, B>,
    source: &Path,
    output: &Path,
    operation: &BatchOperation,
    spec: &EncodeSpec,
) -> Result<Option<(Size, usize)>, PipelineError> {
    let Some(handle) = operation.run(pipeline, source)? else {
        return Ok(None);
    };
    let encoded = pipeline.save(&handle, output, spec)?;
    Ok(Some((handle.size(), encoded.len())))
}
