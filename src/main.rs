use clap::{Args, Parser, Subcommand};
use imagecraft::batch::{self, BatchOperation};
use imagecraft::config::{self, CraftConfig};
use imagecraft::imaging::{
    Adjustment, Background, BudgetStrategy, CropAnchor, EncodeSpec, OutputFormat, Pipeline,
    Quality, RustBackend, Size, TracingObserver,
};
use imagecraft::output;
use imagecraft::presets::{CustomGeometry, CustomSpec, Preset, PresetOptions, process_custom};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "imagecraft")]
#[command(about = "One-call image transforms for the web")]
#[command(long_about = "\
One-call image transforms for the web

Resize and crop with aspect-ratio awareness, adjust brightness, contrast and
sharpness, convert between formats, and encode under a byte budget. Named
presets bundle the common cases (avatars, icons, thumbnails, banners, logos).

Output format defaults to the output file's extension, then to the config.
Transparent images written to formats without alpha are flattened onto the
configured background color.

Run 'imagecraft gen-config' to generate a documented imagecraft.toml.
Set RUST_LOG (e.g. RUST_LOG=debug) for pipeline traces.")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./imagecraft.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log pipeline stages to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Flags that override the `[output]` config section.
#[derive(Args, Clone, Default)]
struct EncodeArgs {
    /// Output format (jpeg, png, webp, tiff, bmp, gif, ico)
    #[arg(long)]
    format: Option<OutputFormat>,

    /// Encoding quality, 1-100
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=100))]
    quality: Option<u32>,

    /// Flatten color for transparent pixels: "#rrggbb" or "r,g,b"
    #[arg(long)]
    background: Option<Background>,

    /// Byte budget in KiB
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    max_size_kb: Option<u64>,

    /// Budget strategy: single-retry or bisect
    #[arg(long)]
    budget: Option<BudgetStrategy>,
}

impl EncodeArgs {
    /// Layer flags over `base`. Without `--format`, `output`'s extension wins.
    fn apply(&self, base: EncodeSpec, output: Option<&Path>) -> EncodeSpec {
        let mut spec = base;
        if let Some(format) = self
            .format
            .or_else(|| output.and_then(OutputFormat::from_path))
        {
            spec.format = format;
        }
        if let Some(quality) = self.quality {
            spec.quality = Quality::new(quality);
        }
        if let Some(background) = self.background {
            spec.background = background;
        }
        if let Some(kb) = self.max_size_kb {
            spec.max_size_bytes = Some(kb * 1024);
        }
        if let Some(budget) = self.budget {
            spec.budget = budget;
        }
        spec
    }

    /// Only the flags given on the command line, for presets.
    fn preset_options(&self, output: Option<&Path>) -> PresetOptions {
        PresetOptions {
            format: self
                .format
                .or_else(|| output.and_then(OutputFormat::from_path)),
            quality: self.quality.map(Quality::new),
            background: self.background,
            max_size_bytes: self.max_size_kb.map(|kb| kb * 1024),
            budget: self.budget,
            ..PresetOptions::default()
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Print format, color mode and size of images
    Info {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Check that files decode as images
    Validate {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// Re-encode an image in another format
    Convert {
        input: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        encode: EncodeArgs,
    },
    /// Resize by width, height, square side or bounding box
    Resize {
        input: PathBuf,
        output: PathBuf,
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
        /// Stretch to --width and --height instead of keeping the aspect ratio
        #[arg(long)]
        no_keep_aspect: bool,
        /// Square resize + center crop to this side
        #[arg(long, conflicts_with_all = ["width", "height", "within"])]
        square: Option<u32>,
        /// Shrink-only fit inside WIDTHxHEIGHT
        #[arg(long, conflicts_with_all = ["width", "height"])]
        within: Option<Size>,
        /// With --within, center-crop to the box afterwards
        #[arg(long, requires = "within")]
        crop: bool,
        #[command(flatten)]
        encode: EncodeArgs,
    },
    /// Fit to the target height, then crop the width
    Crop {
        input: PathBuf,
        output: PathBuf,
        /// Target WIDTHxHEIGHT
        #[arg(long, default_value = "1200x900")]
        size: Size,
        /// left, center or right
        #[arg(long, default_value = "center")]
        position: CropAnchor,
        #[command(flatten)]
        encode: EncodeArgs,
    },
    /// Apply brightness, contrast and sharpness factors (1.0 = unchanged)
    Adjust {
        input: PathBuf,
        output: PathBuf,
        #[arg(long, default_value_t = 1.0)]
        brightness: f32,
        #[arg(long, default_value_t = 1.0)]
        contrast: f32,
        #[arg(long, default_value_t = 1.0)]
        sharpness: f32,
        #[command(flatten)]
        encode: EncodeArgs,
    },
    /// Run a named preset (see 'imagecraft presets')
    Preset {
        preset: Preset,
        input: PathBuf,
        output: PathBuf,
        /// Override the primary dimension (square side, width or height)
        #[arg(long)]
        side: Option<u32>,
        /// Override the target box of crop presets, WIDTHxHEIGHT
        #[arg(long)]
        size: Option<Size>,
        #[arg(long)]
        sharpness: Option<f32>,
        #[command(flatten)]
        encode: EncodeArgs,
    },
    /// List the preset catalog
    Presets,
    /// Square or rectangular resize, then sharpness and brightness
    Custom {
        input: PathBuf,
        output: PathBuf,
        /// "256" (square), "1200x900" (width-fit + crop) or "original"
        #[arg(long, default_value = "original")]
        geometry: CustomGeometry,
        #[arg(long, default_value_t = 1.0)]
        sharpness: f32,
        #[arg(long, default_value_t = 1.0)]
        brightness: f32,
        #[command(flatten)]
        encode: EncodeArgs,
    },
    /// Apply a preset, custom geometry or conversion to many images in parallel
    Batch {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Directory for the results
        #[arg(long, short)]
        out_dir: PathBuf,
        #[arg(long, conflicts_with = "geometry")]
        preset: Option<Preset>,
        /// Custom geometry, as for 'imagecraft custom'
        #[arg(long)]
        geometry: Option<CustomGeometry>,
        #[command(flatten)]
        encode: EncodeArgs,
    },
    /// Print a stock imagecraft.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;
    let base = config.encode_spec();
    let backend = RustBackend::new();
    let pipeline = Pipeline::new(&backend).with_observer(&TracingObserver);

    match cli.command {
        Command::Info { inputs, json } => {
            let mut infos = Vec::new();
            for input in &inputs {
                match pipeline.load(input) {
                    Some(handle) => infos.push((input, handle.info())),
                    None => eprintln!("{}", output::format_absent(input)),
                }
            }
            if json {
                let values: Vec<_> = infos.iter().map(|(_, info)| info).collect();
                println!("{}", serde_json::to_string_pretty(&values)?);
            } else {
                for (input, info) in &infos {
                    output::print_info(input, info);
                }
            }
        }
        Command::Validate { inputs } => {
            let results: Vec<(&Path, bool)> = inputs
                .iter()
                .map(|p| (p.as_path(), pipeline.validate(p)))
                .collect();
            output::print_validation(&results);
            let invalid = results.iter().filter(|(_, ok)| !ok).count();
            if invalid > 0 {
                return Err(format!("{invalid} invalid image(s)").into());
            }
        }
        Command::Convert {
            input,
            output,
            encode,
        } => {
            let spec = encode.apply(base, Some(&output));
            let Some(handle) = pipeline.load(&input) else {
                return Err(output::format_absent(&input).into());
            };
            let handle = pipeline.convert(handle, spec.format, spec.background);
            write(&pipeline, &input, &output, handle, &spec)?;
        }
        Command::Resize {
            input,
            output,
            width,
            height,
            no_keep_aspect,
            square,
            within,
            crop,
            encode,
        } => {
            let spec = encode.apply(base, Some(&output));
            let Some(handle) = pipeline.load(&input) else {
                return Err(output::format_absent(&input).into());
            };
            let handle = match (square, within) {
                (Some(side), _) => pipeline.resize_square(handle, side)?,
                (None, Some(bounds)) => pipeline.resize_within(handle, bounds, crop)?,
                (None, None) => pipeline.resize(handle, width, height, !no_keep_aspect)?,
            };
            write(&pipeline, &input, &output, handle, &spec)?;
        }
        Command::Crop {
            input,
            output,
            size,
            position,
            encode,
        } => {
            let spec = encode.apply(base, Some(&output));
            let Some(handle) = pipeline.load(&input) else {
                return Err(output::format_absent(&input).into());
            };
            let handle = pipeline.crop_anchored(handle, size, position)?;
            write(&pipeline, &input, &output, handle, &spec)?;
        }
        Command::Adjust {
            input,
            output,
            brightness,
            contrast,
            sharpness,
            encode,
        } => {
            let spec = encode.apply(base, Some(&output));
            let Some(handle) = pipeline.load(&input) else {
                return Err(output::format_absent(&input).into());
            };
            let handle = pipeline.adjust(handle, Adjustment::Brightness, brightness)?;
            let handle = pipeline.adjust(handle, Adjustment::Contrast, contrast)?;
            let handle = pipeline.adjust(handle, Adjustment::Sharpness, sharpness)?;
            write(&pipeline, &input, &output, handle, &spec)?;
        }
        Command::Preset {
            preset,
            input,
            output,
            side,
            size,
            sharpness,
            encode,
        } => {
            let options = PresetOptions {
                side,
                size,
                sharpness,
                ..encode.preset_options(Some(&output))
            };
            let spec = preset.definition().with_options(&options).encode;
            let Some(handle) = preset.apply(&pipeline, &input, &options)? else {
                return Err(output::format_absent(&input).into());
            };
            write(&pipeline, &input, &output, handle, &spec)?;
        }
        Command::Presets => output::print_presets(),
        Command::Custom {
            input,
            output,
            geometry,
            sharpness,
            brightness,
            encode,
        } => {
            let spec = CustomSpec {
                geometry,
                sharpness,
                brightness,
                encode: encode.apply(CustomSpec::default().encode, Some(&output)),
            };
            let Some(handle) = process_custom(&pipeline, &input, &spec)? else {
                return Err(output::format_absent(&input).into());
            };
            write(&pipeline, &input, &output, handle, &spec.encode)?;
        }
        Command::Batch {
            inputs,
            out_dir,
            preset,
            geometry,
            encode,
        } => {
            init_thread_pool(&config.processing);
            let operation = match (preset, geometry) {
                (Some(preset), _) => BatchOperation::Preset {
                    preset,
                    options: encode.preset_options(None),
                },
                (None, Some(geometry)) => BatchOperation::Custom(CustomSpec {
                    geometry,
                    encode: encode.apply(CustomSpec::default().encode, None),
                    ..CustomSpec::default()
                }),
                (None, None) => BatchOperation::Convert(encode.apply(base, None)),
            };
            let outcomes = batch::run_batch(&pipeline, &inputs, &out_dir, &operation)?;
            output::print_batch(&outcomes);
        }
        // printed before the config is loaded
        Command::GenConfig => {}
    }

    Ok(())
}

fn write(
    pipeline: &Pipeline<'_, RustBackend>,
    input: &Path,
    output: &Path,
    handle: imagecraft::imaging::ImageHandle,
    spec: &EncodeSpec,
) -> Result<(), Box<dyn std::error::Error>> {
    let encoded = pipeline.save(&handle, output, spec)?;
    output::print_written(input, output, handle.size(), &encoded);
    Ok(())
}

/// Explicit `--config` must exist; the implicit `./imagecraft.toml` may not.
fn load_config(path: Option<&Path>) -> Result<CraftConfig, config::ConfigError> {
    match path {
        Some(path) => config::load_required_config(path),
        None => config::load_config(Path::new(config::CONFIG_FILE_NAME)),
    }
}

/// `RUST_LOG` wins; otherwise `-v` shows debug-level pipeline stages.
fn init_tracing(verbose: bool) {
    let default = if verbose { "imagecraft=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Never exceeds the available cores; `max_processes` can only lower it.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
