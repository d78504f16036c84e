use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use clipforge::{
    composition::{speed_factor, CompositionBuilder, SPEED_PRESETS},
    config::Config,
    export::{save_to_documents, ExportManager, ExportRequest, OutputSpec},
    filters::{apply_filter_to_video, filter_thumbnail, FilterName, FilterRegistry},
    geometry::{Point, Rect, Size},
    media::{load_asset, MediaAsset},
    overlay::{OverlayStyle, OverlayTransform, TextOverlayRequest},
    time::{format_hms, parse_timestamp, Rational},
    video::{extract_frames, thumbnail, thumbnail_time},
};

#[derive(Parser)]
#[command(
    name = "clipforge",
    version,
    about = "Trim, re-time, filter and caption a video",
    long_about = "Clipforge edits a single source video: trims, speed ramps over a range, built-in image filters and fading text overlays, exported through ffmpeg."
)]
struct Cli {
    /// Configuration file (optional)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show duration and tracks of a video
    Info { input: PathBuf },

    /// Keep only [start, end) of a video
    Trim {
        input: PathBuf,
        /// HH:MM:SS, MM:SS or seconds
        #[arg(long, value_parser = parse_timestamp)]
        start: Rational,
        #[arg(long, value_parser = parse_timestamp)]
        end: Rational,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Play [start, end) at a different speed
    Speed {
        input: PathBuf,
        #[arg(long, value_parser = parse_timestamp)]
        start: Rational,
        #[arg(long, value_parser = parse_timestamp)]
        end: Rational,
        /// Playback speed; above 1 is faster
        #[arg(long, default_value_t = 2.0)]
        factor: f64,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Apply a built-in filter to every frame
    Filter {
        input: PathBuf,
        /// Filter identifier or alias (see `clipforge filters`)
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Burn in a text overlay that fades out over [start, end)
    Overlay {
        input: PathBuf,
        #[arg(long)]
        text: String,
        #[arg(long, value_parser = parse_timestamp)]
        start: Rational,
        #[arg(long, value_parser = parse_timestamp)]
        end: Rational,
        /// Text box in view coordinates: x,y,width,height (top-left origin)
        #[arg(long, value_delimiter = ',', num_args = 4, default_values_t = [0.0, 0.0, 300.0, 60.0])]
        frame: Vec<f64>,
        /// View the box was placed in: width,height (defaults to the video size)
        #[arg(long, value_delimiter = ',', num_args = 2)]
        view: Option<Vec<f64>>,
        /// Pan in view points: dx,dy
        #[arg(long, value_delimiter = ',', num_args = 2, allow_hyphen_values = true)]
        translate: Option<Vec<f64>>,
        #[arg(long, default_value_t = 1.0)]
        scale: f64,
        /// Rotation in degrees
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        rotate: f64,
        /// Text colour as r,g,b,a (defaults to the configured colour)
        #[arg(long, value_delimiter = ',', num_args = 4)]
        text_color: Option<Vec<u8>>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Save one frame as PNG, optionally filtered
    Thumbnail {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Defaults to 10 s in, or mid-clip for shorter videos
        #[arg(long, value_parser = parse_timestamp)]
        at: Option<Rational>,
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Dump every frame as numbered PNG files
    Frames {
        input: PathBuf,
        #[arg(short, long)]
        dir: PathBuf,
    },

    /// List the available filters
    Filters,

    /// Copy an exported video into the documents directory
    Save { input: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    // Load configuration
    let config = match &cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(config_path)?
        }
        None => Config::default(),
    };
    config.validate()?;

    match cli.command {
        Command::Info { input } => {
            let asset = load(&input, &config)?;
            println!("{}", asset.path().display());
            println!("  duration: {} ({:.3}s)", format_hms(asset.duration()), asset.duration().as_seconds_f64());
            for track in asset.tracks() {
                match track.frame_rate {
                    Some(rate) => println!(
                        "  #{} {} {}x{} @ {:.3} fps",
                        track.index,
                        track.kind.as_str(),
                        track.render_size().width,
                        track.render_size().height,
                        rate.as_seconds_f64()
                    ),
                    None => println!("  #{} {}", track.index, track.kind.as_str()),
                }
            }
        }

        Command::Trim { input, start, end, output } => {
            let asset = load(&input, &config)?;
            let composition = CompositionBuilder::from_config(&config).trim(&asset, start, end)?;
            let spec = output.map(OutputSpec::from_path).unwrap_or_else(|| OutputSpec::trim(&config.export));
            run_export(&config, ExportRequest::composition(composition, spec)).await?;
        }

        Command::Speed { input, start, end, factor, output } => {
            if !SPEED_PRESETS.contains(&factor) {
                warn!("Speed {} is not one of the presets {:?}", factor, SPEED_PRESETS);
            }
            let asset = load(&input, &config)?;
            let composition = CompositionBuilder::from_config(&config).speed_in_range(
                &asset,
                start,
                end,
                speed_factor(factor)?,
            )?;
            let spec = output
                .map(|path| OutputSpec::from_path(path).with_fast_start(true))
                .unwrap_or_else(|| OutputSpec::speed(&config.export));
            run_export(&config, ExportRequest::composition(composition, spec)).await?;
        }

        Command::Filter { input, name, output } => {
            let asset = load(&input, &config)?;
            let video = apply_filter_to_video(&name, asset)?;
            let spec = output.map(OutputSpec::from_path).unwrap_or_else(|| OutputSpec::filter(&config.export));
            run_export(&config, ExportRequest::filtered(video, spec)).await?;
        }

        Command::Overlay { input, text, start, end, frame, view, translate, scale, rotate, text_color, output } => {
            let asset = load(&input, &config)?;
            let translation = translate.map(|t| Point::new(t[0], t[1])).unwrap_or(Point::new(0.0, 0.0));
            let mut style = OverlayStyle::from_config(&config.overlay);
            if let Some(c) = text_color {
                style = style.with_text_color([c[0], c[1], c[2], c[3]]);
            }
            let request = TextOverlayRequest {
                text,
                style,
                frame: Rect::new(frame[0], frame[1], frame[2], frame[3]),
                container_size: view.map(|v| Size::new(v[0], v[1])),
                transform: OverlayTransform::new(translation, scale, rotate.to_radians()),
                start,
                end,
            };
            let overlay = CompositionBuilder::from_config(&config).text_overlay(&asset, &request)?;
            let spec = output
                .map(|path| OutputSpec::from_path(path).with_fast_start(true))
                .unwrap_or_else(|| OutputSpec::overlay(&config.export));
            run_export(&config, ExportRequest::overlay(overlay, spec)).await?;
        }

        Command::Thumbnail { input, output, at, filter } => {
            let asset = load(&input, &config)?;
            let at = at.unwrap_or_else(|| thumbnail_time(&asset));
            let tools = config.tools.clone();
            let frame = tokio::task::spawn_blocking(move || thumbnail(&asset, at, &tools)).await??;
            let frame = match filter {
                Some(name) => filter_thumbnail(&name, &frame)?,
                None => frame,
            };
            frame
                .save_png(&output)
                .with_context(|| format!("writing {}", output.display()))?;
            info!("🖼️  Thumbnail at {} saved to {}", format_hms(at), output.display());
        }

        Command::Frames { input, dir } => {
            let asset = load(&input, &config)?;
            let tools = config.tools.clone();
            let count = tokio::task::spawn_blocking(move || dump_frames(&asset, &dir, &tools)).await??;
            info!("Wrote {} frames", count);
        }

        Command::Filters => {
            let registry = FilterRegistry::new();
            for name in FilterName::ALL {
                let description = registry
                    .get(name)
                    .map(|filter| filter.description().to_string())
                    .unwrap_or_default();
                println!("{:<28} {:<18} {}", name.identifier(), name.alias(), description);
            }
        }

        Command::Save { input } => {
            let saved = save_to_documents(&input, &config.export)?;
            println!("{}", saved.display());
        }
    }

    Ok(())
}

fn load(input: &Path, config: &Config) -> Result<Arc<MediaAsset>> {
    let asset = load_asset(input, &config.tools)?;
    info!("Loaded {} ({})", input.display(), format_hms(asset.duration()));
    Ok(Arc::new(asset))
}

fn dump_frames(asset: &MediaAsset, dir: &Path, tools: &clipforge::config::ToolsConfig) -> Result<u64> {
    std::fs::create_dir_all(dir)?;
    let mut count = 0;
    for frame in extract_frames(asset, tools)? {
        let path = dir.join(format!("frame_{:06}.png", count));
        frame?
            .save_png(&path)
            .with_context(|| format!("writing {}", path.display()))?;
        count += 1;
    }
    Ok(count)
}

/// Submit an export, log its progress and wait for the result.
/// Ctrl-C cancels the job.
async fn run_export(config: &Config, request: ExportRequest) -> Result<PathBuf> {
    let manager = ExportManager::with_ffmpeg(config);
    let handle = manager.export(request)?;
    info!("Exporting to {}", handle.output().display());

    let mut status = handle.subscribe();
    let progress = tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let current = *status.borrow();
            info!("   Export {}", current);
        }
    });

    let token = handle.cancellation_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling export");
            token.store(true, Ordering::SeqCst);
        }
    });

    let result = handle.finished().await;
    interrupt.abort();
    let _ = progress.await;

    match result {
        Ok(path) => {
            info!("✅ Export complete! Output saved to: {}", path.display());
            println!("{}", path.display());
            Ok(path)
        }
        Err(e) => Err(anyhow::anyhow!(e.user_message()).context(format!("export {}", e.category()))),
    }
}
