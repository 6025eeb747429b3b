use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use cineforge::drive::capture::{CaptureDriver, CaptureOpts};
use cineforge::drive::preview::PreviewDriver;
use cineforge::drive::ticker::{FrameTicker, SteppedTicker, WallTicker};
use cineforge::encode::ffmpeg::{FfmpegEncoder, FfmpegEncoderOpts, ensure_parent_dir};
use cineforge::{
    AspectRatio, AssetLibrary, AudioAsset, CpuSurface, DrawingSurface, FrameRGBA, LoadedProject,
    RenderInput, StyleConfig, Timeline, VisualStyle, render_frame,
};

#[derive(Parser, Debug)]
#[command(name = "cineforge", version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
    /// Run the looping preview for a while, writing a PNG snapshot every second.
    Preview(PreviewArgs),
    /// Capture the whole video (requires `ffmpeg` on PATH).
    Export(ExportArgs),
}

#[derive(Parser, Debug)]
struct ProjectArgs {
    /// Project JSON.
    #[arg(long = "project")]
    project: PathBuf,

    /// Override the project's aspect ratio ("16:9", "9:16" or "1:1").
    #[arg(long)]
    aspect: Option<AspectRatio>,

    /// Override the project's visual style ("cinematic", "modern" or "minimal").
    #[arg(long)]
    style: Option<VisualStyle>,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    project: ProjectArgs,

    /// Timeline time in milliseconds.
    #[arg(long, default_value_t = 0.0)]
    at_ms: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct PreviewArgs {
    #[command(flatten)]
    project: ProjectArgs,

    /// Host time to run the preview for, in seconds.
    #[arg(long, default_value_t = 3.0)]
    seconds: f64,

    /// Directory receiving `preview-<n>.png` snapshots.
    #[arg(long)]
    out_dir: PathBuf,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    #[command(flatten)]
    project: ProjectArgs,

    /// Directory receiving `cineforge-<unix_ms>.<ext>`.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Pace the capture on the wall clock instead of stepping frames back to back.
    #[arg(long, default_value_t = false)]
    realtime: bool,

    /// Leave the audio track out.
    #[arg(long, default_value_t = false)]
    no_audio: bool,

    /// Target video bitrate in bits per second.
    #[arg(long)]
    video_bitrate: Option<u32>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Preview(args) => cmd_preview(args),
        Command::Export(args) => cmd_export(args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();
}

/// Project media decoded and ready to render.
struct Session {
    project: LoadedProject,
    library: AssetLibrary,
    timeline: Timeline,
    style: StyleConfig,
}

impl Session {
    fn open(args: &ProjectArgs) -> anyhow::Result<Self> {
        let project = LoadedProject::load(&args.project)?;
        let mut style = project.style;
        if let Some(aspect) = args.aspect {
            style.aspect_ratio = aspect;
        }
        if let Some(s) = args.style {
            style.style = s;
        }

        let mut library = AssetLibrary::new();
        let decoded = library.load(project.images.clone()).len();
        if decoded < project.images.len() {
            tracing::warn!(
                decoded,
                requested = project.images.len(),
                "some images were skipped"
            );
        }
        let audio = project
            .audio
            .clone()
            .and_then(|src| match AudioAsset::new(src) {
                Ok(a) => Some(a),
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring project audio");
                    None
                }
            });
        library.set_audio(audio);

        let timeline = Timeline::build(library.images().len());
        Ok(Self {
            project,
            library,
            timeline,
            style,
        })
    }

    fn surface(&self) -> anyhow::Result<CpuSurface> {
        let surface = CpuSurface::new(self.style.frame_size())?;
        Ok(match self.project.fonts.as_ref() {
            Some(fonts) => surface.with_fonts(fonts)?,
            None => surface,
        })
    }

    fn input(&self, time_ms: f64) -> RenderInput<'_> {
        RenderInput {
            time_ms,
            timeline: &self.timeline,
            assets: self.library.images(),
            has_audio: self.library.audio().is_some(),
            text: &self.project.text,
            style: &self.style,
        }
    }
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let session = Session::open(&args.project)?;
    let mut surface = session.surface()?;
    render_frame(&mut surface, &session.input(args.at_ms));
    write_png(&args.out, &surface.read_frame())?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_preview(args: PreviewArgs) -> anyhow::Result<()> {
    let session = Session::open(&args.project)?;
    let mut surface = session.surface()?;
    let input = session.input(0.0);

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create output dir '{}'", args.out_dir.display()))?;

    let mut ticker = WallTicker::new(30);
    let mut driver = PreviewDriver::new();
    driver.start();

    let mut frames = 0u64;
    let mut snapshots = 0u64;
    let out_dir = args.out_dir.clone();
    driver.run_for(
        &mut ticker,
        &mut surface,
        &input,
        args.seconds * 1000.0,
        |t, surface| {
            if frames % 30 == 0 {
                let path = out_dir.join(format!("preview-{snapshots}.png"));
                write_png(&path, &surface.read_frame())
                    .map_err(cineforge::CineforgeError::from)?;
                tracing::debug!(t, path = %path.display(), "preview snapshot");
                snapshots += 1;
            }
            frames += 1;
            Ok(())
        },
    )?;
    driver.stop();

    eprintln!("previewed {frames} frames, wrote {snapshots} snapshots");
    Ok(())
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let session = Session::open(&args.project)?;
    let mut surface = session.surface()?;
    let input = session.input(0.0);

    let mut encoder = FfmpegEncoder::new(FfmpegEncoderOpts::default());
    anyhow::ensure!(encoder.is_available(), "ffmpeg is not available");

    let mut opts = CaptureOpts::default();
    if let Some(bitrate) = args.video_bitrate {
        opts = opts.with_video_bitrate(bitrate);
    }
    let mut ticker: Box<dyn FrameTicker> = if args.realtime {
        Box::new(WallTicker::new(opts.fps))
    } else {
        Box::new(SteppedTicker::new(opts.fps))
    };
    let audio = if args.no_audio {
        None
    } else {
        session.library.audio()
    };

    let report = CaptureDriver::new(opts).capture(
        ticker.as_mut(),
        &mut surface,
        &input,
        audio,
        &mut encoder,
    )?;

    let unix_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let out = args
        .out_dir
        .join(report.artifact.suggested_file_name(unix_ms));
    ensure_parent_dir(&out)?;
    std::fs::write(&out, &report.artifact.bytes)
        .with_context(|| format!("write video '{}'", out.display()))?;

    eprintln!(
        "wrote {} ({}, {} frames{})",
        out.display(),
        report.artifact.mime_type,
        report.frames_submitted,
        if report.audio_included { ", with audio" } else { "" }
    );
    Ok(())
}

fn write_png(path: &Path, frame: &FrameRGBA) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        path,
        &frame.to_straight_rgba8(),
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", path.display()))
}
