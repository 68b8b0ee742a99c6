use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

use photoreel::{
    FsImageLoader, Manifest, OutputFormat, RenderToWebmOpts, SecondsPerFrame, SharePlatform,
    ShareOutcome, SystemClipboard, SystemWindowOpener, VideoArtifact,
};

#[derive(Parser, Debug)]
#[command(name = "photoreel", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the output format presets.
    Formats,
    /// Composite a single frame as a PNG.
    Frame(FrameArgs),
    /// Render a WebM slideshow (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Share an existing artifact or copy its link.
    Share(ShareArgs),
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input manifest JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Selected-slot index (0-based, in render order).
    #[arg(long, default_value_t = 0)]
    index: usize,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input manifest JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output WebM path.
    #[arg(long)]
    out: PathBuf,

    /// Override the manifest's seconds-per-frame.
    #[arg(long)]
    seconds_per_frame: Option<f64>,

    /// Override the manifest's output format preset.
    #[arg(long)]
    format: Option<String>,

    /// Copy the artifact link to the clipboard after encoding.
    #[arg(long)]
    copy_link: bool,
}

#[derive(Parser, Debug)]
struct ShareArgs {
    /// Artifact file produced by `render`.
    #[arg(long)]
    file: PathBuf,

    /// Target platform.
    #[arg(long, value_enum)]
    platform: PlatformChoice,

    /// Copy the artifact link to the clipboard as well.
    #[arg(long)]
    copy_link: bool,

    /// Print the share URL instead of opening a window.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PlatformChoice {
    Facebook,
    Twitter,
    Instagram,
    Youtube,
}

impl From<PlatformChoice> for SharePlatform {
    fn from(choice: PlatformChoice) -> Self {
        match choice {
            PlatformChoice::Facebook => SharePlatform::Facebook,
            PlatformChoice::Twitter => SharePlatform::Twitter,
            PlatformChoice::Instagram => SharePlatform::Instagram,
            PlatformChoice::Youtube => SharePlatform::Youtube,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Formats => cmd_formats(),
        Command::Frame(args) => cmd_frame(args),
        Command::Render(args) => cmd_render(args),
        Command::Share(args) => cmd_share(args),
    }
}

fn cmd_formats() -> anyhow::Result<()> {
    for format in OutputFormat::catalog() {
        println!(
            "{:<12} {:<18} {:>4}x{:<4}  {}",
            format.key(),
            format.name,
            format.width,
            format.height,
            format.platform_hint
        );
    }
    Ok(())
}

fn assets_root(manifest_path: &Path) -> PathBuf {
    manifest_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf()
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let manifest = Manifest::from_path(&args.in_path)?;
    let format = *manifest.resolved_format()?;
    let selection = manifest.build_selection();
    let loader = FsImageLoader::new(assets_root(&args.in_path));

    let selected = selection.selected_items();
    let item = selected.get(args.index).with_context(|| {
        format!(
            "frame index {} out of range ({} selected items)",
            args.index,
            selected.len()
        )
    })?;

    let frame = photoreel::compose_frame(item, &format, &manifest.overlay, &loader)?;
    photoreel::save_frame_png(&frame, &args.out)?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let manifest = Manifest::from_path(&args.in_path)?;

    let seconds_per_frame = match args.seconds_per_frame {
        Some(secs) => SecondsPerFrame::new(secs)?,
        None => manifest.seconds_per_frame,
    };
    let format = match args.format.as_deref() {
        Some(key) => *OutputFormat::by_key(key)
            .with_context(|| format!("unknown output format '{key}'"))?,
        None => *manifest.resolved_format()?,
    };

    let selection = manifest.build_selection();
    let loader = FsImageLoader::new(assets_root(&args.in_path));

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40.cyan/blue}] {pos}% {msg}")
            .unwrap()
            .progress_chars("█▓░"),
    );
    bar.set_message("encoding");

    let (artifact, stats) = photoreel::render_to_webm(
        &selection,
        format,
        seconds_per_frame,
        &manifest.overlay,
        &loader,
        &args.out,
        RenderToWebmOpts::default(),
        |p| bar.set_position(u64::from(p)),
    )?;
    bar.finish_with_message("done");

    if stats.frames_skipped > 0 {
        eprintln!(
            "warning: {} of {} frames skipped (sources failed to load)",
            stats.frames_skipped, stats.frames_total
        );
    }
    eprintln!(
        "wrote {} ({} frames, {:.1}s, {} bytes)",
        artifact.path().display(),
        stats.frames_rendered,
        seconds_per_frame.duration_secs(stats.frames_rendered as usize),
        artifact.byte_len()
    );

    if args.copy_link {
        let mut clipboard = SystemClipboard;
        if photoreel::copy_link(&mut clipboard, &artifact.handle()) {
            eprintln!("copied {}", artifact.handle());
        } else {
            eprintln!("could not copy link to clipboard");
        }
    }
    Ok(())
}

fn cmd_share(args: ShareArgs) -> anyhow::Result<()> {
    let artifact = VideoArtifact::from_path(&args.file)?;
    let handle = artifact.handle();
    let platform = SharePlatform::from(args.platform);

    if args.copy_link {
        let mut clipboard = SystemClipboard;
        if photoreel::copy_link(&mut clipboard, &handle) {
            eprintln!("copied {handle}");
        } else {
            eprintln!("could not copy link to clipboard");
        }
    }

    if args.dry_run {
        match photoreel::share_url(platform, &handle) {
            Some(url) => println!("{url}"),
            None => println!("{platform}: manual upload required"),
        }
        return Ok(());
    }

    let mut opener = SystemWindowOpener;
    match photoreel::share(platform, &handle, &mut opener)? {
        ShareOutcome::Opened { url } => eprintln!("opened {url}"),
        ShareOutcome::ManualUpload { instructions } => eprintln!("{instructions}"),
    }
    Ok(())
}
