use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use framestage::Surface as _;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "framestage", version)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the frame index each instance shows over a time span.
    Timeline(TimelineArgs),
    /// Activate the stage, advance to a moment and write one PNG per instance.
    Snapshot(SnapshotArgs),
}

#[derive(Parser, Debug)]
struct TimelineArgs {
    /// Site config JSON.
    #[arg(long = "config")]
    config: PathBuf,

    /// Span to sample, in seconds.
    #[arg(long, default_value_t = 2.0)]
    secs: f64,

    /// Samples per second.
    #[arg(long, default_value_t = 10.0)]
    rate: f64,
}

#[derive(Parser, Debug)]
struct SnapshotArgs {
    /// Site config JSON.
    #[arg(long = "config")]
    config: PathBuf,

    /// Directory image URIs resolve against. Defaults to the config's directory.
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Seconds after activation.
    #[arg(long, default_value_t = 0.0)]
    at: f64,

    /// Output directory for PNGs.
    #[arg(long)]
    out: PathBuf,

    #[arg(long, default_value_t = 1280.0)]
    width: f64,

    #[arg(long, default_value_t = 800.0)]
    height: f64,

    /// Device pixel ratio.
    #[arg(long, default_value_t = 1.0)]
    dpr: f64,

    /// Give up waiting for image decode after this many seconds.
    #[arg(long, default_value_t = 30.0)]
    load_timeout: f64,
}

/// Upper bound on timeline samples per instance.
const MAX_TIMELINE_SAMPLES: u64 = 1_000_000;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Timeline(args) => cmd_timeline(args),
        Command::Snapshot(args) => cmd_snapshot(args),
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_timeline(args: TimelineArgs) -> anyhow::Result<()> {
    anyhow::ensure!(
        args.secs.is_finite() && args.secs >= 0.0,
        "--secs must be finite and >= 0"
    );
    anyhow::ensure!(
        args.rate.is_finite() && args.rate > 0.0,
        "--rate must be finite and > 0"
    );

    let samples = (args.secs * args.rate).floor();
    anyhow::ensure!(
        samples <= MAX_TIMELINE_SAMPLES as f64,
        "--secs x --rate gives {samples} samples; at most {MAX_TIMELINE_SAMPLES} allowed"
    );
    let samples = samples as u64;

    let cfg = framestage::SiteConfig::from_path(&args.config)?;
    let pool_len = cfg.sources.len();

    for section in &cfg.sections {
        for (slot, desc) in section.instances.iter().enumerate() {
            let mut player = framestage::SequencePlayer::new(desc.playback()?, pool_len);
            player.start(Duration::ZERO);

            let mut indices = Vec::new();
            for i in 0..=samples {
                let t = Duration::from_secs_f64(i as f64 / args.rate);
                player.tick(t);
                indices.push(match player.current_index() {
                    Some(idx) => idx.to_string(),
                    None => "-".to_string(),
                });
            }
            println!("{}[{slot}]: {}", section.name, indices.join(" "));
        }
    }
    Ok(())
}

fn cmd_snapshot(args: SnapshotArgs) -> anyhow::Result<()> {
    let cfg = framestage::SiteConfig::from_path(&args.config)?;
    let assets_root = match &args.assets {
        Some(dir) => dir.clone(),
        None => args
            .config
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf(),
    };

    let pool = framestage::ImagePool::new(Arc::new(framestage::DirSource::new(assets_root)));
    let handle = pool.load(&cfg.sources);
    let timeout = Duration::try_from_secs_f64(args.load_timeout.max(0.0))
        .context("--load-timeout out of range")?;
    if !handle.wait_settled(timeout) {
        tracing::warn!(
            ready = handle.ready_count(),
            total = handle.len(),
            "image pool did not settle in time; unready frames stay blank"
        );
    }
    if handle.failed_count() > 0 {
        tracing::warn!(failed = handle.failed_count(), "some frames failed to load");
    }

    let viewport = framestage::Viewport::new(args.width, args.height, args.dpr)?;
    let clock = Arc::new(framestage::ManualClock::new());
    let factory: framestage::SurfaceFactory =
        Box::new(|| Box::new(framestage::CpuSurface::default()) as Box<dyn framestage::Surface>);
    let mut stage = framestage::Stage::new(cfg, handle, clock.clone(), factory)?;
    stage.resize_viewport(viewport);

    stage.click_heading(framestage::Point::new(args.width / 2.0, args.height / 2.0));
    clock.set_secs(args.at);
    let report = stage.tick();

    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("create output dir '{}'", args.out.display()))?;

    let mut written = 0usize;
    for inst in stage.mounted() {
        let key = inst.key();
        let Some(frame) = inst.renderer().surface().snapshot() else {
            tracing::debug!(?key, "nothing painted; skipping");
            continue;
        };
        let name = stage
            .config()
            .sections
            .get(key.section)
            .map_or("section", |s| s.name.as_str());
        let path = args
            .out
            .join(format!("{name}-{}-{}.png", key.copy, key.slot));
        image::save_buffer_with_format(
            &path,
            &frame.to_straight_rgba8(),
            frame.width,
            frame.height,
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("write png '{}'", path.display()))?;
        written += 1;
    }

    eprintln!(
        "wrote {written} of {} instance(s) to {} (palette bg {})",
        report.instances.len(),
        args.out.display(),
        report.trigger.palette.background.to_hex()
    );
    Ok(())
}
