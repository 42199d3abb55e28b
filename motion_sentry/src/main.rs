//! motion_sentry: count moving objects in a recorded frame sequence.
//!
//! Usage:
//!   motion_sentry <FRAMES_DIR> [OPTIONS]
//!
//! Frames are the image files of FRAMES_DIR in file-name order. Per-frame timings
//! and counts go to stdout; logs go to stderr (`RUST_LOG`, default `info`).

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use clap::Parser;
use motion_sentry::collaborators::{FrameSource, ImageSequenceSource, NullPreview, PngDumpPreview, Preview};
use motion_sentry::{PipelineDriver, Session, SessionConfig, Strategy};

#[derive(Parser)]
#[command(
    name = "motion_sentry",
    about = "Background-subtraction motion counter for recorded frame sequences",
    version
)]
struct Cli {
    /// Directory of frames, read in file-name order
    frames: PathBuf,

    /// JSON session configuration; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Scoring strategy: reference (1) or optimized (2)
    #[arg(short, long)]
    strategy: Option<Strategy>,

    /// Frames in the rolling background window
    #[arg(long)]
    window_size: Option<usize>,

    /// Minimum deviation for a pixel to count as moving
    #[arg(long)]
    sensitivity: Option<f64>,

    /// Minimum outer contour length of a counted object
    #[arg(long)]
    min_contour_points: Option<usize>,

    /// Worker threads for the optimized strategy (default: one per CPU)
    #[arg(long)]
    threads: Option<usize>,

    /// Stop after this many analyzed frames
    #[arg(long)]
    max_frames: Option<u64>,

    /// Write the latest input, mask and opened mask as PNG files here
    #[arg(long)]
    dump_dir: Option<PathBuf>,
}

impl Cli {
    fn session_config(&self) -> anyhow::Result<SessionConfig> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::from_json_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => SessionConfig::default(),
        };
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if let Some(window_size) = self.window_size {
            config.window_size = window_size;
        }
        if let Some(sensitivity) = self.sensitivity {
            config.sensitivity = sensitivity;
        }
        if let Some(min_contour_points) = self.min_contour_points {
            config.min_contour_points = min_contour_points;
        }
        if self.threads.is_some() {
            config.worker_threads = self.threads;
        }
        if self.max_frames.is_some() {
            config.max_frames = self.max_frames;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.session_config()?;

    let source: Box<dyn FrameSource> = match ImageSequenceSource::open(&cli.frames) {
        Ok(source) => Box::new(source),
        Err(e) if e.is_acquisition_unavailable() => {
            log::error!("{}", e);
            std::process::exit(-1);
        }
        Err(e) => return Err(e.into()),
    };
    let preview: Box<dyn Preview> = match &cli.dump_dir {
        Some(dir) => Box::new(PngDumpPreview::create(dir)?),
        None => Box::new(NullPreview),
    };

    let interrupt = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupt);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Interrupt received");
            flag.store(true, Ordering::SeqCst);
        }
    });

    let mut driver = PipelineDriver::new(config)?;
    let mut session = Session::with_interrupt(source, preview, interrupt);

    let summary = tokio::task::spawn_blocking(move || {
        let summary = driver.run(&mut session);
        drop(session);
        summary
    })
    .await
    .context("pipeline thread panicked")??;

    log::info!(
        "Session ended ({:?}): {} frames read, {} analyzed, last count {}",
        summary.stop,
        summary.frames_seen,
        summary.frames_analyzed,
        summary
            .last_component_count
            .map_or_else(|| String::from("n/a"), |c| c.to_string())
    );
    Ok(())
}
