//! live_tester: count moving objects in front of the default camera.
//!
//! Asks for a scoring strategy, opens camera 0 and three preview windows, and runs
//! until `q`/`Q` is pressed or the camera stops delivering frames.

mod camera;
mod highgui_preview;
mod mat_convert;
mod opencv_blob_ops;

use anyhow::Context;
use camera::CameraSource;
use highgui_preview::HighguiPreview;
use motion_sentry::{BlobFilter, PipelineDriver, Session, SessionConfig, Strategy};
use opencv_blob_ops::{OpencvContours, OpencvMorphology};
use std::io::{self, BufRead, Write};

const CAMERA_INDEX: i32 = 0;

fn prompt_strategy() -> anyhow::Result<Strategy> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        println!("Choose a detection strategy:");
        println!("  1 - reference (best quality)");
        println!("  2 - optimized");
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            anyhow::bail!("stdin closed before a strategy was chosen");
        };
        match line?.parse::<Strategy>() {
            Ok(strategy) => return Ok(strategy),
            Err(e) => println!("{e}"),
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = SessionConfig::default().with_strategy(prompt_strategy()?);

    let source = match CameraSource::open(CAMERA_INDEX) {
        Ok(source) => source,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(-1);
        }
    };
    let preview = HighguiPreview::open().context("opening preview windows")?;

    let blob_filter = BlobFilter::new(&config, Box::new(OpencvMorphology), Box::new(OpencvContours));
    let mut driver = PipelineDriver::with_blob_filter(config, blob_filter)?;
    let mut session = Session::new(Box::new(source), Box::new(preview));

    let summary = driver.run(&mut session)?;
    drop(session);

    log::info!(
        "Stopped ({:?}) after {} frames, {} analyzed",
        summary.stop,
        summary.frames_seen,
        summary.frames_analyzed
    );
    Ok(())
}
