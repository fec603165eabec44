//! count_replay - count distinct objects in precomputed detector output
//!
//! This tool:
//! 1. Loads a JSON-lines replay file (one line of detections per frame)
//! 2. Runs it through a processing session on a worker thread
//! 3. Cancels cooperatively on Ctrl-C, keeping the partial counts
//! 4. Prints the per-class summary and optionally exports it as CSV

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Parser;

use object_counter::integration::replay::{ReplayDetector, ReplaySource};
use object_counter::{CounterConfig, LogObserver, ProcessingSession, RunState, export_csv};

#[derive(Parser, Debug)]
#[command(
    name = "count_replay",
    about = "Deduplicated per-class object counts from replayed detections"
)]
struct Args {
    /// JSON-lines file with one array of detections per frame
    #[arg(long, short)]
    input: PathBuf,

    /// TOML counter configuration
    #[arg(long, env = "OBJECT_COUNTER_CONFIG")]
    config: Option<PathBuf>,

    /// IoU above which a detection repeats an earlier one (overrides config)
    #[arg(long)]
    iou: Option<f32>,

    /// Frame rate of the source video, for the duration report
    #[arg(long)]
    fps: Option<f64>,

    /// Write the summary as CSV to this path
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Print the summary as JSON instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => CounterConfig::load(path)?,
        None => CounterConfig::default(),
    };
    if let Some(iou) = args.iou {
        config = config.with_iou_threshold(iou);
    }
    let mut session = ProcessingSession::new(config)?;

    let mut source = ReplaySource::from_path(&args.input)
        .with_context(|| format!("loading {}", args.input.display()))?;
    if let Some(fps) = args.fps {
        source = source.with_frame_rate(fps);
    }

    let handle = session.handle();
    ctrlc::set_handler(move || handle.cancel()).context("setting Ctrl-C handler")?;

    log::info!("Loading {}", args.input.display());
    session.start(source, ReplayDetector, LogObserver::new())?;
    let summary = session
        .wait()
        .ok_or_else(|| anyhow!("processing worker stopped unexpectedly"))?;

    if args.json {
        let report = serde_json::json!({
            "state": summary.state,
            "frames": summary.frames_processed,
            "elapsed_secs": summary.elapsed.as_secs_f64(),
            "video_secs": summary.video_duration.map(|d| d.as_secs_f64()),
            "counts": summary.counts,
            "failure": summary.failure.as_ref().map(|e| e.to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", summary.counts);
    }

    if let Some(path) = &args.csv {
        if summary.counts.is_empty() {
            log::warn!("No data to export");
        } else {
            export_csv(&summary.counts, path)?;
        }
    }

    if let Some(err) = summary.failure {
        return Err(err.into());
    }
    if summary.state == RunState::Cancelled {
        log::info!("Processing cancelled by user");
    }
    Ok(())
}
