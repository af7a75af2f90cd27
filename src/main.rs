use anyhow::{Context, Result};
use ballbot_core::evaluation::{DetectionEvaluator, JsonGroundTruthDir};
use ballbot_core::BehaviorStateMachine;
use ballbot_cv::{CameraSource, EvaluationHarness, FrameSource, ImageDirSource};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::Ordering;

mod config;
mod control;
mod pipeline;

use config::{ActuatorKind, AppConfig};
use control::ControlLoop;

#[derive(Parser, Debug)]
#[command(author, version, about = "Tennis-ball collecting robot: detection, evaluation and control")]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true, env = "BALLBOT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the control loop on the camera, or on an image directory for a dry run
    Run {
        /// Read frames from this directory instead of the camera
        #[arg(long)]
        images: Option<PathBuf>,
        /// Stop after this many cycles
        #[arg(long)]
        max_cycles: Option<u64>,
        /// Override the configured actuator
        #[arg(long, value_enum)]
        actuator: Option<ActuatorKind>,
    },
    /// Score the detector against annotated images and write a report
    Evaluate {
        #[arg(long)]
        images: PathBuf,
        /// Directory of `<image stem>.json` annotations
        #[arg(long)]
        ground_truth: PathBuf,
        #[arg(long, default_value = "evaluation_report.json")]
        report: PathBuf,
        /// Save annotated images into this directory
        #[arg(long)]
        annotate: Option<PathBuf>,
    },
    /// Detect balls in one image and print them as JSON
    Detect {
        image: PathBuf,
        /// Save an annotated copy to this file
        #[arg(long)]
        annotate: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.debug.log_level.as_str()))
        .init();
    if let Some(path) = &cli.config {
        log::info!("configuration loaded from {:?}", path);
    }

    match cli.command {
        Commands::Run {
            images,
            max_cycles,
            actuator,
        } => run(&config, images, max_cycles, actuator),
        Commands::Evaluate {
            images,
            ground_truth,
            report,
            annotate,
        } => evaluate(&config, images, ground_truth, report, annotate),
        Commands::Detect { image, annotate } => {
            let detector = pipeline::build_detector(&config)?;
            let result = pipeline::detect_image(detector.as_ref(), &image, annotate.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
    }
}

fn run(
    config: &AppConfig,
    images: Option<PathBuf>,
    max_cycles: Option<u64>,
    actuator: Option<ActuatorKind>,
) -> Result<()> {
    let source: Box<dyn FrameSource> = match images {
        Some(dir) => Box::new(ImageDirSource::open(dir)?),
        None => Box::new(CameraSource::open(
            config.hardware.camera_index,
            config.hardware.frame_width,
            config.hardware.frame_height,
        )?),
    };
    let detector = pipeline::build_detector(config)?;
    let actuator = pipeline::build_actuator(config, actuator.unwrap_or(config.hardware.actuator));
    let machine = BehaviorStateMachine::new(config.behavior());

    let mut control = ControlLoop::new(source, detector, machine, actuator);
    if config.debug.save_annotated {
        control = control.with_annotations(PathBuf::from(&config.debug.annotated_dir));
    }

    let running = control.running_flag();
    ctrlc::set_handler(move || {
        log::info!("shutdown signal received, finishing current cycle");
        running.store(false, Ordering::SeqCst);
    })
    .context("Failed to install Ctrl-C handler")?;

    let summary = control.run(max_cycles)?;
    log::info!(
        "final state {}, {} balls collected in {:.1} s",
        summary.final_state.state,
        summary.final_state.balls_collected,
        summary.elapsed.as_secs_f64()
    );
    Ok(())
}

fn evaluate(
    config: &AppConfig,
    images: PathBuf,
    ground_truth: PathBuf,
    report_path: PathBuf,
    annotate: Option<PathBuf>,
) -> Result<()> {
    let detector = pipeline::build_detector(config)?;
    let evaluator = DetectionEvaluator::new(config.evaluation.clone());

    let mut harness = EvaluationHarness::new(detector.as_ref(), evaluator);
    if let Some(dir) = annotate {
        harness = harness.with_annotations(dir);
    }

    let report = harness.run_dir(&images, &JsonGroundTruthDir::new(&ground_truth))?;
    report.save_json(&report_path)?;

    log::info!(
        "report saved to {:?}: precision {:.3}, recall {:.3}, f1 {:.3}, fps {:.1} (avg {:.1} ms, max {:.1} ms, min {:.1} ms)",
        report_path,
        report.metrics.precision,
        report.metrics.recall,
        report.metrics.f1,
        report.metrics.fps,
        report.timing.avg_ms,
        report.timing.max_ms,
        report.timing.min_ms
    );
    Ok(())
}
