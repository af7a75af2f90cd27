//! Batch evaluation harness
//!
//! Drives a detector over a directory of images, scores each frame against
//! its ground truth and collects the per-frame details into an
//! [`EvaluationReport`]. Frames are independent, so with the `parallel`
//! feature they are processed on the rayon pool; the report keeps file-name
//! order either way.

use crate::detection::BallDetector;
use crate::frame::Frame;
use crate::source::{frame_id_for, ImageDirSource};
use crate::utils::{draw_detections, ImageUtils, OverlayStyle};
use crate::{Result, VisionError};
use ballbot_core::evaluation::{DetectionEvaluator, EvaluationReport, FrameDetail, GroundTruthSource};
use ballbot_core::{Detection, GroundTruthObject};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Outcome of one evaluated frame
#[derive(Debug, Clone)]
pub struct FrameEvaluation {
    pub detail: FrameDetail,
    pub detections: Vec<Detection>,
}

pub struct EvaluationHarness<'a> {
    detector: &'a dyn BallDetector,
    evaluator: DetectionEvaluator,
    annotate_dir: Option<PathBuf>,
}

impl<'a> EvaluationHarness<'a> {
    pub fn new(detector: &'a dyn BallDetector, evaluator: DetectionEvaluator) -> Self {
        Self {
            detector,
            evaluator,
            annotate_dir: None,
        }
    }

    /// Write an annotated copy of every frame into `dir`
    pub fn with_annotations<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.annotate_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Detect and score a single frame. Only detection is timed.
    pub fn evaluate_frame(
        &self,
        frame_id: &str,
        frame: &Frame,
        ground_truth: &[GroundTruthObject],
    ) -> Result<FrameEvaluation> {
        let start = Instant::now();
        let detections = self.detector.detect(frame)?;
        let elapsed = start.elapsed();

        let result = self.evaluator.evaluate(&detections, ground_truth);
        log::debug!(
            "{}: {} detections, {} annotated, tp={} fp={} fn={} ({:.1} ms)",
            frame_id,
            detections.len(),
            ground_truth.len(),
            result.true_positives,
            result.false_positives,
            result.false_negatives,
            elapsed.as_secs_f64() * 1000.0
        );

        if let Some(dir) = &self.annotate_dir {
            if let Err(e) = save_annotated(dir, frame_id, frame, &detections) {
                log::warn!("could not save annotated {}: {:#}", frame_id, e);
            }
        }

        Ok(FrameEvaluation {
            detail: FrameDetail::new(frame_id, detections.len(), ground_truth.len(), result, elapsed),
            detections,
        })
    }

    /// Evaluate every image of `images`. Undecodable images are skipped
    /// with a warning and do not count as frames.
    pub fn run_dir<G>(&self, images: &Path, ground_truth: &G) -> Result<EvaluationReport>
    where
        G: GroundTruthSource + Sync + ?Sized,
    {
        let source = ImageDirSource::open(images)?;
        if let Some(dir) = &self.annotate_dir {
            std::fs::create_dir_all(dir)?;
        }
        let tolerances = self.evaluator.config();
        log::info!(
            "evaluating {} images with the {} detector (center tolerance {} px, radius tolerance {} px)",
            source.len(),
            self.detector.name(),
            tolerances.center_tolerance_px,
            tolerances.radius_tolerance_px
        );

        #[cfg(feature = "parallel")]
        let outcomes: Vec<Result<Option<FrameDetail>>> = source
            .paths()
            .par_iter()
            .map(|path| self.evaluate_path(path, ground_truth))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let outcomes: Vec<Result<Option<FrameDetail>>> = source
            .paths()
            .iter()
            .map(|path| self.evaluate_path(path, ground_truth))
            .collect();

        let mut details = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            if let Some(detail) = outcome? {
                details.push(detail);
            }
        }

        let report = EvaluationReport::from_details(details);
        log::info!(
            "precision {:.3}, recall {:.3}, f1 {:.3}, {:.1} fps over {} frames",
            report.metrics.precision,
            report.metrics.recall,
            report.metrics.f1,
            report.metrics.fps,
            report.frame_count
        );
        Ok(report)
    }

    fn evaluate_path<G>(&self, path: &Path, ground_truth: &G) -> Result<Option<FrameDetail>>
    where
        G: GroundTruthSource + Sync + ?Sized,
    {
        let frame_id = frame_id_for(path);
        let frame = match Frame::load(path) {
            Ok(frame) => frame,
            Err(e) if VisionError::is_invalid_frame(&e) => {
                log::warn!("skipping {}: {:#}", frame_id, e);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let truth = ground_truth.ground_truth(&frame_id);
        Ok(Some(self.evaluate_frame(&frame_id, &frame, &truth)?.detail))
    }
}

fn save_annotated(dir: &Path, frame_id: &str, frame: &Frame, detections: &[Detection]) -> Result<()> {
    let annotated = draw_detections(frame, detections, None, &OverlayStyle::default())?;
    ImageUtils::save_image(&annotated, dir.join(annotated_name(frame_id)))
}

fn annotated_name(frame_id: &str) -> String {
    let stem = Path::new(frame_id)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| frame_id.to_string());
    format!("{}_annotated.png", stem)
}
