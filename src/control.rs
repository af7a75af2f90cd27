//! The perception-to-action loop: acquire, detect, step, execute

use anyhow::Result;
use ballbot_core::{Actuator, BehaviorStateMachine, Detection, Snapshot};
use ballbot_cv::utils::{draw_detections, ImageUtils, OverlayStyle};
use ballbot_cv::{BallDetector, CapturedFrame, FrameSource, VisionError};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const THROUGHPUT_LOG_EVERY: u64 = 100;

/// Counters of a finished run
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunSummary {
    pub cycles: u64,
    pub skipped_frames: u64,
    pub actuation_failures: u64,
    pub final_state: Snapshot,
    pub elapsed: Duration,
}

impl RunSummary {
    /// Attempted cycles per second of wall time, 0 for an empty run
    pub fn cycles_per_sec(&self) -> f64 {
        cycles_per_sec(self.cycles, self.elapsed)
    }
}

fn cycles_per_sec(cycles: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if cycles == 0 || secs <= 0.0 { 0.0 } else { cycles as f64 / secs }
}

enum CycleOutcome {
    Completed,
    Skipped,
    EndOfStream,
}

pub struct ControlLoop<A: Actuator> {
    source: Box<dyn FrameSource>,
    detector: Box<dyn BallDetector>,
    machine: BehaviorStateMachine,
    actuator: A,
    running: Arc<AtomicBool>,
    annotate_dir: Option<PathBuf>,
}

impl<A: Actuator> ControlLoop<A> {
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: Box<dyn BallDetector>,
        machine: BehaviorStateMachine,
        actuator: A,
    ) -> Self {
        Self {
            source,
            detector,
            machine,
            actuator,
            running: Arc::new(AtomicBool::new(true)),
            annotate_dir: None,
        }
    }

    /// Save an annotated copy of every processed frame into `dir`
    pub fn with_annotations(mut self, dir: PathBuf) -> Self {
        self.annotate_dir = Some(dir);
        self
    }

    /// Flag that stops the loop before its next cycle once cleared
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn snapshot(&self) -> Snapshot {
        self.machine.snapshot()
    }

    /// Run until the source ends, the running flag is cleared or
    /// `max_cycles` cycles (skipped ones included) have been attempted.
    /// The drive is stopped on every exit path.
    pub fn run(&mut self, max_cycles: Option<u64>) -> Result<RunSummary> {
        if let Some(dir) = &self.annotate_dir {
            std::fs::create_dir_all(dir)?;
        }
        log::info!(
            "control loop started: source {}, detector {}, actuator {}",
            self.source.name(),
            self.detector.name(),
            self.actuator.name()
        );

        let mut summary = RunSummary::default();
        let started = Instant::now();
        let result = self.drive_cycles(max_cycles, &mut summary, started);
        summary.elapsed = started.elapsed();

        if let Err(e) = self.actuator.stop() {
            log::warn!("failed to stop actuator: {}", e);
        }
        summary.final_state = self.machine.snapshot();
        log::info!(
            "control loop finished after {} cycles ({} frames captured, {:.1} cycles/s): {} balls collected, {} frames skipped, {} actuation failures",
            summary.cycles,
            self.source.frames_captured(),
            summary.cycles_per_sec(),
            summary.final_state.balls_collected,
            summary.skipped_frames,
            summary.actuation_failures
        );

        result.map(|_| summary)
    }

    fn drive_cycles(&mut self, max_cycles: Option<u64>, summary: &mut RunSummary, started: Instant) -> Result<()> {
        while self.running.load(Ordering::SeqCst) {
            if max_cycles.is_some_and(|max| summary.cycles >= max) {
                break;
            }
            summary.cycles += 1;

            match self.cycle(summary)? {
                CycleOutcome::Completed => {}
                CycleOutcome::Skipped => summary.skipped_frames += 1,
                CycleOutcome::EndOfStream => {
                    summary.cycles -= 1;
                    log::info!("frame source {} exhausted", self.source.name());
                    break;
                }
            }

            if summary.cycles % THROUGHPUT_LOG_EVERY == 0 {
                log::info!(
                    "{} cycles, {:.1} cycles/s, {} balls collected",
                    summary.cycles,
                    cycles_per_sec(summary.cycles, started.elapsed()),
                    self.machine.balls_collected()
                );
            }
        }
        Ok(())
    }

    fn cycle(&mut self, summary: &mut RunSummary) -> Result<CycleOutcome> {
        let captured = match self.source.next_frame() {
            Ok(Some(captured)) => captured,
            Ok(None) => return Ok(CycleOutcome::EndOfStream),
            Err(e) => return skip_or_fail(e),
        };

        let detections = match self.detector.detect(&captured.frame) {
            Ok(detections) => detections,
            Err(e) => return skip_or_fail(e),
        };
        log::debug!("{}: {} detections", captured.id, detections.len());

        let transition = self.machine.step(&detections);
        let outcome = self.actuator.execute(&transition.command);
        if let Err(e) = &outcome {
            summary.actuation_failures += 1;
            log::warn!("actuator failed on {}: {}", transition.command, e);
        }
        self.machine.acknowledge(&outcome);

        if let Some(dir) = &self.annotate_dir {
            if let Err(e) = save_annotated(dir, &captured, &detections, &self.machine.snapshot()) {
                log::warn!("could not save annotated {}: {:#}", captured.id, e);
            }
        }

        Ok(CycleOutcome::Completed)
    }
}

fn skip_or_fail(err: anyhow::Error) -> Result<CycleOutcome> {
    match err.downcast_ref::<VisionError>() {
        Some(VisionError::InvalidFrame(_)) => {
            log::warn!("skipping cycle: {:#}", err);
            Ok(CycleOutcome::Skipped)
        }
        Some(VisionError::EndOfStream) => Ok(CycleOutcome::EndOfStream),
        None => Err(err),
    }
}

fn save_annotated(
    dir: &std::path::Path,
    captured: &CapturedFrame,
    detections: &[Detection],
    snapshot: &Snapshot,
) -> Result<()> {
    let annotated = draw_detections(&captured.frame, detections, Some(snapshot), &OverlayStyle::default())?;
    let stem = std::path::Path::new(&captured.id)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| captured.id.clone());
    ImageUtils::save_image(&annotated, dir.join(format!("{:06}_{}.png", snapshot.cycle, stem)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballbot_core::actuation::{ActuationError, SimulatedActuator};
    use ballbot_core::{Command, Point2, RobotState};
    use ballbot_cv::Frame;
    use std::collections::VecDeque;

    /// Hands out blank frames, or an invalid-frame error where the script says so
    struct ScriptedSource {
        script: VecDeque<bool>,
        served: u64,
    }

    impl ScriptedSource {
        fn new(script: &[bool]) -> Self {
            Self {
                script: script.iter().copied().collect(),
                served: 0,
            }
        }
    }

    impl FrameSource for ScriptedSource {
        fn name(&self) -> String {
            "scripted".into()
        }

        fn next_frame(&mut self) -> Result<Option<CapturedFrame>> {
            let Some(valid) = self.script.pop_front() else {
                return Ok(None);
            };
            if !valid {
                return Err(VisionError::InvalidFrame("corrupt".into()).into());
            }
            self.served += 1;
            Ok(Some(CapturedFrame {
                id: format!("frame{}", self.served),
                frame: Frame::from_bgr_bytes(64, 48, &[0u8; 64 * 48 * 3])?,
            }))
        }

        fn frames_captured(&self) -> u64 {
            self.served
        }
    }

    /// Replays one detection list per call, ignoring the pixels
    struct ScriptedDetector {
        script: std::sync::Mutex<VecDeque<Vec<Detection>>>,
    }

    impl ScriptedDetector {
        fn new(script: Vec<Vec<Detection>>) -> Self {
            Self {
                script: std::sync::Mutex::new(script.into()),
            }
        }
    }

    impl BallDetector for ScriptedDetector {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn detect(&self, _frame: &Frame) -> Result<Vec<Detection>> {
            let mut script = self.script.lock().map_err(|_| anyhow::anyhow!("poisoned"))?;
            Ok(script.pop_front().unwrap_or_default())
        }
    }

    /// Fails every collect
    #[derive(Default)]
    struct JammedGripper {
        calls: usize,
    }

    impl Actuator for JammedGripper {
        fn name(&self) -> &'static str {
            "jammed"
        }

        fn execute(&mut self, command: &Command) -> Result<(), ActuationError> {
            self.calls += 1;
            match command {
                Command::CollectAtCurrentPosition => Err(ActuationError::Hardware("gripper jammed".into())),
                _ => Ok(()),
            }
        }

        fn stop(&mut self) -> Result<(), ActuationError> {
            Ok(())
        }
    }

    fn ball(distance_cm: f64) -> Detection {
        Detection::new(Point2::new(32.0, 24.0), 6.7 * 800.0 / (2.0 * distance_cm), distance_cm, 0.0)
    }

    #[test]
    fn test_runs_scenario_and_stops_drive() -> Result<()> {
        let mut control = ControlLoop::new(
            Box::new(ScriptedSource::new(&[true, true, true, true])),
            Box::new(ScriptedDetector::new(vec![vec![], vec![ball(50.0)], vec![ball(20.0)], vec![]])),
            BehaviorStateMachine::default(),
            SimulatedActuator::new(),
        );

        let summary = control.run(None)?;
        assert_eq!(summary.cycles, 4);
        assert_eq!(summary.final_state.balls_collected, 1);
        assert_eq!(summary.final_state.state, RobotState::Searching);
        assert_eq!(control.actuator().history().len(), 4);
        assert_eq!(control.actuator().history()[2], Command::CollectAtCurrentPosition);
        assert_eq!(control.actuator().stop_count(), 1);
        Ok(())
    }

    #[test]
    fn test_invalid_frames_are_skipped() -> Result<()> {
        let mut control = ControlLoop::new(
            Box::new(ScriptedSource::new(&[true, false, true])),
            Box::new(ScriptedDetector::new(vec![vec![ball(80.0)], vec![]])),
            BehaviorStateMachine::default(),
            SimulatedActuator::new(),
        );

        let summary = control.run(None)?;
        assert_eq!(summary.cycles, 3);
        assert_eq!(summary.skipped_frames, 1);
        assert_eq!(control.actuator().history().len(), 2);
        Ok(())
    }

    #[test]
    fn test_failed_collect_is_logged_not_fatal() -> Result<()> {
        let mut control = ControlLoop::new(
            Box::new(ScriptedSource::new(&[true, true, true])),
            Box::new(ScriptedDetector::new(vec![vec![ball(10.0)], vec![], vec![]])),
            BehaviorStateMachine::default(),
            JammedGripper::default(),
        );

        let summary = control.run(None)?;
        assert_eq!(summary.actuation_failures, 1);
        assert_eq!(summary.final_state.balls_collected, 0);
        assert_eq!(control.actuator().calls, 3);
        Ok(())
    }

    #[test]
    fn test_max_cycles_and_running_flag() -> Result<()> {
        let mut control = ControlLoop::new(
            Box::new(ScriptedSource::new(&[true; 10])),
            Box::new(ScriptedDetector::new(Vec::new())),
            BehaviorStateMachine::default(),
            SimulatedActuator::new(),
        );
        assert_eq!(control.run(Some(3))?.cycles, 3);

        control.running_flag().store(false, Ordering::SeqCst);
        assert_eq!(control.run(None)?.cycles, 0);
        assert_eq!(control.actuator().stop_count(), 2);
        Ok(())
    }

    #[test]
    fn test_summary_reports_throughput() -> Result<()> {
        let mut control = ControlLoop::new(
            Box::new(ScriptedSource::new(&[true; 3])),
            Box::new(ScriptedDetector::new(Vec::new())),
            BehaviorStateMachine::default(),
            SimulatedActuator::new(),
        );
        let summary = control.run(None)?;
        assert_eq!(summary.cycles, 3);
        assert!(summary.cycles_per_sec() >= 0.0);

        let timed = RunSummary {
            cycles: 50,
            elapsed: Duration::from_secs(2),
            ..Default::default()
        };
        assert_eq!(timed.cycles_per_sec(), 25.0);
        assert_eq!(RunSummary::default().cycles_per_sec(), 0.0);
        Ok(())
    }

    #[test]
    fn test_annotations_written() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut control = ControlLoop::new(
            Box::new(ScriptedSource::new(&[true])),
            Box::new(ScriptedDetector::new(vec![vec![ball(50.0)]])),
            BehaviorStateMachine::default(),
            SimulatedActuator::new(),
        )
        .with_annotations(dir.path().to_path_buf());

        control.run(None)?;
        assert!(dir.path().join("000001_frame1.png").exists());
        Ok(())
    }
}
