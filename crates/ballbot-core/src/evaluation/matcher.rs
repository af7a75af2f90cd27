//! Greedy first-fit matching of detections against ground truth

use crate::config::{ensure_positive, ConfigError};
use crate::types::{Detection, GroundTruthObject};
use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Matching tolerances. These belong to the evaluator, not the detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// A pair matches only if the center distance is strictly below this
    pub center_tolerance_px: f64,
    /// A pair matches only if the radius difference is strictly below this
    pub radius_tolerance_px: f64,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            center_tolerance_px: 30.0,
            radius_tolerance_px: 15.0,
        }
    }
}

impl EvaluatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("evaluation.center_tolerance_px", self.center_tolerance_px)?;
        ensure_positive("evaluation.radius_tolerance_px", self.radius_tolerance_px)
    }
}

/// Match counts for one frame, or summed over a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl Add for MatchResult {
    type Output = MatchResult;

    fn add(self, rhs: MatchResult) -> MatchResult {
        MatchResult {
            true_positives: self.true_positives + rhs.true_positives,
            false_positives: self.false_positives + rhs.false_positives,
            false_negatives: self.false_negatives + rhs.false_negatives,
        }
    }
}

impl AddAssign for MatchResult {
    fn add_assign(&mut self, rhs: MatchResult) {
        *self = *self + rhs;
    }
}

impl Sum for MatchResult {
    fn sum<I: Iterator<Item = MatchResult>>(iter: I) -> Self {
        iter.fold(MatchResult::default(), Add::add)
    }
}

/// Scores detections against ground truth.
///
/// The assignment is greedy and first-fit: each detection, in the order
/// given, takes the first unmatched ground-truth object (by index) within
/// tolerance. It is not an optimal bipartite assignment, and a closer but
/// later ground-truth object loses to an earlier one.
#[derive(Debug, Clone, Default)]
pub struct DetectionEvaluator {
    config: EvaluatorConfig,
}

impl DetectionEvaluator {
    pub fn new(config: EvaluatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Count true/false positives and false negatives for one frame
    pub fn evaluate(&self, detections: &[Detection], ground_truth: &[GroundTruthObject]) -> MatchResult {
        let true_positives = self
            .assign(detections, ground_truth)
            .iter()
            .filter(|m| m.is_some())
            .count();

        MatchResult {
            true_positives,
            false_positives: detections.len().saturating_sub(true_positives),
            false_negatives: ground_truth.len().saturating_sub(true_positives),
        }
    }

    /// For each detection, the index of the ground-truth object it claimed
    pub fn assign(&self, detections: &[Detection], ground_truth: &[GroundTruthObject]) -> Vec<Option<usize>> {
        let mut matched = vec![false; ground_truth.len()];

        detections
            .iter()
            .map(|detection| {
                let hit = ground_truth
                    .iter()
                    .enumerate()
                    .find(|(idx, gt)| !matched[*idx] && self.is_match(detection, gt))
                    .map(|(idx, _)| idx);
                if let Some(idx) = hit {
                    matched[idx] = true;
                }
                hit
            })
            .collect()
    }

    fn is_match(&self, detection: &Detection, gt: &GroundTruthObject) -> bool {
        let center_distance = detection.center.distance_to(&gt.center());
        let radius_diff = (detection.radius - gt.radius).abs();

        center_distance < self.config.center_tolerance_px
            && radius_diff < self.config.radius_tolerance_px
    }
}
