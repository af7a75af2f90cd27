//! Micro-averaged detection metrics over a batch of frames

use super::matcher::MatchResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Precision / recall / F1 computed from summed match counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl Scores {
    /// Every denominator is clamped to at least 1, so empty batches score 0
    /// and F1 never exceeds `2PR` when `P + R < 1`.
    pub fn from_counts(counts: &MatchResult) -> Self {
        let tp = counts.true_positives as f64;
        let precision = tp / ((counts.true_positives + counts.false_positives).max(1) as f64);
        let recall = tp / ((counts.true_positives + counts.false_negatives).max(1) as f64);
        let f1 = 2.0 * precision * recall / (precision + recall).max(1.0);

        Self {
            precision,
            recall,
            f1,
        }
    }
}

/// Processing-time statistics in milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingStats {
    pub avg_ms: f64,
    pub max_ms: f64,
    pub min_ms: f64,
}

/// Running totals for an evaluation batch
#[derive(Debug, Clone, Default)]
pub struct BatchAccumulator {
    totals: MatchResult,
    times_ms: Vec<f64>,
}

impl BatchAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one frame's match counts and detector processing time
    pub fn record(&mut self, result: MatchResult, processing_time: Duration) {
        self.totals += result;
        self.times_ms.push(processing_time.as_secs_f64() * 1000.0);
    }

    pub fn frame_count(&self) -> usize {
        self.times_ms.len()
    }

    pub fn totals(&self) -> MatchResult {
        self.totals
    }

    pub fn scores(&self) -> Scores {
        Scores::from_counts(&self.totals)
    }

    pub fn timing(&self) -> TimingStats {
        if self.times_ms.is_empty() {
            return TimingStats::default();
        }

        let sum: f64 = self.times_ms.iter().sum();
        TimingStats {
            avg_ms: sum / self.times_ms.len() as f64,
            max_ms: self.times_ms.iter().cloned().fold(f64::MIN, f64::max),
            min_ms: self.times_ms.iter().cloned().fold(f64::MAX, f64::min),
        }
    }

    /// Frames per second implied by the average processing time
    pub fn fps(&self) -> f64 {
        let avg_ms = self.timing().avg_ms;
        if avg_ms > 0.0 { 1000.0 / avg_ms } else { 0.0 }
    }
}
