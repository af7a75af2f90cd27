//! Evaluation report artifact

use super::matcher::MatchResult;
use super::metrics::{BatchAccumulator, TimingStats};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Per-frame line of the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameDetail {
    pub frame_id: String,
    pub detection_count: usize,
    pub ground_truth_count: usize,
    pub tp: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
    pub processing_time_ms: f64,
}

impl FrameDetail {
    pub fn new(
        frame_id: impl Into<String>,
        detection_count: usize,
        ground_truth_count: usize,
        result: MatchResult,
        processing_time: Duration,
    ) -> Self {
        Self {
            frame_id: frame_id.into(),
            detection_count,
            ground_truth_count,
            tp: result.true_positives,
            fp: result.false_positives,
            fn_: result.false_negatives,
            processing_time_ms: processing_time.as_secs_f64() * 1000.0,
        }
    }

    fn match_result(&self) -> MatchResult {
        MatchResult {
            true_positives: self.tp,
            false_positives: self.fp,
            false_negatives: self.fn_,
        }
    }
}

/// Headline metrics of a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub fps: f64,
    pub avg_processing_time_ms: f64,
}

/// Summed match counts of a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportTotals {
    pub tp: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
}

/// The evaluation report written after a batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Seconds since the Unix epoch
    pub timestamp: u64,
    pub frame_count: usize,
    pub metrics: ReportMetrics,
    pub totals: ReportTotals,
    pub timing: TimingStats,
    pub details: Vec<FrameDetail>,
}

impl EvaluationReport {
    /// Build a report from per-frame details, summing counts across frames
    pub fn from_details(details: Vec<FrameDetail>) -> Self {
        let mut acc = BatchAccumulator::new();
        for detail in &details {
            acc.record(
                detail.match_result(),
                Duration::from_secs_f64(detail.processing_time_ms / 1000.0),
            );
        }

        let scores = acc.scores();
        let timing = acc.timing();
        let totals = acc.totals();
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        Self {
            timestamp,
            frame_count: acc.frame_count(),
            metrics: ReportMetrics {
                precision: scores.precision,
                recall: scores.recall,
                f1: scores.f1,
                fps: acc.fps(),
                avg_processing_time_ms: timing.avg_ms,
            },
            totals: ReportTotals {
                tp: totals.true_positives,
                fp: totals.false_positives,
                fn_: totals.false_negatives,
            },
            timing,
            details,
        }
    }

    /// Write the report as pretty-printed JSON
    pub fn save_json(&self, output_path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize evaluation report")?;

        std::fs::write(output_path, json)
            .with_context(|| format!("Failed to write report to: {:?}", output_path))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn detail(id: &str, tp: usize, fp: usize, fn_: usize, ms: u64) -> FrameDetail {
        FrameDetail::new(
            id,
            tp + fp,
            tp + fn_,
            MatchResult {
                true_positives: tp,
                false_positives: fp,
                false_negatives: fn_,
            },
            Duration::from_millis(ms),
        )
    }

    #[test]
    fn test_report_aggregates_details() {
        let report = EvaluationReport::from_details(vec![
            detail("a.jpg", 2, 0, 0, 20),
            detail("b.jpg", 1, 2, 1, 30),
        ]);

        assert_eq!(report.frame_count, 2);
        assert_eq!(report.totals, ReportTotals { tp: 3, fp: 2, fn_: 1 });
        assert_relative_eq!(report.metrics.precision, 0.6);
        assert_relative_eq!(report.metrics.recall, 0.75);
        assert_relative_eq!(report.metrics.avg_processing_time_ms, 25.0, epsilon = 1e-9);
        assert_relative_eq!(report.timing.max_ms, 30.0, epsilon = 1e-9);
        assert!(report.timestamp > 0);
    }

    #[test]
    fn test_report_json_field_names() -> Result<()> {
        let report = EvaluationReport::from_details(vec![detail("a.jpg", 1, 0, 0, 5)]);
        let value = serde_json::to_value(&report)?;

        assert_eq!(value["details"][0]["frame_id"], "a.jpg");
        assert_eq!(value["details"][0]["fn"], 0);
        assert!(value["metrics"]["f1"].is_number());
        assert!(value["totals"]["fn"].is_number());
        Ok(())
    }

    #[test]
    fn test_save_json_roundtrip() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("report.json");
        let report = EvaluationReport::from_details(vec![detail("a.jpg", 0, 1, 1, 12)]);

        report.save_json(&path)?;
        let loaded: EvaluationReport = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(loaded.frame_count, 1);
        assert_eq!(loaded.details[0].frame_id, "a.jpg");
        assert_eq!(loaded.totals, report.totals);
        Ok(())
    }
}
