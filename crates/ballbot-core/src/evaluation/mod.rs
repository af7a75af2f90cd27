//! Detection evaluation: matching, aggregation and the report artifact

pub mod ground_truth;
pub mod matcher;
pub mod metrics;
pub mod report;

pub use ground_truth::{GroundTruthSource, JsonGroundTruthDir};
pub use matcher::{DetectionEvaluator, EvaluatorConfig, MatchResult};
pub use metrics::{BatchAccumulator, Scores, TimingStats};
pub use report::{EvaluationReport, FrameDetail};
