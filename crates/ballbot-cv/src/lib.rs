//! Ballbot Computer Vision Library
//!
//! OpenCV-backed perception for the ball collecting robot: validated frames,
//! frame sources, interchangeable ball detectors, the batch evaluation
//! harness and overlay drawing.

pub mod bbox;
pub mod detection;
pub mod frame;
pub mod harness;
pub mod source;
pub mod utils;

// Re-export commonly used types
pub use bbox::BoxPrediction;
pub use detection::{BallDetector, ColorDetectionConfig, ColorDetector, ModelDetector, ModelDetectorConfig};
pub use frame::Frame;
pub use harness::EvaluationHarness;
pub use source::{CameraSource, CapturedFrame, FrameSource, ImageDirSource};

use thiserror::Error;

// Error handling
pub type Result<T> = anyhow::Result<T>;

/// Perception failures the control loop branches on
#[derive(Debug, Error)]
pub enum VisionError {
    /// The frame cannot be processed: empty, wrong depth or channel count,
    /// or undecodable. The cycle is skipped.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
    #[error("frame source exhausted")]
    EndOfStream,
}

impl VisionError {
    /// True when `err` is (or wraps) an [`VisionError::InvalidFrame`]
    pub fn is_invalid_frame(err: &anyhow::Error) -> bool {
        matches!(err.downcast_ref::<VisionError>(), Some(VisionError::InvalidFrame(_)))
    }
}
