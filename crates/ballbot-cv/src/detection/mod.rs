//! Ball detection backends
//!
//! Every backend turns one [`Frame`] into the detections of that frame and
//! nothing else: no state survives between calls and the frame is never
//! modified. Callers hold a `Box<dyn BallDetector>` and do not know which
//! backend runs.

pub mod color;
pub mod config;
pub mod model;

pub use color::ColorDetector;
pub use config::{ColorDetectionConfig, ModelDetectorConfig};
#[cfg(feature = "dnn")]
pub use model::DnnPredictor;
pub use model::{BoxPredictor, ModelDetector};

use crate::frame::Frame;
use crate::Result;
use ballbot_core::{geometry, Detection, Point2};

/// Turns a frame into ball detections
pub trait BallDetector: Send + Sync {
    /// Backend identifier for logs and reports
    fn name(&self) -> &'static str;

    /// Detect balls in `frame`, in the backend's emission order
    fn detect(&self, frame: &Frame) -> Result<Vec<Detection>>;
}

impl<D: BallDetector + ?Sized> BallDetector for Box<D> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn detect(&self, frame: &Frame) -> Result<Vec<Detection>> {
        (**self).detect(frame)
    }
}

/// Attach distance and offset to a candidate circle.
///
/// Returns `None` for degenerate candidates, which are dropped.
pub(crate) fn locate(
    config: &ColorDetectionConfig,
    center: Point2,
    radius: f64,
    frame_width: u32,
) -> Option<Detection> {
    let estimate = geometry::distance(radius, config.known_ball_diameter_cm, config.focal_length_px)
        .and_then(|d| geometry::horizontal_offset(center.x, f64::from(frame_width)).map(|o| (d, o)));

    match estimate {
        Ok((distance_cm, offset_pct)) => Some(Detection::new(center, radius, distance_cm, offset_pct)),
        Err(e) => {
            log::debug!("dropping candidate at ({:.1}, {:.1}): {}", center.x, center.y, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_radius_candidate_is_dropped() {
        let config = ColorDetectionConfig::default();
        assert!(locate(&config, Point2::new(10.0, 10.0), 0.0, 640).is_none());
        assert!(locate(&config, Point2::new(10.0, 10.0), -3.0, 640).is_none());
    }

    #[test]
    fn test_positive_radius_is_located() {
        let config = ColorDetectionConfig::default();
        let detection = locate(&config, Point2::new(480.0, 240.0), 13.4, 640);
        let detection = detection.expect("candidate with a positive radius");

        assert!((detection.distance_cm - 6.7 * 800.0 / 26.8).abs() < 1e-9);
        assert!((detection.horizontal_offset_pct - 50.0).abs() < 1e-9);
    }
}
