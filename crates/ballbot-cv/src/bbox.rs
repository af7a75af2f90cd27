//! Axis-aligned box predictions and non-maximum suppression
//!
//! Learned-model backends report balls as boxes with a confidence. Boxes are
//! in frame pixel coordinates with `(x, y)` the top-left corner.

use ballbot_core::Point2;
use serde::{Deserialize, Serialize};

/// One box reported by a learned model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxPrediction {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub confidence: f64,
}

impl BoxPrediction {
    pub fn new(x: f64, y: f64, width: f64, height: f64, confidence: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            confidence,
        }
    }

    /// Build from a center point and size, as most detection heads emit
    pub fn from_center(cx: f64, cy: f64, width: f64, height: f64, confidence: f64) -> Self {
        Self::new(cx - width / 2.0, cy - height / 2.0, width, height, confidence)
    }

    pub fn center(&self) -> Point2 {
        Point2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Intersection over union with another box
    pub fn iou(&self, other: &BoxPrediction) -> f64 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        if x2 <= x1 || y2 <= y1 {
            return 0.0;
        }

        let intersection = (x2 - x1) * (y2 - y1);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 { 0.0 } else { intersection / union }
    }
}

/// Greedy non-maximum suppression.
///
/// Keeps the most confident box of every cluster whose pairwise IoU exceeds
/// `iou_threshold`. The result is ordered by confidence, highest first.
pub fn suppress_overlaps(mut boxes: Vec<BoxPrediction>, iou_threshold: f64) -> Vec<BoxPrediction> {
    boxes.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<BoxPrediction> = Vec::with_capacity(boxes.len());
    for candidate in boxes {
        if keep.iter().all(|kept| kept.iou(&candidate) <= iou_threshold) {
            keep.push(candidate);
        }
    }
    keep
}
