//! Detection and annotation records shared by perception, evaluation and behavior

use serde::{Deserialize, Serialize};

/// Pixel coordinate
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &Point2) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// A ball candidate emitted by a detector for one frame.
///
/// Detections have no identity across frames. Every emitted detection has a
/// radius inside the detector's configured radius band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub center: Point2,
    pub radius: f64,
    pub distance_cm: f64,
    pub horizontal_offset_pct: f64,
}

impl Detection {
    pub fn new(center: Point2, radius: f64, distance_cm: f64, horizontal_offset_pct: f64) -> Self {
        Self {
            center,
            radius,
            distance_cm,
            horizontal_offset_pct,
        }
    }
}

/// Annotated ball position for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundTruthObject {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

impl GroundTruthObject {
    pub fn new(x: f64, y: f64, radius: f64) -> Self {
        Self { x, y, radius }
    }

    pub fn center(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }
}

/// The nearest ball, i.e. the one with the largest radius.
///
/// Ties keep the earliest detection in emission order.
pub fn nearest(detections: &[Detection]) -> Option<&Detection> {
    detections.iter().fold(None, |best: Option<&Detection>, d| match best {
        Some(b) if b.radius >= d.radius => Some(b),
        _ => Some(d),
    })
}

/// Detections sorted by radius descending (nearest first). Stable for ties.
pub fn largest_first(detections: &[Detection]) -> Vec<Detection> {
    let mut sorted = detections.to_vec();
    sorted.sort_by(|a, b| b.radius.total_cmp(&a.radius));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x: f64, radius: f64) -> Detection {
        Detection::new(Point2::new(x, 0.0), radius, 0.0, 0.0)
    }

    #[test]
    fn test_nearest_prefers_largest_radius() {
        let dets = vec![det(1.0, 12.0), det(2.0, 40.0), det(3.0, 25.0)];
        assert_eq!(nearest(&dets).unwrap().center.x, 2.0);
        assert!(nearest(&[]).is_none());
    }

    #[test]
    fn test_nearest_tie_keeps_first() {
        let dets = vec![det(1.0, 30.0), det(2.0, 30.0)];
        assert_eq!(nearest(&dets).unwrap().center.x, 1.0);
    }

    #[test]
    fn test_largest_first_is_stable() {
        let dets = vec![det(1.0, 10.0), det(2.0, 30.0), det(3.0, 10.0)];
        let xs: Vec<f64> = largest_first(&dets).iter().map(|d| d.center.x).collect();
        assert_eq!(xs, vec![2.0, 1.0, 3.0]);
    }

    #[test]
    fn test_point_distance() {
        assert_eq!(Point2::new(0.0, 0.0).distance_to(&Point2::new(3.0, 4.0)), 5.0);
    }
}
