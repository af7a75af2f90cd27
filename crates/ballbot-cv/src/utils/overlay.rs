//! Annotated copies of frames for debugging and evaluation artifacts

use crate::frame::Frame;
use crate::Result;
use ballbot_core::{Detection, Snapshot};
use opencv::{
    core::{Mat, Point, Scalar},
    imgproc::{self, FONT_HERSHEY_SIMPLEX, LINE_8},
};

/// Colors and sizes of the overlay, BGR
#[derive(Debug, Clone)]
pub struct OverlayStyle {
    pub circle_color: Scalar,
    pub center_color: Scalar,
    pub text_color: Scalar,
    pub thickness: i32,
    pub font_scale: f64,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            circle_color: Scalar::new(0.0, 255.0, 0.0, 0.0),
            center_color: Scalar::new(0.0, 0.0, 255.0, 0.0),
            text_color: Scalar::new(255.0, 255.0, 255.0, 0.0),
            thickness: 2,
            font_scale: 0.5,
        }
    }
}

/// Draw detections, and the robot state when given, on a copy of `frame`.
///
/// Each ball gets its enclosing circle, a center dot and a `Ball{n}: {d}cm`
/// label. The frame itself is left untouched.
pub fn draw_detections(
    frame: &Frame,
    detections: &[Detection],
    snapshot: Option<&Snapshot>,
    style: &OverlayStyle,
) -> Result<Mat> {
    let mut output = frame.to_mat()?;

    for (i, detection) in detections.iter().enumerate() {
        let center = Point::new(detection.center.x.round() as i32, detection.center.y.round() as i32);
        let radius = detection.radius.round() as i32;

        imgproc::circle(&mut output, center, radius, style.circle_color, style.thickness, LINE_8, 0)?;
        imgproc::circle(&mut output, center, 2, style.center_color, imgproc::FILLED, LINE_8, 0)?;

        let label = format!("Ball{}: {:.1}cm", i + 1, detection.distance_cm);
        imgproc::put_text(
            &mut output,
            &label,
            Point::new(center.x - radius, center.y - radius - 8),
            FONT_HERSHEY_SIMPLEX,
            style.font_scale,
            style.circle_color,
            style.thickness,
            LINE_8,
            false,
        )?;
    }

    if let Some(snapshot) = snapshot {
        let banner = [
            format!("State: {}", snapshot.state),
            format!("Balls collected: {}", snapshot.balls_collected),
        ];
        for (i, line) in banner.iter().enumerate() {
            imgproc::put_text(
                &mut output,
                line,
                Point::new(10, 24 + 24 * i as i32),
                FONT_HERSHEY_SIMPLEX,
                style.font_scale + 0.2,
                style.text_color,
                style.thickness,
                LINE_8,
                false,
            )?;
        }
    }

    Ok(output)
}
