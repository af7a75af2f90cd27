//! HSV color-threshold ball detector

use super::config::ColorDetectionConfig;
use super::{locate, BallDetector};
use crate::frame::Frame;
use crate::Result;
use anyhow::Context;
use ballbot_core::{Detection, Point2};
use opencv::{
    core::{self, Mat, Point, Point2f, Scalar, Size, Vector},
    imgproc,
    prelude::*,
};
use std::f64::consts::PI;

const MORPH_KERNEL: i32 = 5;

/// Segments the ball color, cleans the mask and keeps round blobs whose
/// enclosing circle falls inside the configured radius band.
#[derive(Debug, Clone)]
pub struct ColorDetector {
    config: ColorDetectionConfig,
}

impl ColorDetector {
    /// Create new detector. The configuration must already be validated.
    pub fn new(config: ColorDetectionConfig) -> Self {
        Self { config }
    }

    /// Binary mask of ball-colored pixels after opening and closing
    pub fn mask(&self, frame: &Frame) -> Result<Mat> {
        let mut hsv = Mat::default();
        imgproc::cvt_color(frame.mat(), &mut hsv, imgproc::COLOR_BGR2HSV, 0)
            .context("Failed to convert frame to HSV")?;

        if let Some(k) = self.config.blur_kernel {
            let mut blurred = Mat::default();
            imgproc::gaussian_blur(
                &hsv,
                &mut blurred,
                Size::new(k as i32, k as i32),
                0.0,
                0.0,
                core::BORDER_DEFAULT,
            )?;
            hsv = blurred;
        }

        let [hl, sl, vl] = self.config.lower_hsv;
        let [hu, su, vu] = self.config.upper_hsv;
        let lower = Scalar::new(f64::from(hl), f64::from(sl), f64::from(vl), 0.0);
        let upper = Scalar::new(f64::from(hu), f64::from(su), f64::from(vu), 0.0);

        let mut raw = Mat::default();
        core::in_range(&hsv, &lower, &upper, &mut raw).context("Failed to threshold HSV image")?;

        let kernel = imgproc::get_structuring_element(
            imgproc::MORPH_RECT,
            Size::new(MORPH_KERNEL, MORPH_KERNEL),
            Point::new(-1, -1),
        )?;
        let border = imgproc::morphology_default_border_value()?;

        let mut opened = Mat::default();
        imgproc::morphology_ex(
            &raw,
            &mut opened,
            imgproc::MORPH_OPEN,
            &kernel,
            Point::new(-1, -1),
            1,
            core::BORDER_CONSTANT,
            border,
        )?;

        let mut closed = Mat::default();
        imgproc::morphology_ex(
            &opened,
            &mut closed,
            imgproc::MORPH_CLOSE,
            &kernel,
            Point::new(-1, -1),
            1,
            core::BORDER_CONSTANT,
            border,
        )?;

        Ok(closed)
    }

    /// Contour stage on an 8-bit single-channel mask.
    ///
    /// `frame_width` is the width of the frame the mask came from, used for
    /// the horizontal offset.
    pub fn detect_in_mask(&self, mask: &Mat, frame_width: u32) -> Result<Vec<Detection>> {
        let mut contours = Vector::<Vector<Point>>::new();
        imgproc::find_contours(
            mask,
            &mut contours,
            imgproc::RETR_EXTERNAL,
            imgproc::CHAIN_APPROX_SIMPLE,
            Point::new(0, 0),
        )
        .context("Failed to extract contours")?;

        let mut detections = Vec::new();
        for contour in contours.iter() {
            let area = imgproc::contour_area(&contour, false)?;
            if area < self.config.min_contour_area {
                continue;
            }

            let mut center = Point2f::default();
            let mut radius = 0f32;
            imgproc::min_enclosing_circle(&contour, &mut center, &mut radius)?;
            let radius = f64::from(radius);
            if !self.config.radius_in_band(radius) {
                continue;
            }

            let perimeter = imgproc::arc_length(&contour, true)?;
            if perimeter <= 0.0 {
                continue;
            }
            let circularity = 4.0 * PI * area / (perimeter * perimeter);
            if circularity < self.config.circularity_threshold {
                log::debug!(
                    "rejecting blob at ({:.0}, {:.0}): circularity {:.2}",
                    center.x,
                    center.y,
                    circularity
                );
                continue;
            }

            let center = Point2::new(f64::from(center.x), f64::from(center.y));
            if let Some(detection) = locate(&self.config, center, radius, frame_width) {
                detections.push(detection);
            }
        }

        Ok(detections)
    }
}

impl BallDetector for ColorDetector {
    fn name(&self) -> &'static str {
        "color"
    }

    fn detect(&self, frame: &Frame) -> Result<Vec<Detection>> {
        let mask = self.mask(frame)?;
        self.detect_in_mask(&mask, frame.width())
    }
}
