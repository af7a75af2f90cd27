//! Detection configuration

use ballbot_core::config::{ensure_ordered, ensure_positive, ensure_within, ConfigError};
use serde::{Deserialize, Serialize};

/// Color-threshold detector and camera geometry settings.
///
/// HSV bounds use the OpenCV 8-bit convention: H in 0..=180, S and V in 0..=255.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorDetectionConfig {
    pub lower_hsv: [u8; 3],
    pub upper_hsv: [u8; 3],
    pub min_ball_radius: f64,
    pub max_ball_radius: f64,
    pub focal_length_px: f64,
    pub known_ball_diameter_cm: f64,
    pub min_contour_area: f64,
    pub circularity_threshold: f64,
    /// Odd Gaussian kernel applied to the HSV image before thresholding
    pub blur_kernel: Option<u32>,
}

impl Default for ColorDetectionConfig {
    fn default() -> Self {
        Self {
            lower_hsv: [20, 100, 100],
            upper_hsv: [40, 255, 255],
            min_ball_radius: 10.0,
            max_ball_radius: 100.0,
            focal_length_px: 800.0,
            known_ball_diameter_cm: 6.7,
            min_contour_area: 50.0,
            circularity_threshold: 0.6,
            blur_kernel: None,
        }
    }
}

impl ColorDetectionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        const CHANNELS: [(&str, &str); 3] = [
            ("image_processing.lower_hsv[h]", "image_processing.upper_hsv[h]"),
            ("image_processing.lower_hsv[s]", "image_processing.upper_hsv[s]"),
            ("image_processing.lower_hsv[v]", "image_processing.upper_hsv[v]"),
        ];
        for (i, (lower_field, upper_field)) in CHANNELS.iter().enumerate() {
            ensure_ordered(lower_field, self.lower_hsv[i], upper_field, self.upper_hsv[i])?;
        }
        ensure_within("image_processing.upper_hsv[h]", self.upper_hsv[0], 0, 180, "<= 180")?;

        self.validate_geometry()?;
        ensure_within(
            "image_processing.min_contour_area",
            self.min_contour_area,
            0.0,
            f64::MAX,
            "a finite value >= 0",
        )?;
        // the area floor must not cut into the radius band
        ensure_ordered(
            "image_processing.min_contour_area",
            self.min_contour_area,
            "pi * image_processing.min_ball_radius^2",
            std::f64::consts::PI * self.min_ball_radius * self.min_ball_radius,
        )?;
        ensure_within(
            "image_processing.circularity_threshold",
            self.circularity_threshold,
            0.0,
            1.0,
            "within 0..=1",
        )?;

        if let Some(kernel) = self.blur_kernel {
            if kernel < 3 || kernel % 2 == 0 {
                return Err(ConfigError::OutOfRange {
                    field: "image_processing.blur_kernel",
                    requirement: "odd and >= 3",
                    value: kernel.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Checks shared by every backend: radius band and camera model
    pub fn validate_geometry(&self) -> Result<(), ConfigError> {
        ensure_positive("image_processing.min_ball_radius", self.min_ball_radius)?;
        ensure_positive("image_processing.max_ball_radius", self.max_ball_radius)?;
        ensure_ordered(
            "image_processing.min_ball_radius",
            self.min_ball_radius,
            "image_processing.max_ball_radius",
            self.max_ball_radius,
        )?;
        ensure_positive("image_processing.focal_length_px", self.focal_length_px)?;
        ensure_positive("image_processing.known_ball_diameter_cm", self.known_ball_diameter_cm)
    }

    pub fn radius_in_band(&self, radius: f64) -> bool {
        radius >= self.min_ball_radius && radius <= self.max_ball_radius
    }
}

/// Learned-model backend settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelDetectorConfig {
    /// Predictions below this confidence are ignored
    pub confidence_threshold: f64,
    /// IoU above which the weaker of two overlapping boxes is dropped
    pub nms_threshold: f64,
    /// ONNX model file for the DNN predictor
    pub model_path: Option<String>,
    /// Square network input size in pixels
    pub input_size: u32,
}

impl Default for ModelDetectorConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            nms_threshold: 0.4,
            model_path: None,
            input_size: 640,
        }
    }
}

impl ModelDetectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_within(
            "model.confidence_threshold",
            self.confidence_threshold,
            0.0,
            1.0,
            "within 0..=1",
        )?;
        ensure_within("model.nms_threshold", self.nms_threshold, 0.0, 1.0, "within 0..=1")?;
        ensure_within("model.input_size", self.input_size, 32, 4096, "within 32..=4096")
    }
}
