//! Assembles detectors and actuators from configuration

use crate::config::{ActuatorKind, AppConfig};
use anyhow::Result;
use ballbot_core::actuation::{Actuator, DriveActuator, SimulatedActuator, SysfsPinBus};
use ballbot_core::Detection;
use ballbot_cv::utils::{draw_detections, ImageUtils, OverlayStyle};
use ballbot_cv::{BallDetector, ColorDetector, Frame};
use serde::Serialize;
use std::path::Path;

/// Detector backend selected by configuration
pub fn build_detector(config: &AppConfig) -> Result<Box<dyn BallDetector>> {
    match &config.model {
        None => Ok(Box::new(ColorDetector::new(config.image_processing.clone()))),
        Some(model) => build_model_detector(config, model),
    }
}

#[cfg(feature = "dnn")]
fn build_model_detector(config: &AppConfig, model: &ballbot_cv::ModelDetectorConfig) -> Result<Box<dyn BallDetector>> {
    use anyhow::Context;
    use ballbot_cv::detection::DnnPredictor;

    let path = model
        .model_path
        .as_deref()
        .context("model.model_path is required for the learned detector")?;
    let predictor = DnnPredictor::from_onnx(path, model.input_size)?;
    Ok(Box::new(ballbot_cv::ModelDetector::new(
        predictor,
        model.clone(),
        config.image_processing.clone(),
    )))
}

#[cfg(not(feature = "dnn"))]
fn build_model_detector(_config: &AppConfig, _model: &ballbot_cv::ModelDetectorConfig) -> Result<Box<dyn BallDetector>> {
    anyhow::bail!("a model section is configured but ballbot was built without the `dnn` feature")
}

/// Actuator selected by configuration
pub fn build_actuator(config: &AppConfig, kind: ActuatorKind) -> Box<dyn Actuator> {
    match kind {
        ActuatorKind::Simulated => Box::new(SimulatedActuator::new()),
        ActuatorKind::Sysfs => {
            let bus = SysfsPinBus::new(config.hardware.pwm_chip, config.hardware.pwm_frequency_hz);
            Box::new(DriveActuator::new(config.drive(), bus))
        }
    }
}

/// Output of the `detect` command
#[derive(Debug, Serialize)]
pub struct ImageDetections {
    pub image: String,
    pub width: u32,
    pub height: u32,
    pub detector: &'static str,
    pub detections: Vec<Detection>,
}

/// Detect balls in one image file, optionally saving an annotated copy
pub fn detect_image(
    detector: &dyn BallDetector,
    image_path: &Path,
    annotate: Option<&Path>,
) -> Result<ImageDetections> {
    let frame = Frame::load(image_path)?;
    let detections = detector.detect(&frame)?;

    if let Some(output) = annotate {
        let annotated = draw_detections(&frame, &detections, None, &OverlayStyle::default())?;
        ImageUtils::save_image(&annotated, output)?;
        log::info!("annotated image saved: {:?}", output);
    }

    Ok(ImageDetections {
        image: image_path.to_string_lossy().to_string(),
        width: frame.width(),
        height: frame.height(),
        detector: detector.name(),
        detections,
    })
}
