//! Learned-model ball detector
//!
//! A [`BoxPredictor`] runs the model and reports boxes. [`ModelDetector`]
//! turns those boxes into detections: confidence filter, overlap
//! suppression, `radius = box width / 2`, then the same radius band and
//! geometry the color backend uses.

use super::config::{ColorDetectionConfig, ModelDetectorConfig};
use super::{locate, BallDetector};
use crate::bbox::{suppress_overlaps, BoxPrediction};
use crate::frame::Frame;
use crate::Result;
use ballbot_core::Detection;

/// Runs a model on a frame and reports ball boxes in frame pixels
pub trait BoxPredictor: Send + Sync {
    fn name(&self) -> &'static str;

    fn predict(&self, frame: &Frame) -> Result<Vec<BoxPrediction>>;
}

pub struct ModelDetector<P: BoxPredictor> {
    predictor: P,
    config: ModelDetectorConfig,
    geometry: ColorDetectionConfig,
}

impl<P: BoxPredictor> ModelDetector<P> {
    /// `geometry` supplies the radius band and camera model
    pub fn new(predictor: P, config: ModelDetectorConfig, geometry: ColorDetectionConfig) -> Self {
        Self {
            predictor,
            config,
            geometry,
        }
    }
}

impl<P: BoxPredictor> BallDetector for ModelDetector<P> {
    fn name(&self) -> &'static str {
        self.predictor.name()
    }

    fn detect(&self, frame: &Frame) -> Result<Vec<Detection>> {
        let boxes: Vec<BoxPrediction> = self
            .predictor
            .predict(frame)?
            .into_iter()
            .filter(|b| b.confidence >= self.config.confidence_threshold)
            .collect();

        let detections = suppress_overlaps(boxes, self.config.nms_threshold)
            .into_iter()
            .filter_map(|b| {
                let radius = b.width / 2.0;
                if !self.geometry.radius_in_band(radius) {
                    return None;
                }
                locate(&self.geometry, b.center(), radius, frame.width())
            })
            .collect();

        Ok(detections)
    }
}

#[cfg(feature = "dnn")]
pub use dnn_backend::DnnPredictor;

#[cfg(feature = "dnn")]
mod dnn_backend {
    use super::{BoxPrediction, BoxPredictor};
    use crate::frame::Frame;
    use crate::Result;
    use anyhow::{anyhow, Context};
    use opencv::{
        core::{Scalar, Size, CV_32F},
        dnn::{self, Net},
        prelude::*,
    };
    use std::path::Path;
    use std::sync::Mutex;

    /// Attributes per candidate in a single-class head: cx, cy, w, h, score
    const ATTRIBUTES: usize = 5;

    /// Single-class YOLO-style ONNX model run through OpenCV DNN.
    ///
    /// Expects an output of shape `[1, 5, N]` with box attributes in rows and
    /// coordinates in network input pixels.
    pub struct DnnPredictor {
        net: Mutex<Net>,
        input_size: i32,
    }

    impl DnnPredictor {
        pub fn from_onnx<P: AsRef<Path>>(path: P, input_size: u32) -> Result<Self> {
            let path_str = path.as_ref().to_string_lossy();
            let net = dnn::read_net_from_onnx(&path_str)
                .with_context(|| format!("Failed to load ONNX model: {}", path_str))?;
            log::info!("loaded model {} ({}px input)", path_str, input_size);

            Ok(Self {
                net: Mutex::new(net),
                input_size: input_size as i32,
            })
        }
    }

    impl BoxPredictor for DnnPredictor {
        fn name(&self) -> &'static str {
            "dnn"
        }

        fn predict(&self, frame: &Frame) -> Result<Vec<BoxPrediction>> {
            let size = Size::new(self.input_size, self.input_size);
            let blob = dnn::blob_from_image(frame.mat(), 1.0 / 255.0, size, Scalar::default(), true, false, CV_32F)
                .context("Failed to build network input")?;

            let output = {
                let mut net = self.net.lock().map_err(|_| anyhow!("DNN session poisoned"))?;
                net.set_input(&blob, "", 1.0, Scalar::default())?;
                net.forward_single("").context("Model inference failed")?
            };

            let data = output.data_typed::<f32>()?;
            if data.len() % ATTRIBUTES != 0 {
                anyhow::bail!("Unexpected model output length {}", data.len());
            }
            let candidates = data.len() / ATTRIBUTES;
            let sx = f64::from(frame.width()) / f64::from(self.input_size);
            let sy = f64::from(frame.height()) / f64::from(self.input_size);

            let row = |attr: usize, i: usize| f64::from(data[attr * candidates + i]);
            Ok((0..candidates)
                .map(|i| {
                    BoxPrediction::from_center(
                        row(0, i) * sx,
                        row(1, i) * sy,
                        row(2, i) * sx,
                        row(3, i) * sy,
                        row(4, i),
                    )
                })
                .collect())
        }
    }
}
