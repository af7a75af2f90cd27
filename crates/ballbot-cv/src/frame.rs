//! Validated camera frames

use crate::utils::ImageUtils;
use crate::{Result, VisionError};
use opencv::{
    core::{Mat, CV_8UC3},
    prelude::*,
};
use std::path::Path;

/// An immutable 8-bit 3-channel BGR image.
///
/// Only the validating constructors create a `Frame`, so every consumer can
/// rely on the pixel layout. Detectors read it through [`Frame::mat`] and
/// never mutate it.
#[derive(Debug)]
pub struct Frame {
    mat: Mat,
}

impl Frame {
    /// Wrap a BGR Mat. Fails with [`VisionError::InvalidFrame`] when the Mat
    /// is empty or not 8-bit 3-channel.
    pub fn from_mat(mat: Mat) -> Result<Self> {
        if mat.empty() {
            return Err(VisionError::InvalidFrame("empty image".to_string()).into());
        }
        if mat.typ() != CV_8UC3 {
            return Err(VisionError::InvalidFrame(format!(
                "expected 8-bit 3-channel BGR, got Mat type {} with {} channel(s)",
                mat.typ(),
                mat.channels()
            ))
            .into());
        }

        Ok(Self { mat })
    }

    /// Build a frame from tightly packed BGR bytes
    pub fn from_bgr_bytes(width: u32, height: u32, bgr: &[u8]) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(VisionError::InvalidFrame(format!("{}x{} frame", width, height)).into());
        }
        let mat = ImageUtils::bgr_bytes_to_mat(width, height, bgr)
            .map_err(|e| VisionError::InvalidFrame(format!("{:#}", e)))?;
        Self::from_mat(mat)
    }

    pub fn from_rgb_image(rgb_image: &image::RgbImage) -> Result<Self> {
        if rgb_image.width() == 0 || rgb_image.height() == 0 {
            return Err(VisionError::InvalidFrame("empty image".to_string()).into());
        }
        Self::from_mat(ImageUtils::rgb_to_mat(rgb_image)?)
    }

    /// Decode an image file. An unreadable or undecodable file is an
    /// [`VisionError::InvalidFrame`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mat = ImageUtils::load_color(&path)
            .map_err(|e| VisionError::InvalidFrame(format!("{:#}", e)))?;
        Self::from_mat(mat)
    }

    pub fn mat(&self) -> &Mat {
        &self.mat
    }

    pub fn width(&self) -> u32 {
        self.mat.cols() as u32
    }

    pub fn height(&self) -> u32 {
        self.mat.rows() as u32
    }

    /// Deep copy of the pixels for drawing
    pub fn to_mat(&self) -> Result<Mat> {
        Ok(self.mat.try_clone()?)
    }

    pub fn to_rgb_image(&self) -> Result<image::RgbImage> {
        ImageUtils::mat_to_rgb(&self.mat)
    }
}
