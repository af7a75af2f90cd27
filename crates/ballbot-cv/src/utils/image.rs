//! Image conversions between the `image` crate and OpenCV

use crate::Result;
use anyhow::Context;
use opencv::{
    core::{Mat, Scalar, Vector, CV_8UC3},
    imgcodecs,
    prelude::*,
};
use std::path::Path;

/// Image utility functions
pub struct ImageUtils;

impl ImageUtils {
    /// Load an image file as a BGR Mat through the `image` crate decoders
    pub fn load_color<P: AsRef<Path>>(path: P) -> Result<Mat> {
        let img = image::open(&path)
            .with_context(|| format!("Failed to open image: {:?}", path.as_ref()))?
            .to_rgb8();

        Self::rgb_to_mat(&img).with_context(|| format!("Failed to convert image: {:?}", path.as_ref()))
    }

    /// Save Mat as image, format chosen by extension
    pub fn save_image<P: AsRef<Path>>(mat: &Mat, path: P) -> Result<()> {
        let path_str = path.as_ref().to_string_lossy();

        let written = imgcodecs::imwrite(&path_str, mat, &Vector::new())
            .with_context(|| format!("Failed to save image: {}", path_str))?;
        if !written {
            anyhow::bail!("No encoder accepted image: {}", path_str);
        }

        Ok(())
    }

    /// Pack tightly laid out BGR bytes into a Mat
    pub fn bgr_bytes_to_mat(width: u32, height: u32, bgr: &[u8]) -> Result<Mat> {
        let expected = width as usize * height as usize * 3;
        if bgr.len() != expected {
            anyhow::bail!(
                "BGR buffer holds {} bytes, {}x{} needs {}",
                bgr.len(),
                width,
                height,
                expected
            );
        }

        let mut mat =
            Mat::new_rows_cols_with_default(height as i32, width as i32, CV_8UC3, Scalar::all(0.0))?;
        mat.data_bytes_mut()?.copy_from_slice(bgr);
        Ok(mat)
    }

    /// Convert image::RgbImage to a BGR Mat
    pub fn rgb_to_mat(rgb_image: &image::RgbImage) -> Result<Mat> {
        let (width, height) = rgb_image.dimensions();
        let bgr: Vec<u8> = rgb_image
            .pixels()
            .flat_map(|p| [p[2], p[1], p[0]])
            .collect();
        Self::bgr_bytes_to_mat(width, height, &bgr)
    }

    /// Convert a BGR Mat to image::RgbImage
    pub fn mat_to_rgb(mat: &Mat) -> Result<image::RgbImage> {
        if mat.typ() != CV_8UC3 {
            anyhow::bail!("Expected an 8-bit 3-channel Mat, got type {}", mat.typ());
        }

        // a deep copy is always continuous
        let continuous = mat.try_clone()?;
        let rgb: Vec<u8> = continuous
            .data_bytes()?
            .chunks_exact(3)
            .flat_map(|p| [p[2], p[1], p[0]])
            .collect();

        image::RgbImage::from_raw(mat.cols() as u32, mat.rows() as u32, rgb)
            .context("Failed to convert OpenCV Mat to RGB image")
    }
}
