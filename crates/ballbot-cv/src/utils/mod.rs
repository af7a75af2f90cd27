//! Utility modules

pub mod image;
pub mod overlay;

pub use image::ImageUtils;
pub use overlay::{draw_detections, OverlayStyle};
