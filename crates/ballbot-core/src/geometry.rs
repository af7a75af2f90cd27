//! Pinhole-camera geometry for spherical targets
//!
//! Pure functions turning pixel measurements into metric estimates. Nothing
//! here holds state or touches images.

use thiserror::Error;

/// Failure kinds for geometric estimation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// Input would divide by zero or produce a non-finite estimate
    #[error("degenerate geometry: {what} = {value}")]
    DegenerateGeometry { what: &'static str, value: f64 },
}

/// Estimate the distance to a ball of known diameter from its apparent radius.
///
/// `cm = (known_diameter_cm * focal_length_px) / (2 * radius_px)`
///
/// Fails with [`GeometryError::DegenerateGeometry`] when `radius_px <= 0` or
/// any input is not finite.
pub fn distance(
    radius_px: f64,
    known_diameter_cm: f64,
    focal_length_px: f64,
) -> Result<f64, GeometryError> {
    if !radius_px.is_finite() || radius_px <= 0.0 {
        return Err(GeometryError::DegenerateGeometry {
            what: "radius_px",
            value: radius_px,
        });
    }
    if !known_diameter_cm.is_finite() || !focal_length_px.is_finite() {
        return Err(GeometryError::DegenerateGeometry {
            what: "camera parameters",
            value: known_diameter_cm * focal_length_px,
        });
    }

    Ok((known_diameter_cm * focal_length_px) / (2.0 * radius_px))
}

/// Horizontal offset of `x_px` from the frame center, as a percentage of the
/// half-width. -100 is the left edge, 100 the right edge.
///
/// The result is not clamped: a partially visible ball can have its center
/// outside the frame.
pub fn horizontal_offset(x_px: f64, frame_width_px: f64) -> Result<f64, GeometryError> {
    if !frame_width_px.is_finite() || frame_width_px <= 0.0 {
        return Err(GeometryError::DegenerateGeometry {
            what: "frame_width_px",
            value: frame_width_px,
        });
    }

    let half_width = frame_width_px / 2.0;
    Ok(((x_px - half_width) / half_width) * 100.0)
}
