//! Configuration invariant checks shared by every config section

use std::fmt::Display;
use thiserror::Error;

/// A configuration value that violates an invariant
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be {requirement} (got {value})")]
    OutOfRange {
        field: &'static str,
        requirement: &'static str,
        value: String,
    },
    #[error("{lower_field} ({lower}) must not exceed {upper_field} ({upper})")]
    InvertedRange {
        lower_field: &'static str,
        upper_field: &'static str,
        lower: String,
        upper: String,
    },
}

/// Fail unless `value` is finite and strictly positive
pub fn ensure_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            requirement: "a finite value > 0",
            value: value.to_string(),
        })
    }
}

/// Fail unless `min <= value <= max`
pub fn ensure_within<T: PartialOrd + Display>(
    field: &'static str,
    value: T,
    min: T,
    max: T,
    requirement: &'static str,
) -> Result<(), ConfigError> {
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            requirement,
            value: value.to_string(),
        })
    }
}

/// Fail when `lower > upper`
pub fn ensure_ordered<T: PartialOrd + Display>(
    lower_field: &'static str,
    lower: T,
    upper_field: &'static str,
    upper: T,
) -> Result<(), ConfigError> {
    if lower <= upper {
        Ok(())
    } else {
        Err(ConfigError::InvertedRange {
            lower_field,
            upper_field,
            lower: lower.to_string(),
            upper: upper.to_string(),
        })
    }
}
