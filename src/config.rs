//! Application configuration
//!
//! One JSON document with optional sections. Missing sections and fields
//! fall back to the defaults below. The loaded configuration is validated
//! before anything touches a camera or a pin.

use anyhow::{Context, Result};
use ballbot_core::actuation::{DriveConfig, MotorPins, ServoChannels};
use ballbot_core::config::{ensure_positive, ensure_within, ConfigError};
use ballbot_core::{BehaviorConfig, EvaluatorConfig};
use ballbot_cv::{ColorDetectionConfig, ModelDetectorConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which actuator the `run` command drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ActuatorKind {
    /// Log commands only
    #[default]
    Simulated,
    /// Linux sysfs GPIO and PWM
    Sysfs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotControlConfig {
    pub collect_distance_cm: f64,
    pub search_turn_secs: f64,
    pub move_speed_pct: f64,
    pub turn_speed_pct: f64,
    pub max_move_secs: f64,
}

impl Default for RobotControlConfig {
    fn default() -> Self {
        let behavior = BehaviorConfig::default();
        let drive = DriveConfig::default();
        Self {
            collect_distance_cm: behavior.collect_distance_cm,
            search_turn_secs: behavior.search_turn_secs,
            move_speed_pct: drive.move_speed_pct,
            turn_speed_pct: drive.turn_speed_pct,
            max_move_secs: drive.max_move_secs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareConfig {
    pub actuator: ActuatorKind,
    pub camera_index: i32,
    pub frame_width: u32,
    pub frame_height: u32,
    pub motor_pins: MotorPins,
    pub servo_channels: ServoChannels,
    pub pwm_chip: u32,
    pub pwm_frequency_hz: u32,
    pub gripper_open_deg: f64,
    pub gripper_closed_deg: f64,
    pub servo_settle_secs: f64,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        let drive = DriveConfig::default();
        Self {
            actuator: ActuatorKind::default(),
            camera_index: 0,
            frame_width: 640,
            frame_height: 480,
            motor_pins: drive.motor_pins,
            servo_channels: drive.servo_channels,
            pwm_chip: 0,
            pwm_frequency_hz: 50,
            gripper_open_deg: drive.gripper_open_deg,
            gripper_closed_deg: drive.gripper_closed_deg,
            servo_settle_secs: drive.servo_settle_secs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Default log filter, overridden by `RUST_LOG`
    pub log_level: String,
    /// Save an annotated copy of every frame during `run`
    pub save_annotated: bool,
    pub annotated_dir: String,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            save_annotated: false,
            annotated_dir: "annotated".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub image_processing: ColorDetectionConfig,
    /// Learned-model backend; the color detector runs when absent
    pub model: Option<ModelDetectorConfig>,
    pub robot_control: RobotControlConfig,
    pub evaluation: EvaluatorConfig,
    pub hardware: HardwareConfig,
    pub debug: DebugConfig,
}

impl AppConfig {
    /// Load and validate `path`, or validate the defaults when no file is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config
            .validate()
            .context("Invalid configuration")?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        serde_json::from_str(&raw).with_context(|| format!("Failed to parse config: {:?}", path))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.image_processing.validate()?;
        if let Some(model) = &self.model {
            model.validate()?;
        }
        self.behavior().validate()?;
        self.drive().validate()?;
        self.evaluation.validate()?;

        let hw = &self.hardware;
        ensure_within("hardware.frame_width", hw.frame_width, 1, 16384, "non-zero")?;
        ensure_within("hardware.frame_height", hw.frame_height, 1, 16384, "non-zero")?;
        ensure_within("hardware.pwm_frequency_hz", hw.pwm_frequency_hz, 1, 100_000, "within 1..=100000")?;
        ensure_within("hardware.camera_index", hw.camera_index, 0, i32::MAX, ">= 0")?;
        ensure_positive("robot_control.max_move_secs", self.robot_control.max_move_secs)
    }

    pub fn behavior(&self) -> BehaviorConfig {
        BehaviorConfig {
            collect_distance_cm: self.robot_control.collect_distance_cm,
            search_turn_secs: self.robot_control.search_turn_secs,
        }
    }

    pub fn drive(&self) -> DriveConfig {
        DriveConfig {
            move_speed_pct: self.robot_control.move_speed_pct,
            turn_speed_pct: self.robot_control.turn_speed_pct,
            max_move_secs: self.robot_control.max_move_secs,
            motor_pins: self.hardware.motor_pins.clone(),
            servo_channels: self.hardware.servo_channels.clone(),
            gripper_open_deg: self.hardware.gripper_open_deg,
            gripper_closed_deg: self.hardware.gripper_closed_deg,
            servo_settle_secs: self.hardware.servo_settle_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_constants() -> Result<()> {
        let config = AppConfig::load(None)?;
        assert_eq!(config.image_processing.lower_hsv, [20, 100, 100]);
        assert_eq!(config.image_processing.upper_hsv, [40, 255, 255]);
        assert_eq!(config.robot_control.collect_distance_cm, 30.0);
        assert_eq!(config.robot_control.move_speed_pct, 70.0);
        assert_eq!(config.evaluation.center_tolerance_px, 30.0);
        assert_eq!(config.hardware.actuator, ActuatorKind::Simulated);
        assert_eq!(config.hardware.motor_pins.left_forward, 18);
        Ok(())
    }

    #[test]
    fn test_partial_file_overrides() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "image_processing": {"min_ball_radius": 12, "blur_kernel": 5},
                "robot_control": {"collect_distance_cm": 25},
                "hardware": {"actuator": "sysfs", "motor_pins": {"left_forward": 5}},
                "debug": {"log_level": "debug"}
            }"#,
        )?;

        let config = AppConfig::load(Some(&path))?;
        assert_eq!(config.image_processing.min_ball_radius, 12.0);
        assert_eq!(config.image_processing.max_ball_radius, 100.0);
        assert_eq!(config.behavior().collect_distance_cm, 25.0);
        assert_eq!(config.hardware.actuator, ActuatorKind::Sysfs);
        assert_eq!(config.drive().motor_pins.left_forward, 5);
        assert_eq!(config.drive().motor_pins.right_backward, 25);
        assert_eq!(config.debug.log_level, "debug");
        Ok(())
    }

    #[test]
    fn test_rejects_invalid_values_at_load() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"image_processing": {"min_ball_radius": 0}}"#)?;

        let err = AppConfig::load(Some(&path)).unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
        assert!(format!("{:#}", err).contains("min_ball_radius"));
        Ok(())
    }

    #[test]
    fn test_rejects_zero_collect_distance() {
        let mut config = AppConfig::default();
        config.robot_control.collect_distance_cm = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_malformed_json() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json")?;
        assert!(AppConfig::load(Some(&path)).is_err());
        Ok(())
    }
}
