//! Differential drive and pick-up arm on top of a [`PinBus`]
//!
//! Two DC motors sit behind an H-bridge with one forward and one backward
//! input per side. Motor speed is only applied when the bridge's enable
//! inputs are wired to PWM channels; otherwise the motors run at full speed
//! for the computed duration. The arm has four hobby servos driven at 50 Hz.

use super::pins::{PinBus, PinLevel};
use super::{ActuationError, Actuator};
use crate::behavior::Command;
use crate::config::{ensure_positive, ensure_within, ConfigError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// H-bridge inputs, as sysfs GPIO line numbers (not header pin numbers).
///
/// The defaults are the Raspberry Pi lines behind header pins 12, 16, 18
/// and 22. Other boards number their lines differently and must override
/// them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorPins {
    pub left_forward: u32,
    pub left_backward: u32,
    pub right_forward: u32,
    pub right_backward: u32,
    /// PWM channel on the left enable input
    pub left_enable: Option<u32>,
    /// PWM channel on the right enable input
    pub right_enable: Option<u32>,
}

impl Default for MotorPins {
    fn default() -> Self {
        Self {
            left_forward: 18,
            left_backward: 23,
            right_forward: 24,
            right_backward: 25,
            left_enable: None,
            right_enable: None,
        }
    }
}

impl MotorPins {
    fn direction_pins(&self) -> [u32; 4] {
        [
            self.left_forward,
            self.left_backward,
            self.right_forward,
            self.right_backward,
        ]
    }
}

/// PWM channels of the arm servos
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServoChannels {
    pub arm_base: u32,
    pub arm_shoulder: u32,
    pub arm_elbow: u32,
    pub gripper: u32,
}

impl Default for ServoChannels {
    fn default() -> Self {
        Self {
            arm_base: 0,
            arm_shoulder: 1,
            arm_elbow: 2,
            gripper: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Base speed while approaching, percent
    pub move_speed_pct: f64,
    /// Speed while turning in place, percent
    pub turn_speed_pct: f64,
    /// Upper bound on a single approach move
    pub max_move_secs: f64,
    pub motor_pins: MotorPins,
    pub servo_channels: ServoChannels,
    pub gripper_open_deg: f64,
    pub gripper_closed_deg: f64,
    /// Wait after each servo write so the horn reaches its position
    pub servo_settle_secs: f64,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            move_speed_pct: 70.0,
            turn_speed_pct: 50.0,
            max_move_secs: 2.0,
            motor_pins: MotorPins::default(),
            servo_channels: ServoChannels::default(),
            gripper_open_deg: 90.0,
            gripper_closed_deg: 30.0,
            servo_settle_secs: 0.1,
        }
    }
}

impl DriveConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_within(
            "robot_control.move_speed_pct",
            self.move_speed_pct,
            0.0,
            100.0,
            "within 0..=100",
        )?;
        ensure_within(
            "robot_control.turn_speed_pct",
            self.turn_speed_pct,
            0.0,
            100.0,
            "within 0..=100",
        )?;
        ensure_positive("robot_control.max_move_secs", self.max_move_secs)?;
        ensure_within(
            "hardware.gripper_open_deg",
            self.gripper_open_deg,
            0.0,
            180.0,
            "within 0..=180",
        )?;
        ensure_within(
            "hardware.gripper_closed_deg",
            self.gripper_closed_deg,
            0.0,
            180.0,
            "within 0..=180",
        )?;
        ensure_within(
            "hardware.servo_settle_secs",
            self.servo_settle_secs,
            0.0,
            5.0,
            "within 0..=5",
        )
    }
}

/// Servo duty cycle in percent for an angle in degrees (2.5% at 0°, 12.5% at 180°)
pub fn servo_duty(angle_deg: f64) -> f64 {
    2.5 + angle_deg.clamp(0.0, 180.0) / 180.0 * 10.0
}

/// Left/right wheel speeds for a horizontal target offset, clamped to 0..=100
pub fn differential_speeds(move_speed_pct: f64, offset_pct: f64) -> (f64, f64) {
    let steer = offset_pct / 5.0;
    (
        (move_speed_pct + steer).clamp(0.0, 100.0),
        (move_speed_pct - steer).clamp(0.0, 100.0),
    )
}

#[derive(Debug, Clone, Copy)]
enum Wheel {
    Forward,
    Backward,
}

const BASE_DEG: f64 = 90.0;
const ARM_STEPS: u32 = 10;
const GRIP_HOLD: Duration = Duration::from_millis(500);

/// Maps abstract commands onto motors and arm servos
#[derive(Debug)]
pub struct DriveActuator<B: PinBus> {
    config: DriveConfig,
    bus: B,
}

impl<B: PinBus> DriveActuator<B> {
    pub fn new(config: DriveConfig, bus: B) -> Self {
        Self { config, bus }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    fn drive(&mut self, left: Wheel, right: Wheel, speeds: (f64, f64), duration: Duration) -> Result<(), ActuationError> {
        let pins = self.config.motor_pins.clone();
        self.set_wheel(pins.left_forward, pins.left_backward, left)?;
        self.set_wheel(pins.right_forward, pins.right_backward, right)?;
        if let Some(channel) = pins.left_enable {
            self.bus.set_duty(channel, speeds.0)?;
        }
        if let Some(channel) = pins.right_enable {
            self.bus.set_duty(channel, speeds.1)?;
        }
        self.bus.hold(duration);
        self.halt()
    }

    fn set_wheel(&mut self, forward: u32, backward: u32, wheel: Wheel) -> Result<(), ActuationError> {
        let (f, b) = match wheel {
            Wheel::Forward => (PinLevel::High, PinLevel::Low),
            Wheel::Backward => (PinLevel::Low, PinLevel::High),
        };
        self.bus.set_level(forward, f)?;
        self.bus.set_level(backward, b)
    }

    fn halt(&mut self) -> Result<(), ActuationError> {
        let pins = self.config.motor_pins.clone();
        for pin in pins.direction_pins() {
            self.bus.set_level(pin, PinLevel::Low)?;
        }
        for channel in [pins.left_enable, pins.right_enable].into_iter().flatten() {
            self.bus.set_duty(channel, 0.0)?;
        }
        Ok(())
    }

    fn set_servo(&mut self, channel: u32, angle_deg: f64) -> Result<(), ActuationError> {
        self.bus.set_duty(channel, servo_duty(angle_deg))?;
        self.bus.hold(Duration::from_secs_f64(self.config.servo_settle_secs));
        Ok(())
    }

    fn set_arm(&mut self, shoulder_deg: f64, elbow_deg: f64) -> Result<(), ActuationError> {
        let servos = self.config.servo_channels.clone();
        self.set_servo(servos.arm_shoulder, shoulder_deg)?;
        self.set_servo(servos.arm_elbow, elbow_deg)
    }

    fn search(&mut self, turn_secs: f64) -> Result<(), ActuationError> {
        let speed = self.config.turn_speed_pct;
        // turn left: left wheel back, right wheel forward
        self.drive(
            Wheel::Backward,
            Wheel::Forward,
            (speed, speed),
            Duration::from_secs_f64(turn_secs.max(0.0)),
        )
    }

    fn approach(&mut self, offset_pct: f64, distance_cm: f64) -> Result<(), ActuationError> {
        if !offset_pct.is_finite() || !distance_cm.is_finite() || distance_cm < 0.0 {
            return Err(ActuationError::Rejected {
                command: "approach".to_string(),
                reason: format!("offset {} / distance {} not drivable", offset_pct, distance_cm),
            });
        }
        let speeds = differential_speeds(self.config.move_speed_pct, offset_pct);
        let secs = (distance_cm / 20.0).min(self.config.max_move_secs);
        log::debug!(
            "approach: left {:.1}% right {:.1}% for {:.2}s",
            speeds.0,
            speeds.1,
            secs
        );
        self.drive(Wheel::Forward, Wheel::Forward, speeds, Duration::from_secs_f64(secs))
    }

    fn collect(&mut self) -> Result<(), ActuationError> {
        let servos = self.config.servo_channels.clone();
        self.set_servo(servos.arm_base, BASE_DEG)?;
        self.set_servo(servos.gripper, self.config.gripper_open_deg)?;

        let mut shoulder = 90.0;
        let mut elbow = 0.0;
        for i in 0..ARM_STEPS {
            shoulder = 90.0 - f64::from(i) * 3.0;
            elbow = f64::from(i) * 6.0;
            self.set_arm(shoulder, elbow)?;
        }
        log::debug!("arm lowered to shoulder {} elbow {}", shoulder, elbow);

        self.set_servo(servos.gripper, self.config.gripper_closed_deg)?;
        self.bus.hold(GRIP_HOLD);

        for i in 0..ARM_STEPS {
            self.set_arm(60.0 + f64::from(i) * 3.0, 60.0 - f64::from(i) * 2.0)?;
        }

        self.set_servo(servos.gripper, self.config.gripper_open_deg)
    }
}

impl<B: PinBus> Actuator for DriveActuator<B> {
    fn name(&self) -> &'static str {
        "drive"
    }

    fn execute(&mut self, command: &Command) -> Result<(), ActuationError> {
        log::debug!("[drive] {}", command);
        let result = match *command {
            Command::Search { turn_secs } => self.search(turn_secs),
            Command::ApproachTarget {
                offset_pct,
                distance_cm,
            } => self.approach(offset_pct, distance_cm),
            Command::CollectAtCurrentPosition => self.collect(),
        };
        if result.is_err() {
            // leave the motors at rest whatever failed
            let _ = self.halt();
        }
        result
    }

    fn stop(&mut self) -> Result<(), ActuationError> {
        log::info!("[drive] stop all motors");
        self.halt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuation::pins::{LoggingPinBus, PinEvent};
    use approx::assert_relative_eq;

    fn actuator() -> DriveActuator<LoggingPinBus> {
        DriveActuator::new(DriveConfig::default(), LoggingPinBus::new())
    }

    fn levels(bus: &LoggingPinBus) -> Vec<(u32, PinLevel)> {
        bus.events()
            .iter()
            .filter_map(|e| match e {
                PinEvent::Level { pin, level } => Some((*pin, *level)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_servo_duty_range() {
        assert_relative_eq!(servo_duty(0.0), 2.5);
        assert_relative_eq!(servo_duty(90.0), 7.5);
        assert_relative_eq!(servo_duty(180.0), 12.5);
        assert_relative_eq!(servo_duty(270.0), 12.5);
    }

    #[test]
    fn test_differential_speeds() {
        assert_eq!(differential_speeds(70.0, 0.0), (70.0, 70.0));
        assert_eq!(differential_speeds(70.0, 50.0), (80.0, 60.0));
        assert_eq!(differential_speeds(70.0, -50.0), (60.0, 80.0));
        assert_eq!(differential_speeds(90.0, 100.0), (100.0, 70.0));
    }

    #[test]
    fn test_search_turns_left_then_stops() {
        let mut drive = actuator();
        drive.execute(&Command::Search { turn_secs: 0.3 }).unwrap();

        let lv = levels(drive.bus());
        assert_eq!(
            &lv[..4],
            &[
                (18, PinLevel::Low),
                (23, PinLevel::High),
                (24, PinLevel::High),
                (25, PinLevel::Low)
            ]
        );
        assert!(lv[4..].iter().all(|(_, level)| *level == PinLevel::Low));
        assert_relative_eq!(drive.bus().held().as_secs_f64(), 0.3, epsilon = 1e-6);
    }

    #[test]
    fn test_approach_duration_is_capped() {
        let mut drive = actuator();
        drive
            .execute(&Command::ApproachTarget {
                offset_pct: 0.0,
                distance_cm: 40.0,
            })
            .unwrap();
        assert_eq!(drive.bus().held(), Duration::from_secs(2));

        let mut drive = actuator();
        drive
            .execute(&Command::ApproachTarget {
                offset_pct: 0.0,
                distance_cm: 500.0,
            })
            .unwrap();
        assert_eq!(drive.bus().held(), Duration::from_secs(2));

        let mut drive = actuator();
        drive
            .execute(&Command::ApproachTarget {
                offset_pct: 0.0,
                distance_cm: 10.0,
            })
            .unwrap();
        assert_eq!(drive.bus().held(), Duration::from_millis(500));
    }

    #[test]
    fn test_approach_sets_enable_duty() {
        let config = DriveConfig {
            motor_pins: MotorPins {
                left_enable: Some(4),
                right_enable: Some(5),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut drive = DriveActuator::new(config, LoggingPinBus::new());
        drive
            .execute(&Command::ApproachTarget {
                offset_pct: 25.0,
                distance_cm: 20.0,
            })
            .unwrap();

        let events = drive.bus().events();
        assert!(events.contains(&PinEvent::Duty { channel: 4, duty_pct: 75.0 }));
        assert!(events.contains(&PinEvent::Duty { channel: 5, duty_pct: 65.0 }));
        assert_eq!(events.last(), Some(&PinEvent::Duty { channel: 5, duty_pct: 0.0 }));
    }

    #[test]
    fn test_approach_rejects_nan() {
        let mut drive = actuator();
        let result = drive.execute(&Command::ApproachTarget {
            offset_pct: f64::NAN,
            distance_cm: 10.0,
        });
        assert!(matches!(result, Err(ActuationError::Rejected { .. })));
    }

    #[test]
    fn test_collect_sequence_closes_then_opens_gripper() {
        let mut drive = actuator();
        drive.execute(&Command::CollectAtCurrentPosition).unwrap();

        let gripper: Vec<f64> = drive
            .bus()
            .events()
            .iter()
            .filter_map(|e| match e {
                PinEvent::Duty { channel: 3, duty_pct } => Some(*duty_pct),
                _ => None,
            })
            .collect();
        assert_eq!(gripper.len(), 3);
        assert_relative_eq!(gripper[0], servo_duty(90.0));
        assert_relative_eq!(gripper[1], servo_duty(30.0));
        assert_relative_eq!(gripper[2], servo_duty(90.0));

        let shoulder_writes = drive
            .bus()
            .events()
            .iter()
            .filter(|e| matches!(e, PinEvent::Duty { channel: 1, .. }))
            .count();
        assert_eq!(shoulder_writes, 20);
    }

    #[test]
    fn test_stop_drives_motor_pins_low() {
        let mut drive = actuator();
        drive.stop().unwrap();
        assert_eq!(
            levels(drive.bus()),
            vec![
                (18, PinLevel::Low),
                (23, PinLevel::Low),
                (24, PinLevel::Low),
                (25, PinLevel::Low)
            ]
        );
    }

    #[test]
    fn test_validate_rejects_speed_over_100() {
        let config = DriveConfig {
            move_speed_pct: 120.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(DriveConfig::default().validate().is_ok());
    }
}
