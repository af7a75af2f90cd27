//! Actuation capability
//!
//! The state machine hands abstract [`Command`]s to an [`Actuator`]. Which
//! implementation runs is chosen by configuration, never by probing for
//! hardware at runtime:
//!
//! - [`SimulatedActuator`]: logs and records commands, always succeeds
//! - [`DriveActuator`]: maps commands onto motor and servo pins of a [`PinBus`]

pub mod drive;
pub mod pins;
pub mod simulated;

pub use drive::{DriveActuator, DriveConfig, MotorPins, ServoChannels};
pub use pins::{LoggingPinBus, PinBus, PinEvent, PinLevel, SysfsPinBus};
pub use simulated::SimulatedActuator;

use crate::behavior::Command;
use thiserror::Error;

/// Reasons an actuator could not apply a command.
///
/// All of them are non-fatal to the control loop.
#[derive(Debug, Error)]
pub enum ActuationError {
    #[error("hardware fault: {0}")]
    Hardware(String),
    #[error("command rejected ({command}): {reason}")]
    Rejected { command: String, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Applies abstract commands to the robot
pub trait Actuator {
    /// Implementation identifier for logs
    fn name(&self) -> &'static str;

    /// Apply a command. Returns once it has been physically applied or a
    /// bounded timeout has elapsed.
    fn execute(&mut self, command: &Command) -> Result<(), ActuationError>;

    /// Bring every motor to rest
    fn stop(&mut self) -> Result<(), ActuationError>;
}

impl<A: Actuator + ?Sized> Actuator for Box<A> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn execute(&mut self, command: &Command) -> Result<(), ActuationError> {
        (**self).execute(command)
    }

    fn stop(&mut self) -> Result<(), ActuationError> {
        (**self).stop()
    }
}
