//! Robot states and the abstract commands the state machine emits

use serde::{Deserialize, Serialize};
use std::fmt;

/// Behavior state of the robot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RobotState {
    #[default]
    Searching,
    Moving,
    Collecting,
    /// Reserved for a return-to-base behavior; never entered
    Returning,
}

impl fmt::Display for RobotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RobotState::Searching => "SEARCHING",
            RobotState::Moving => "MOVING",
            RobotState::Collecting => "COLLECTING",
            RobotState::Returning => "RETURNING",
        };
        f.write_str(name)
    }
}

/// Hardware-agnostic action handed to the actuator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Rotate in place for a short step while looking for balls
    Search { turn_secs: f64 },
    /// Steer toward the target and drive closer
    ApproachTarget { offset_pct: f64, distance_cm: f64 },
    /// Run the pick-up sequence where the robot stands
    CollectAtCurrentPosition,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Search { turn_secs } => write!(f, "search (turn {:.2}s)", turn_secs),
            Command::ApproachTarget {
                offset_pct,
                distance_cm,
            } => write!(f, "approach (offset {:.1}%, distance {:.1}cm)", offset_pct, distance_cm),
            Command::CollectAtCurrentPosition => f.write_str("collect"),
        }
    }
}
