//! Behavior state machine turning detections into abstract commands

pub mod machine;
pub mod state;

pub use machine::{BehaviorConfig, BehaviorStateMachine, Snapshot, Transition};
pub use state::{Command, RobotState};
