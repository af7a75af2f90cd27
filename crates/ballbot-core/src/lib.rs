//! Ballbot Core Library
//!
//! Hardware- and OpenCV-free logic of the ball collecting robot: pixel
//! geometry, detection and ground-truth types, detection scoring, the
//! behavior state machine and the actuation capability.

pub mod actuation;
pub mod behavior;
pub mod config;
pub mod evaluation;
pub mod geometry;
pub mod types;

// Re-export commonly used types
pub use actuation::{ActuationError, Actuator, DriveActuator, DriveConfig, SimulatedActuator};
pub use behavior::{BehaviorConfig, BehaviorStateMachine, Command, RobotState, Snapshot, Transition};
pub use config::ConfigError;
pub use evaluation::{DetectionEvaluator, EvaluationReport, EvaluatorConfig, MatchResult};
pub use geometry::GeometryError;
pub use types::{Detection, GroundTruthObject, Point2};

// Error handling
pub type Result<T> = anyhow::Result<T>;
