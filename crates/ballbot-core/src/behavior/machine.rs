//! Per-cycle behavior transitions

use super::state::{Command, RobotState};
use crate::actuation::ActuationError;
use crate::config::{ensure_positive, ConfigError};
use crate::types::{nearest, Detection};
use serde::{Deserialize, Serialize};

/// Behavior thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// A target at or closer than this is collected instead of approached
    pub collect_distance_cm: f64,
    /// Rotation step issued while searching
    pub search_turn_secs: f64,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            collect_distance_cm: 30.0,
            search_turn_secs: 0.3,
        }
    }
}

impl BehaviorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("robot_control.collect_distance_cm", self.collect_distance_cm)?;
        ensure_positive("robot_control.search_turn_secs", self.search_turn_secs)
    }
}

/// Outcome of one cycle
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from: RobotState,
    pub to: RobotState,
    pub command: Command,
}

/// Consistent read-only view of the machine for telemetry and overlays
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Snapshot {
    pub state: RobotState,
    pub balls_collected: u32,
    pub cycle: u64,
}

/// Searching -> Moving -> Collecting -> Searching, with Moving -> Searching
/// when the target is lost.
///
/// The machine owns the current state and the collected counter; both are
/// only changed by [`step`](Self::step) and [`acknowledge`](Self::acknowledge).
#[derive(Debug, Clone)]
pub struct BehaviorStateMachine {
    config: BehaviorConfig,
    state: RobotState,
    balls_collected: u32,
    cycle: u64,
    pending_collect: bool,
}

impl BehaviorStateMachine {
    pub fn new(config: BehaviorConfig) -> Self {
        Self {
            config,
            state: RobotState::Searching,
            balls_collected: 0,
            cycle: 0,
            pending_collect: false,
        }
    }

    pub fn state(&self) -> RobotState {
        self.state
    }

    pub fn balls_collected(&self) -> u32 {
        self.balls_collected
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state,
            balls_collected: self.balls_collected,
            cycle: self.cycle,
        }
    }

    /// Advance one cycle using the detections of the current frame
    pub fn step(&mut self, detections: &[Detection]) -> Transition {
        self.cycle += 1;
        let from = self.state;

        let (to, command) = if from == RobotState::Collecting {
            // Collecting finishes within the cycle it was entered in.
            self.complete_collect();
            (RobotState::Searching, self.search_command())
        } else if let Some(target) = nearest(detections) {
            if target.distance_cm > self.config.collect_distance_cm {
                (
                    RobotState::Moving,
                    Command::ApproachTarget {
                        offset_pct: target.horizontal_offset_pct,
                        distance_cm: target.distance_cm,
                    },
                )
            } else {
                self.pending_collect = true;
                (RobotState::Collecting, Command::CollectAtCurrentPosition)
            }
        } else {
            if from == RobotState::Moving {
                log::info!("target lost while approaching, searching again");
            }
            (RobotState::Searching, self.search_command())
        };

        if from != to {
            log::info!("state {} -> {} (cycle {})", from, to, self.cycle);
        }
        self.state = to;

        Transition { from, to, command }
    }

    /// Report the actuator's result for the command of the current cycle.
    ///
    /// A successful collect completes the Collecting cycle. A failed one is
    /// not counted; the next cycle re-evaluates from scratch.
    pub fn acknowledge(&mut self, outcome: &Result<(), ActuationError>) {
        if !self.pending_collect {
            return;
        }

        match outcome {
            Ok(()) => self.complete_collect(),
            Err(e) => {
                self.pending_collect = false;
                log::warn!("collect sequence failed, ball not counted: {}", e);
            }
        }
    }

    fn complete_collect(&mut self) {
        if self.pending_collect {
            self.pending_collect = false;
            self.balls_collected += 1;
            log::info!("collected ball #{}", self.balls_collected);
        }
    }

    fn search_command(&self) -> Command {
        Command::Search {
            turn_secs: self.config.search_turn_secs,
        }
    }
}

impl Default for BehaviorStateMachine {
    fn default() -> Self {
        Self::new(BehaviorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point2;

    fn ball(distance_cm: f64, radius: f64) -> Detection {
        Detection::new(Point2::new(320.0, 240.0), radius, distance_cm, 0.0)
    }

    #[test]
    fn test_starts_searching() {
        let machine = BehaviorStateMachine::default();
        assert_eq!(machine.state(), RobotState::Searching);
        assert_eq!(machine.balls_collected(), 0);
    }

    #[test]
    fn test_scenario_search_move_collect_search() {
        let mut machine = BehaviorStateMachine::default();
        let cycles: Vec<Vec<Detection>> = vec![
            vec![],
            vec![ball(50.0, 53.6)],
            vec![ball(20.0, 134.0)],
            vec![],
        ];

        let states: Vec<RobotState> = cycles.iter().map(|d| machine.step(d).to).collect();
        assert_eq!(
            states,
            vec![
                RobotState::Searching,
                RobotState::Moving,
                RobotState::Collecting,
                RobotState::Searching
            ]
        );
        assert_eq!(machine.balls_collected(), 1);
    }

    #[test]
    fn test_scenario_with_acknowledgements_counts_once() {
        let mut machine = BehaviorStateMachine::default();
        for detections in [vec![], vec![ball(50.0, 53.6)], vec![ball(20.0, 134.0)], vec![]] {
            machine.step(&detections);
            machine.acknowledge(&Ok(()));
        }
        assert_eq!(machine.balls_collected(), 1);
        assert_eq!(machine.state(), RobotState::Searching);
    }

    #[test]
    fn test_commands_per_state() {
        let mut machine = BehaviorStateMachine::default();

        assert_eq!(machine.step(&[]).command, Command::Search { turn_secs: 0.3 });

        let approach = machine.step(&[Detection::new(Point2::new(400.0, 200.0), 20.0, 134.0, 25.0)]);
        assert_eq!(
            approach.command,
            Command::ApproachTarget {
                offset_pct: 25.0,
                distance_cm: 134.0
            }
        );

        let collect = machine.step(&[ball(30.0, 89.3)]);
        assert_eq!(collect.to, RobotState::Collecting);
        assert_eq!(collect.command, Command::CollectAtCurrentPosition);
    }

    #[test]
    fn test_moving_to_searching_when_target_lost() {
        let mut machine = BehaviorStateMachine::default();
        machine.step(&[ball(80.0, 33.5)]);
        assert_eq!(machine.state(), RobotState::Moving);

        let lost = machine.step(&[]);
        assert_eq!((lost.from, lost.to), (RobotState::Moving, RobotState::Searching));
    }

    #[test]
    fn test_targets_largest_radius() {
        let mut machine = BehaviorStateMachine::default();
        // The far ball comes first in detection order.
        let transition = machine.step(&[ball(120.0, 22.3), ball(25.0, 107.2)]);
        assert_eq!(transition.to, RobotState::Collecting);
    }

    #[test]
    fn test_collecting_returns_to_searching_even_with_ball_in_view() {
        let mut machine = BehaviorStateMachine::default();
        machine.step(&[ball(10.0, 268.0)]);
        let next = machine.step(&[ball(10.0, 268.0)]);
        assert_eq!(next.to, RobotState::Searching);
        assert_eq!(machine.balls_collected(), 1);
    }

    #[test]
    fn test_failed_collect_not_counted() {
        let mut machine = BehaviorStateMachine::default();
        machine.step(&[ball(10.0, 268.0)]);
        machine.acknowledge(&Err(ActuationError::Hardware("gripper stalled".into())));
        machine.step(&[]);
        assert_eq!(machine.balls_collected(), 0);
    }

    #[test]
    fn test_never_enters_returning() {
        let mut machine = BehaviorStateMachine::default();
        let inputs = [vec![], vec![ball(90.0, 30.0)], vec![ball(5.0, 500.0)], vec![], vec![ball(31.0, 86.0)]];
        for detections in inputs.iter().cycle().take(40) {
            assert_ne!(machine.step(detections).to, RobotState::Returning);
        }
    }

    #[test]
    fn test_snapshot_tracks_cycles() {
        let mut machine = BehaviorStateMachine::default();
        machine.step(&[]);
        machine.step(&[ball(10.0, 268.0)]);
        let snap = machine.snapshot();
        assert_eq!(snap.cycle, 2);
        assert_eq!(snap.state, RobotState::Collecting);
        assert_eq!(snap.balls_collected, 0);
    }

    #[test]
    fn test_collect_distance_boundary_collects() {
        let mut machine = BehaviorStateMachine::new(BehaviorConfig {
            collect_distance_cm: 30.0,
            ..Default::default()
        });
        assert_eq!(machine.step(&[ball(30.0, 89.3)]).to, RobotState::Collecting);
    }
}
