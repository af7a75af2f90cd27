//! No-hardware actuator for dry runs and tests

use super::{ActuationError, Actuator};
use crate::behavior::Command;

/// Logs every command and keeps a history. Always succeeds.
#[derive(Debug, Default)]
pub struct SimulatedActuator {
    history: Vec<Command>,
    stops: usize,
}

impl SimulatedActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands received so far, oldest first
    pub fn history(&self) -> &[Command] {
        &self.history
    }

    pub fn stop_count(&self) -> usize {
        self.stops
    }
}

impl Actuator for SimulatedActuator {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn execute(&mut self, command: &Command) -> Result<(), ActuationError> {
        log::info!("[simulated] {}", command);
        self.history.push(command.clone());
        Ok(())
    }

    fn stop(&mut self) -> Result<(), ActuationError> {
        log::info!("[simulated] stop all motors");
        self.stops += 1;
        Ok(())
    }
}
