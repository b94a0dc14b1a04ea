use serde::{Deserialize, Serialize};

use crate::{ENERGY_PER_STEP, INITIAL_ENERGY, Position, RETURN_ENERGY_MARGIN};

/// The driver's state machine.
///
/// `Idle -> Exploring -> ReturningToBase -> Idle` repeats across coverage
/// cycles; `Stalled` is terminal for the cycle and reachable from either
/// active state when the robot runs out of energy or paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RobotState {
    Idle,
    Exploring,
    ReturningToBase,
    Stalled,
}

/// The cleaning unit: position and battery bookkeeping.
///
/// Created docked at the base with a full battery at the start of each
/// coverage cycle. Energy is monotonically non-increasing outside of
/// [`Robot::recharge`] and never drops below zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Robot {
    pub position: Position,
    /// Where the robot stood before its latest move, for renderers that
    /// animate the hop.
    pub last_position: Position,
    pub energy: f64,
    pub energy_per_step: f64,
}

impl Robot {
    /// Creates a robot docked at `base` with a full battery.
    pub fn new(base: Position) -> Self {
        Robot {
            position: base,
            last_position: base,
            energy: INITIAL_ENERGY,
            energy_per_step: ENERGY_PER_STEP,
        }
    }

    /// Moves the robot one cell, paying the per-step energy cost.
    pub fn move_to(&mut self, destination: Position) {
        self.last_position = self.position;
        self.position = destination;
        self.energy = (self.energy - self.energy_per_step).max(0.0);
    }

    /// Estimated energy needed to get back to the base from here.
    ///
    /// Manhattan distance times per-step cost, padded by the fixed 1.2
    /// safety margin to absorb detours around obstacles.
    pub fn required_return_energy(&self, base: Position) -> f64 {
        self.position.manhattan_distance(&base) as f64 * self.energy_per_step * RETURN_ENERGY_MARGIN
    }

    /// True when the battery has run down to nothing.
    pub fn is_exhausted(&self) -> bool {
        self.energy <= 0.0
    }

    /// Refills the battery. Only meaningful while docked at the base.
    pub fn recharge(&mut self) {
        self.energy = INITIAL_ENERGY;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moving_drains_energy_and_tracks_last_position() {
        let base = Position::new(0, 0);
        let mut robot = Robot::new(base);
        assert_eq!(robot.energy, INITIAL_ENERGY);
        assert_eq!(robot.last_position, base);

        robot.move_to(Position::new(1, 0));
        robot.move_to(Position::new(1, 1));
        assert_eq!(robot.position, Position::new(1, 1));
        assert_eq!(robot.last_position, Position::new(1, 0));
        assert!((robot.energy - (INITIAL_ENERGY - 2.0 * ENERGY_PER_STEP)).abs() < 1e-9);
    }

    #[test]
    fn energy_is_clamped_at_zero() {
        let mut robot = Robot::new(Position::new(0, 0));
        robot.energy = 0.3;
        robot.move_to(Position::new(1, 0));
        assert_eq!(robot.energy, 0.0);
        assert!(robot.is_exhausted());
    }

    #[test]
    fn return_estimate_uses_manhattan_distance_with_margin() {
        let base = Position::new(0, 0);
        let mut robot = Robot::new(base);
        robot.position = Position::new(3, 4);
        let expected = 7.0 * ENERGY_PER_STEP * RETURN_ENERGY_MARGIN;
        assert!((robot.required_return_energy(base) - expected).abs() < 1e-9);
    }

    #[test]
    fn recharge_restores_full_battery() {
        let mut robot = Robot::new(Position::new(0, 0));
        robot.energy = 12.5;
        robot.recharge();
        assert_eq!(robot.energy, INITIAL_ENERGY);
    }
}
