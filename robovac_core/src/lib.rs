use serde::{Deserialize, Serialize};

pub mod floor;
pub mod layout;
pub mod robot;
pub mod search;
pub mod simulation;

pub use floor::{Cell, CellKind, Floor, LayoutError};
pub use layout::Layout;
pub use robot::{Robot, RobotState};
pub use simulation::{Simulation, Snapshot, StallReason, StepResult};

/// Battery level a robot starts each coverage cycle with.
pub const INITIAL_ENERGY: f64 = 100.0;

/// Energy consumed per cell-to-cell move.
pub const ENERGY_PER_STEP: f64 = 0.5;

/// Safety margin applied to the return-to-base energy estimate.
pub const RETURN_ENERGY_MARGIN: f64 = 1.2;

/// Frontier search stops expanding past this BFS depth. A safety valve
/// against unbounded traversal, not a correctness guarantee.
pub const FRONTIER_DEPTH_LIMIT: usize = 20;

/// Represents a 2D coordinate on the floor grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub fn new(x: usize, y: usize) -> Self {
        Position { x, y }
    }

    /// Returns the manhattan distance to another position.
    ///
    /// Used both as the A* heuristic and as the return-energy estimator.
    pub fn manhattan_distance(&self, other: &Position) -> usize {
        let dx = if self.x > other.x {
            self.x - other.x
        } else {
            other.x - self.x
        };
        let dy = if self.y > other.y {
            self.y - other.y
        } else {
            other.y - self.y
        };
        dx + dy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manhattan_distance_is_symmetric() {
        let a = Position::new(1, 7);
        let b = Position::new(4, 2);
        assert_eq!(a.manhattan_distance(&b), 8);
        assert_eq!(b.manhattan_distance(&a), 8);
        assert_eq!(a.manhattan_distance(&a), 0);
    }
}
