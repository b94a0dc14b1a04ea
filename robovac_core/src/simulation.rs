use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::{
    Position,
    floor::{Floor, LayoutError},
    layout::Layout,
    robot::{Robot, RobotState},
    search,
};

/// Why a cycle ended in [`RobotState::Stalled`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StallReason {
    /// The battery ran out before the robot reached the base.
    EnergyExhausted,
    /// No route to the base exists from the robot's position.
    NoPath,
}

/// The outcome of one simulation tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StepResult {
    /// The robot hopped one cell.
    Moved {
        from: Position,
        to: Position,
        energy_remaining: f64,
    },
    /// Every reachable cell is clean; the robot is heading home.
    Covered,
    /// The robot docked at the charging base. The next tick starts a
    /// fresh coverage cycle.
    ArrivedAtBase,
    /// Terminal for this cycle: the robot can neither continue nor
    /// return. Repeated ticks keep reporting this.
    Stalled { reason: StallReason },
}

/// A read-only view of the simulation for renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub position: Position,
    pub energy: f64,
    pub visited_count: usize,
    pub total_cleanable: usize,
    pub state: RobotState,
    pub cycles_completed: usize,
}

/// Owns the floor and the robot and drives the coverage state machine.
///
/// Tick-driven and single-threaded: an external loop calls [`Simulation::step`]
/// once per tick, and each call is one bounded synchronous computation that
/// either fully applies one atomic step (position, energy and visited flag
/// together) or is a no-op. Stopping the loop is the only cancellation.
#[derive(Debug)]
pub struct Simulation {
    floor: Floor,
    robot: Robot,
    state: RobotState,
    /// Remaining cells of the current plan, walked one per tick.
    path: VecDeque<Position>,
    stall_reason: Option<StallReason>,
    cycles_completed: usize,
}

impl Simulation {
    /// Builds a simulation from a layout, with the robot docked at the base.
    pub fn new(layout: &Layout) -> Result<Self, LayoutError> {
        let floor = layout.build()?;
        let robot = Robot::new(floor.base());
        Ok(Simulation {
            floor,
            robot,
            state: RobotState::Idle,
            path: VecDeque::new(),
            stall_reason: None,
            cycles_completed: 0,
        })
    }

    /// Advances the simulation by one atomic step.
    pub fn step(&mut self) -> StepResult {
        match self.state {
            RobotState::Stalled => StepResult::Stalled {
                reason: self.stall_reason.unwrap_or(StallReason::NoPath),
            },
            RobotState::Idle => {
                // Begin a fresh coverage cycle: dirty floor, full battery.
                self.floor.reset();
                self.robot = Robot::new(self.floor.base());
                self.path.clear();
                self.state = RobotState::Exploring;
                self.explore_tick()
            }
            RobotState::Exploring => self.explore_tick(),
            RobotState::ReturningToBase => self.return_tick(),
        }
    }

    /// One tick of exploration: decide where to go, then take one step.
    fn explore_tick(&mut self) -> StepResult {
        let base = self.floor.base();

        // The battery check comes first: once the reserve needed to get
        // home is all that is left, exploration ends no matter what.
        if self.robot.energy <= self.robot.required_return_energy(base) {
            self.head_home();
            return self.return_tick();
        }

        if self.floor.is_fully_covered() {
            self.head_home();
            return StepResult::Covered;
        }

        if self.path.is_empty() {
            let Some(target) = search::find_frontier(&self.floor, self.robot.position) else {
                // Whatever is left is unreachable from here.
                self.head_home();
                return self.return_tick();
            };
            match search::find_path(&self.floor, self.robot.position, target) {
                Some(plan) => self.path = plan.into(),
                None => {
                    self.head_home();
                    return self.return_tick();
                }
            }
        }

        match self.path.pop_front() {
            Some(next) => self.advance(next),
            None => {
                // A planned path is never empty; treat it like no target.
                self.head_home();
                self.return_tick()
            }
        }
    }

    /// One tick of the return-to-base routine.
    fn return_tick(&mut self) -> StepResult {
        let base = self.floor.base();

        if self.robot.position == base {
            self.state = RobotState::Idle;
            self.path.clear();
            self.cycles_completed += 1;
            return StepResult::ArrivedAtBase;
        }

        if self.robot.is_exhausted() {
            return self.stall(StallReason::EnergyExhausted);
        }

        if self.path.is_empty() {
            match search::find_path(&self.floor, self.robot.position, base) {
                Some(plan) => self.path = plan.into(),
                None => return self.stall(StallReason::NoPath),
            }
        }

        match self.path.pop_front() {
            Some(next) => self.advance(next),
            None => self.stall(StallReason::NoPath),
        }
    }

    /// Executes one atomic move: position, energy and visited flag together.
    fn advance(&mut self, next: Position) -> StepResult {
        let from = self.robot.position;
        self.robot.move_to(next);
        self.floor.mark_visited(next);
        StepResult::Moved {
            from,
            to: next,
            energy_remaining: self.robot.energy,
        }
    }

    fn head_home(&mut self) {
        self.state = RobotState::ReturningToBase;
        self.path.clear();
    }

    fn stall(&mut self, reason: StallReason) -> StepResult {
        self.state = RobotState::Stalled;
        self.stall_reason = Some(reason);
        self.path.clear();
        StepResult::Stalled { reason }
    }

    /// A side-effect-free snapshot of the current state, for renderers.
    pub fn status(&self) -> Snapshot {
        Snapshot {
            position: self.robot.position,
            energy: self.robot.energy,
            visited_count: self.floor.visited_count(),
            total_cleanable: self.floor.total_cleanable(),
            state: self.state,
            cycles_completed: self.cycles_completed,
        }
    }

    pub fn floor(&self) -> &Floor {
        &self.floor
    }

    pub fn robot(&self) -> &Robot {
        &self.robot
    }

    pub fn state(&self) -> RobotState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ENERGY_PER_STEP, INITIAL_ENERGY, RETURN_ENERGY_MARGIN};

    fn open_layout(width: usize, height: usize) -> Layout {
        Layout {
            width,
            height,
            obstacles: Vec::new(),
            base: Position::new(0, 0),
        }
    }

    /// Steps until the predicate matches, with a tick budget so a broken
    /// state machine fails instead of spinning forever.
    fn step_until(
        sim: &mut Simulation,
        budget: usize,
        mut pred: impl FnMut(&StepResult) -> bool,
    ) -> StepResult {
        for _ in 0..budget {
            let result = sim.step();
            if pred(&result) {
                return result;
            }
        }
        panic!("tick budget exhausted; status: {:?}", sim.status());
    }

    #[test]
    fn energy_accounting_is_exact_over_moves() {
        let mut sim = Simulation::new(&open_layout(5, 5)).unwrap();
        let mut moves = 0;
        for _ in 0..10 {
            if let StepResult::Moved {
                energy_remaining, ..
            } = sim.step()
            {
                moves += 1;
                let expected = INITIAL_ENERGY - moves as f64 * ENERGY_PER_STEP;
                assert!((energy_remaining - expected).abs() < 1e-9);
            }
        }
        assert_eq!(moves, 10);
    }

    #[test]
    fn open_floor_gets_fully_covered_then_robot_docks() {
        let mut sim = Simulation::new(&open_layout(4, 4)).unwrap();

        let covered = step_until(&mut sim, 500, |r| matches!(r, StepResult::Covered));
        assert_eq!(covered, StepResult::Covered);
        let status = sim.status();
        // Every non-base cell visited, none double-counted.
        assert_eq!(status.visited_count, 15);
        assert_eq!(status.total_cleanable, 15);
        assert_eq!(status.state, RobotState::ReturningToBase);

        let arrived = step_until(&mut sim, 500, |r| matches!(r, StepResult::ArrivedAtBase));
        assert_eq!(arrived, StepResult::ArrivedAtBase);
        assert_eq!(sim.status().position, Position::new(0, 0));
        assert_eq!(sim.status().state, RobotState::Idle);
        assert_eq!(sim.status().cycles_completed, 1);
    }

    #[test]
    fn reference_floor_end_to_end() {
        let mut sim = Simulation::new(&Layout::reference()).unwrap();

        let mut saw_covered = false;
        let arrived = step_until(&mut sim, 5_000, |r| {
            if matches!(r, StepResult::Covered) {
                saw_covered = true;
            }
            matches!(r, StepResult::ArrivedAtBase | StepResult::Stalled { .. })
        });

        assert!(saw_covered, "coverage never completed");
        assert_eq!(arrived, StepResult::ArrivedAtBase);
        let status = sim.status();
        // 10x8 floor minus 9 obstacles minus the pre-visited base.
        assert_eq!(status.visited_count, 70);
        assert!(status.energy >= 0.0);
    }

    #[test]
    fn robot_never_enters_obstacles_or_crosses_the_base() {
        let mut sim = Simulation::new(&Layout::reference()).unwrap();
        let obstacles = Layout::reference().obstacles;
        let base = Position::new(0, 0);

        for _ in 0..5_000 {
            let result = sim.step();
            if let StepResult::Moved { to, .. } = result {
                assert!(!obstacles.contains(&to));
                if to == base {
                    // Only legal as the terminal node of a return path.
                    assert_eq!(sim.state(), RobotState::ReturningToBase);
                }
            }
            if matches!(result, StepResult::ArrivedAtBase) {
                break;
            }
        }
    }

    #[test]
    fn exploration_ends_exactly_at_the_return_threshold() {
        let mut sim = Simulation::new(&open_layout(8, 8)).unwrap();
        // Walk a few steps away from the base first.
        for _ in 0..6 {
            sim.step();
        }
        assert_eq!(sim.state(), RobotState::Exploring);
        let distance = sim.robot.position.manhattan_distance(&Position::new(0, 0));
        assert!(distance > 0);

        // Energy exactly at the threshold: the very next tick must leave
        // Exploring and head home.
        sim.robot.energy = distance as f64 * ENERGY_PER_STEP * RETURN_ENERGY_MARGIN;
        sim.step();
        assert_eq!(sim.state(), RobotState::ReturningToBase);
    }

    #[test]
    fn exploration_continues_just_above_the_return_threshold() {
        let mut sim = Simulation::new(&open_layout(8, 8)).unwrap();
        for _ in 0..6 {
            sim.step();
        }
        let distance = sim.robot.position.manhattan_distance(&Position::new(0, 0));
        let threshold = distance as f64 * ENERGY_PER_STEP * RETURN_ENERGY_MARGIN;

        // Strictly above the threshold: this tick keeps exploring.
        sim.robot.energy = threshold + 2.0 * ENERGY_PER_STEP;
        sim.step();
        assert_eq!(sim.state(), RobotState::Exploring);
    }

    #[test]
    fn exhausted_battery_away_from_base_stalls_terminally() {
        let mut sim = Simulation::new(&open_layout(8, 8)).unwrap();
        for _ in 0..6 {
            sim.step();
        }
        assert_ne!(sim.robot.position, Position::new(0, 0));

        // Not even one step's worth of energy left: the return attempt
        // drains the battery before reaching the base.
        sim.robot.energy = ENERGY_PER_STEP;
        let result = step_until(&mut sim, 50, |r| matches!(r, StepResult::Stalled { .. }));
        assert_eq!(
            result,
            StepResult::Stalled {
                reason: StallReason::EnergyExhausted
            }
        );
        assert_eq!(sim.state(), RobotState::Stalled);

        // Stalled is terminal: further ticks are no-ops reporting the same.
        let position = sim.robot.position;
        assert_eq!(sim.step(), result);
        assert_eq!(sim.robot.position, position);
    }

    #[test]
    fn unreachable_cells_do_not_prevent_a_clean_return() {
        // The two north-east corner cells are walled off; the robot cleans
        // the rest and heads home without stalling.
        let layout = Layout::parse(
            "B...#.\n\
             ....#.\n\
             ....##\n\
             ......",
        )
        .unwrap();
        assert_eq!(layout.obstacles.len(), 4);
        let mut sim = Simulation::new(&layout).unwrap();

        let result = step_until(&mut sim, 1_000, |r| {
            matches!(r, StepResult::ArrivedAtBase | StepResult::Stalled { .. })
        });
        assert_eq!(result, StepResult::ArrivedAtBase);
        let status = sim.status();
        // Everything except the two sealed-off cells got cleaned.
        assert_eq!(status.total_cleanable, 24 - 4 - 1);
        assert_eq!(status.visited_count, status.total_cleanable - 2);
    }

    #[test]
    fn docked_robot_starts_a_fresh_cycle_on_the_next_tick() {
        let mut sim = Simulation::new(&open_layout(3, 3)).unwrap();
        step_until(&mut sim, 200, |r| matches!(r, StepResult::ArrivedAtBase));

        // The next tick resets the floor and battery and resumes cleaning.
        let result = sim.step();
        assert!(matches!(result, StepResult::Moved { .. }));
        assert_eq!(sim.state(), RobotState::Exploring);
        let status = sim.status();
        assert_eq!(status.cycles_completed, 1);
        assert_eq!(status.visited_count, 1);
        assert!((status.energy - (INITIAL_ENERGY - ENERGY_PER_STEP)).abs() < 1e-9);
    }

    #[test]
    fn status_is_side_effect_free() {
        let sim = Simulation::new(&Layout::reference()).unwrap();
        let before = sim.status();
        let again = sim.status();
        assert_eq!(before, again);
        assert_eq!(before.state, RobotState::Idle);
        assert_eq!(before.position, Position::new(0, 0));
        assert_eq!(before.total_cleanable, 70);
        assert_eq!(before.visited_count, 0);
    }

    #[test]
    fn invalid_layouts_are_rejected_at_construction() {
        let bad_base = Layout {
            width: 4,
            height: 4,
            obstacles: vec![Position::new(2, 2)],
            base: Position::new(2, 2),
        };
        assert_eq!(
            Simulation::new(&bad_base).unwrap_err(),
            LayoutError::BaseOnObstacle { x: 2, y: 2 }
        );

        let out_of_bounds = Layout {
            width: 4,
            height: 4,
            obstacles: Vec::new(),
            base: Position::new(0, 4),
        };
        assert!(matches!(
            Simulation::new(&out_of_bounds).unwrap_err(),
            LayoutError::OutOfBounds { .. }
        ));
    }
}
