use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::Position;

/// Represents errors that can occur while building a floor layout.
///
/// All of these are fatal at construction time; once a [`Floor`] exists its
/// shape is valid for the rest of the coverage cycle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("Floor dimensions ({width}, {height}) must both be non-zero")]
    EmptyFloor { width: usize, height: usize },
    #[error("Position ({x}, {y}) is out of bounds for floor size ({width}, {height})")]
    OutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },
    #[error("Base position ({x}, {y}) coincides with an obstacle")]
    BaseOnObstacle { x: usize, y: usize },
    #[error("Map has inconsistent row widths: row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        found: usize,
        expected: usize,
    },
    #[error("Unknown map glyph '{glyph}' at position ({x}, {y})")]
    UnknownGlyph { glyph: char, x: usize, y: usize },
    #[error("Map defines no base cell")]
    MissingBase,
    #[error("Map defines more than one base cell")]
    DuplicateBase,
}

/// The fixed kind of a floor cell, set at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellKind {
    Free,
    Obstacle,
    Base,
}

impl Default for CellKind {
    fn default() -> Self {
        CellKind::Free
    }
}

/// A single floor cell: its fixed kind plus the cleaning bookkeeping flag.
///
/// `visited` only ever transitions `false -> true` within a coverage cycle;
/// [`Floor::reset`] restores the initial configuration for the next cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub kind: CellKind,
    pub visited: bool,
}

/// The floor plan the robot cleans.
///
/// A fixed-size rectangular field of [`Cell`]s stored in a flat vector in
/// row-major order, indexed by (x, y) coordinates. Exactly one cell is the
/// charging base; its `visited` flag is set at construction and stays set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Floor {
    width: usize,
    height: usize,
    base: Position,
    cells: Vec<Cell>,
}

impl Floor {
    /// Builds a floor with the given dimensions, obstacle set and base.
    ///
    /// Fails with [`LayoutError`] if the dimensions are degenerate, the base
    /// or any obstacle lies outside the bounds, or the base coincides with
    /// an obstacle.
    pub fn new(
        width: usize,
        height: usize,
        obstacles: &[Position],
        base: Position,
    ) -> Result<Self, LayoutError> {
        if width == 0 || height == 0 {
            return Err(LayoutError::EmptyFloor { width, height });
        }
        let size = width.checked_mul(height).expect("Floor size overflow");
        let mut floor = Floor {
            width,
            height,
            base,
            cells: vec![Cell::default(); size],
        };

        for obstacle in obstacles {
            let index =
                floor
                    .coords_to_index(obstacle.x, obstacle.y)
                    .ok_or(LayoutError::OutOfBounds {
                        x: obstacle.x,
                        y: obstacle.y,
                        width,
                        height,
                    })?;
            floor.cells[index].kind = CellKind::Obstacle;
        }

        let base_index = floor
            .coords_to_index(base.x, base.y)
            .ok_or(LayoutError::OutOfBounds {
                x: base.x,
                y: base.y,
                width,
                height,
            })?;
        if floor.cells[base_index].kind == CellKind::Obstacle {
            return Err(LayoutError::BaseOnObstacle {
                x: base.x,
                y: base.y,
            });
        }
        // The base never needs cleaning; it counts as visited from the start.
        floor.cells[base_index] = Cell {
            kind: CellKind::Base,
            visited: true,
        };

        Ok(floor)
    }

    /// Returns the width of the floor.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the height of the floor.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the position of the charging base.
    #[inline]
    pub fn base(&self) -> Position {
        self.base
    }

    /// Converts (x, y) coordinates to a flat vector index.
    ///
    /// Returns `None` if the coordinates are out of bounds.
    #[inline]
    fn coords_to_index(&self, x: usize, y: usize) -> Option<usize> {
        if x < self.width && y < self.height {
            Some(y * self.width + x)
        } else {
            None
        }
    }

    /// Checks if the given coordinates are within the floor boundaries.
    #[inline]
    pub fn is_valid(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height
    }

    /// Gets the cell at the given position, or `None` if out of bounds.
    pub fn get(&self, pos: Position) -> Option<&Cell> {
        let index = self.coords_to_index(pos.x, pos.y)?;
        self.cells.get(index)
    }

    /// Returns the in-bounds orthogonal neighbors of a position.
    ///
    /// Fixed North, East, South, West order; search code relies on this for
    /// deterministic tie-breaking. Out-of-range neighbors are filtered out,
    /// never an error.
    pub fn neighbors(&self, pos: Position) -> Vec<Position> {
        const DIRECTIONS: [(isize, isize); 4] = [
            (0, -1), // North
            (1, 0),  // East
            (0, 1),  // South
            (-1, 0), // West
        ];

        let mut out = Vec::with_capacity(4);
        for (dx, dy) in DIRECTIONS {
            let Some(nx) = pos.x.checked_add_signed(dx) else {
                continue;
            };
            let Some(ny) = pos.y.checked_add_signed(dy) else {
                continue;
            };
            if self.is_valid(nx, ny) {
                out.push(Position { x: nx, y: ny });
            }
        }
        out
    }

    /// Marks the cell at `pos` as visited. Monotonic; repeat calls and
    /// out-of-bounds positions are no-ops.
    pub fn mark_visited(&mut self, pos: Position) {
        if let Some(index) = self.coords_to_index(pos.x, pos.y) {
            self.cells[index].visited = true;
        }
    }

    /// Returns true iff every Free cell has been visited.
    ///
    /// Obstacles cannot be cleaned and the base is pre-visited, so neither
    /// counts toward coverage.
    pub fn is_fully_covered(&self) -> bool {
        self.cells
            .iter()
            .all(|cell| cell.kind != CellKind::Free || cell.visited)
    }

    /// Number of Free cells cleaned so far (the base is excluded).
    pub fn visited_count(&self) -> usize {
        self.cells
            .iter()
            .filter(|cell| cell.kind == CellKind::Free && cell.visited)
            .count()
    }

    /// Number of cells that need cleaning in total.
    pub fn total_cleanable(&self) -> usize {
        self.cells
            .iter()
            .filter(|cell| cell.kind == CellKind::Free)
            .count()
    }

    /// Clears all visited flags back to the initial configuration, ready for
    /// a fresh coverage cycle. The base stays visited.
    pub fn reset(&mut self) {
        for cell in &mut self.cells {
            cell.visited = cell.kind == CellKind::Base;
        }
    }

    /// Returns an iterator that yields `(Position, &Cell)` for each cell in
    /// row-major order.
    pub fn enumerate(&self) -> impl Iterator<Item = (Position, &Cell)> {
        self.cells.iter().enumerate().map(move |(index, cell)| {
            let y = index / self.width;
            let x = index % self.width;
            (Position { x, y }, cell)
        })
    }
}

/// Allows indexing the floor using `(usize, usize)` coordinates.
impl Index<(usize, usize)> for Floor {
    type Output = Cell;

    #[inline]
    fn index(&self, index: (usize, usize)) -> &Self::Output {
        let (x, y) = index;
        match self.coords_to_index(x, y) {
            Some(idx) => &self.cells[idx],
            None => panic!(
                "Floor index ({}, {}) out of bounds for floor size ({}, {})",
                x, y, self.width, self.height
            ),
        }
    }
}

impl IndexMut<(usize, usize)> for Floor {
    #[inline]
    fn index_mut(&mut self, index: (usize, usize)) -> &mut Self::Output {
        let (x, y) = index;
        let width = self.width;
        let height = self.height;
        match self.coords_to_index(x, y) {
            Some(idx) => &mut self.cells[idx],
            None => panic!(
                "Floor index ({}, {}) out of bounds for floor size ({}, {})",
                x, y, width, height
            ),
        }
    }
}

/// Indexing using Position coordinates for access.
impl Index<Position> for Floor {
    type Output = Cell;

    #[inline]
    fn index(&self, index: Position) -> &Self::Output {
        &self[(index.x, index.y)]
    }
}

impl IndexMut<Position> for Floor {
    #[inline]
    fn index_mut(&mut self, index: Position) -> &mut Self::Output {
        &mut self[(index.x, index.y)]
    }
}
