use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::{
    Position,
    floor::{Floor, LayoutError},
};

/// Construction inputs for a [`Floor`]: dimensions, obstacle set and base.
///
/// A `Layout` can come from a parsed map string, a seeded random generator,
/// or the built-in reference floor plan; [`Layout::build`] validates it into
/// a usable floor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub width: usize,
    pub height: usize,
    pub obstacles: Vec<Position>,
    pub base: Position,
}

impl Layout {
    /// Validates the layout and builds the floor.
    pub fn build(&self) -> Result<Floor, LayoutError> {
        Floor::new(self.width, self.height, &self.obstacles, self.base)
    }

    /// Parses a layout from a string representation of a floor plan.
    ///
    /// One row per line, one glyph per cell: `.` free, `#` obstacle,
    /// `B` the charging base. Exactly one base must be present and every
    /// row must have the same width.
    pub fn parse(map_string: &str) -> Result<Self, LayoutError> {
        let lines: Vec<&str> = map_string
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        if lines.is_empty() {
            return Err(LayoutError::EmptyFloor {
                width: 0,
                height: 0,
            });
        }

        let width = lines[0].chars().count();
        let height = lines.len();
        let mut obstacles = Vec::new();
        let mut base: Option<Position> = None;

        for (y, line) in lines.iter().enumerate() {
            let row_width = line.chars().count();
            if row_width != width {
                return Err(LayoutError::RaggedRow {
                    row: y,
                    found: row_width,
                    expected: width,
                });
            }
            for (x, glyph) in line.chars().enumerate() {
                match glyph {
                    '.' => {}
                    '#' | 'X' => obstacles.push(Position { x, y }),
                    'B' => {
                        if base.is_some() {
                            return Err(LayoutError::DuplicateBase);
                        }
                        base = Some(Position { x, y });
                    }
                    unknown => {
                        return Err(LayoutError::UnknownGlyph {
                            glyph: unknown,
                            x,
                            y,
                        });
                    }
                }
            }
        }

        let base = base.ok_or(LayoutError::MissingBase)?;
        Ok(Layout {
            width,
            height,
            obstacles,
            base,
        })
    }

    /// Generates a random layout with roughly `density` obstacle coverage.
    ///
    /// Deterministic for a given seed. The base corner is always kept clear;
    /// note that a dense scatter can still wall off parts of the floor, in
    /// which case the robot cleans what it can reach and heads home.
    pub fn random(width: usize, height: usize, density: f64, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let base = Position::new(0, 0);
        let mut obstacles = Vec::new();

        for y in 0..height {
            for x in 0..width {
                let pos = Position { x, y };
                if pos == base {
                    continue;
                }
                if rng.random::<f64>() < density {
                    obstacles.push(pos);
                }
            }
        }

        Layout {
            width,
            height,
            obstacles,
            base,
        }
    }

    /// The built-in 10x8 floor plan used as the default demo layout.
    pub fn reference() -> Self {
        Layout {
            width: 10,
            height: 8,
            obstacles: vec![
                Position::new(2, 3),
                Position::new(2, 4),
                Position::new(3, 4),
                Position::new(7, 1),
                Position::new(7, 2),
                Position::new(7, 3),
                Position::new(4, 6),
                Position::new(5, 6),
                Position::new(6, 6),
            ],
            base: Position::new(0, 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::floor::CellKind;

    #[test]
    fn parses_simple_map() {
        let layout = Layout::parse(
            "B..#\n\
             ...#\n\
             ....",
        )
        .unwrap();
        assert_eq!(layout.width, 4);
        assert_eq!(layout.height, 3);
        assert_eq!(layout.base, Position::new(0, 0));
        assert_eq!(
            layout.obstacles,
            vec![Position::new(3, 0), Position::new(3, 1)]
        );

        let floor = layout.build().unwrap();
        assert_eq!(floor[(3, 1)].kind, CellKind::Obstacle);
        assert_eq!(floor[(0, 0)].kind, CellKind::Base);
        assert_eq!(floor.total_cleanable(), 9);
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = Layout::parse("B..\n..").unwrap_err();
        assert_eq!(
            err,
            LayoutError::RaggedRow {
                row: 1,
                found: 2,
                expected: 3
            }
        );
    }

    #[test]
    fn rejects_unknown_glyph_and_base_problems() {
        assert!(matches!(
            Layout::parse("B.?").unwrap_err(),
            LayoutError::UnknownGlyph { glyph: '?', .. }
        ));
        assert_eq!(Layout::parse("...").unwrap_err(), LayoutError::MissingBase);
        assert_eq!(
            Layout::parse("B.B").unwrap_err(),
            LayoutError::DuplicateBase
        );
    }

    #[test]
    fn random_layout_is_deterministic_per_seed() {
        let a = Layout::random(12, 9, 0.2, 42);
        let b = Layout::random(12, 9, 0.2, 42);
        let c = Layout::random(12, 9, 0.2, 43);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(!a.obstacles.contains(&a.base));
        a.build().unwrap();
    }

    #[test]
    fn reference_layout_builds() {
        let floor = Layout::reference().build().unwrap();
        assert_eq!(floor.total_cleanable(), 70);
    }
}
