use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap, HashSet, VecDeque},
};

use crate::{
    FRONTIER_DEPTH_LIMIT, Position,
    floor::{CellKind, Floor},
};

/// Whether a cell may appear on a path ending at `goal`.
///
/// Obstacles are never passable. The base is passable only as the goal
/// itself: mid-coverage travel routes around it, and a return-to-base path
/// enters it only as the terminal node.
fn is_passable(floor: &Floor, pos: Position, goal: Position) -> bool {
    match floor.get(pos) {
        Some(cell) => match cell.kind {
            CellKind::Obstacle => false,
            CellKind::Base => pos == goal,
            CellKind::Free => true,
        },
        None => false,
    }
}

/// Finds the nearest reachable cell that still needs cleaning.
///
/// Breadth-first traversal starting from the cells adjacent to `from` (not
/// `from` itself), expanding neighbors in fixed North, East, South, West
/// order so that equal-distance candidates resolve deterministically. The
/// first dequeued unvisited Free cell wins.
///
/// Entries dequeued past [`FRONTIER_DEPTH_LIMIT`] are still tested but not
/// expanded, bounding the search radius. Returns `None` when the frontier is
/// exhausted without a qualifying cell.
pub fn find_frontier(floor: &Floor, from: Position) -> Option<Position> {
    let mut queue: VecDeque<(Position, usize)> = VecDeque::new();
    let mut seen: HashSet<Position> = HashSet::new();
    seen.insert(from);

    for neighbor in floor.neighbors(from) {
        if floor[neighbor].kind == CellKind::Free && seen.insert(neighbor) {
            queue.push_back((neighbor, 1));
        }
    }

    while let Some((pos, depth)) = queue.pop_front() {
        let cell = &floor[pos];
        if !cell.visited && cell.kind == CellKind::Free {
            return Some(pos);
        }

        // Safety valve against unbounded traversal on large floors.
        if depth > FRONTIER_DEPTH_LIMIT {
            continue;
        }

        // Only Free cells are traversable mid-coverage, so anything the
        // traversal dequeues is genuinely reachable by the robot.
        for neighbor in floor.neighbors(pos) {
            if floor[neighbor].kind == CellKind::Free && seen.insert(neighbor) {
                queue.push_back((neighbor, depth + 1));
            }
        }
    }

    None
}

// For the A* priority queue.
#[derive(Clone, Eq, PartialEq)]
struct PrioritizedItem {
    priority: usize,
    // Insertion sequence number, used to break f-score ties in favor of the
    // earlier-pushed node so results are deterministic.
    order: usize,
    position: Position,
}

impl Ord for PrioritizedItem {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behavior
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.order.cmp(&self.order))
    }
}

impl PartialOrd for PrioritizedItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A* pathfinding between two floor positions.
///
/// Manhattan-distance heuristic, uniform cost of 1 per orthogonal step.
/// The returned path excludes `start` and includes `goal`, in traversal
/// order; consecutive entries are orthogonally adjacent. Returns `None`
/// when no path exists or when the expansion budget (one pop per floor
/// cell) runs out; callers cannot tell the two apart, both are ordinary
/// "no path" results.
pub fn find_path(floor: &Floor, start: Position, goal: Position) -> Option<Vec<Position>> {
    if start == goal {
        return Some(Vec::new());
    }
    if !is_passable(floor, goal, goal) {
        return None;
    }

    let mut frontier = BinaryHeap::new();
    let mut came_from: HashMap<Position, Position> = HashMap::new();
    let mut cost_so_far: HashMap<Position, usize> = HashMap::new();
    let mut next_order = 0usize;

    frontier.push(PrioritizedItem {
        priority: start.manhattan_distance(&goal),
        order: next_order,
        position: start,
    });
    cost_so_far.insert(start, 0);

    // Expansion budget: no useful path pops a node more often than there
    // are cells, so anything beyond this is a pathological input.
    let max_expansions = floor.width() * floor.height();
    let mut expansions = 0usize;
    let mut goal_reached = false;

    while let Some(PrioritizedItem {
        position: current, ..
    }) = frontier.pop()
    {
        if current == goal {
            goal_reached = true;
            break;
        }

        expansions += 1;
        if expansions > max_expansions {
            return None;
        }

        for neighbor in floor.neighbors(current) {
            if !is_passable(floor, neighbor, goal) {
                continue;
            }

            let new_cost = cost_so_far[&current] + 1;
            if cost_so_far
                .get(&neighbor)
                .is_none_or(|&existing| new_cost < existing)
            {
                cost_so_far.insert(neighbor, new_cost);
                came_from.insert(neighbor, current);
                next_order += 1;
                frontier.push(PrioritizedItem {
                    priority: new_cost + neighbor.manhattan_distance(&goal),
                    order: next_order,
                    position: neighbor,
                });
            }
        }
    }

    if !goal_reached {
        return None;
    }

    // Reconstruct the path, dropping the start position.
    let mut path = Vec::new();
    let mut current = goal;
    while current != start {
        path.push(current);
        current = *came_from.get(&current)?;
    }
    path.reverse();
    Some(path)
}
