// A* pathfinding over the tile grid.
//
// Standard A* on a 4-connected grid with unit step cost and a Manhattan
// heuristic (admissible and consistent here). The open set is a `BinaryHeap`
// min-heap via reversed ordering; g-scores, came-from links, and the closed
// set live in `Vec`s indexed by cell, so there is no hashing and the result
// depends only on the world state and the endpoints.
//
// Ties on f-score prefer the entry closer to the goal (smaller h), then the
// earlier-pushed entry. Neighbours expand in N, E, S, W order. Together these
// make the chosen path among equal-length alternatives deterministic.
//
// Passability is team-aware (see `Team::blocked_by`): a cell must have a tile,
// and a creature in it blocks only the opposing team. The start cell is never
// checked (the mover is standing on it); the goal cell is.
//
// See also: `world.rs` for the grid being searched, `ai.rs` and the client
// autopilot which request paths, `sim.rs` whose `Move` handler walks them.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::types::{GridPoint, Team};
use crate::world::World;

/// Entry in the A* open set (min-heap via reversed ordering).
struct OpenEntry {
    cell: usize,
    f_score: u32,
    h_score: u32,
    seq: u64,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: smallest f (then h, then seq) is "greatest".
        other
            .f_score
            .cmp(&self.f_score)
            .then_with(|| other.h_score.cmp(&self.h_score))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Whether `team` may enter `p`.
pub fn passable(world: &World, p: GridPoint, team: Team) -> bool {
    if world.tile_at(p).is_none() {
        return false;
    }
    match world.creature_at(p) {
        Some(occupant) => !team.blocked_by(occupant.is_player_team),
        None => true,
    }
}

/// Shortest path from `start` to `goal`, both inclusive. Empty if the goal is
/// unreachable for `team` or either endpoint is off the map.
pub fn find_path(world: &World, start: GridPoint, goal: GridPoint, team: Team) -> Vec<GridPoint> {
    if world.tile_at(start).is_none() || world.tile_at(goal).is_none() {
        return Vec::new();
    }
    if start == goal {
        return vec![start];
    }
    if !passable(world, goal, team) {
        return Vec::new();
    }

    let width = world.width as usize;
    let n = width * world.height as usize;
    let to_cell = |p: GridPoint| p.x as usize + p.y as usize * width;
    let to_point = |cell: usize| GridPoint::new((cell % width) as i32, (cell / width) as i32);

    let mut g_score = vec![u32::MAX; n];
    let mut came_from: Vec<Option<usize>> = vec![None; n];
    let mut closed = vec![false; n];
    let mut seq = 0u64;

    let start_cell = to_cell(start);
    let goal_cell = to_cell(goal);
    g_score[start_cell] = 0;

    let mut open = BinaryHeap::new();
    let h_start = start.manhattan_distance(goal);
    open.push(OpenEntry {
        cell: start_cell,
        f_score: h_start,
        h_score: h_start,
        seq,
    });

    while let Some(current) = open.pop() {
        let ci = current.cell;
        if ci == goal_cell {
            return reconstruct_path(&came_from, start_cell, goal_cell, to_point);
        }
        if closed[ci] {
            continue;
        }
        closed[ci] = true;

        let current_g = g_score[ci];
        for neighbor in to_point(ci).neighbors4() {
            if !world.in_bounds(neighbor) || !passable(world, neighbor, team) {
                continue;
            }
            let ni = to_cell(neighbor);
            if closed[ni] {
                continue;
            }
            let tentative_g = current_g + 1;
            if tentative_g < g_score[ni] {
                g_score[ni] = tentative_g;
                came_from[ni] = Some(ci);
                let h = neighbor.manhattan_distance(goal);
                seq += 1;
                open.push(OpenEntry {
                    cell: ni,
                    f_score: tentative_g + h,
                    h_score: h,
                    seq,
                });
            }
        }
    }

    Vec::new()
}

fn reconstruct_path(
    came_from: &[Option<usize>],
    start: usize,
    goal: usize,
    to_point: impl Fn(usize) -> GridPoint,
) -> Vec<GridPoint> {
    let mut path = vec![to_point(goal)];
    let mut current = goal;
    while current != start {
        match came_from[current] {
            Some(prev) => {
                path.push(to_point(prev));
                current = prev;
            }
            None => return Vec::new(),
        }
    }
    path.reverse();
    path
}
