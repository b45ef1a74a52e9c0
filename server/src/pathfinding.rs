//! Grid pathfinding.
//!
//! A* over the 8-connected tile grid. Diagonal steps may not cut the
//! corner of an unwalkable tile. Paths exclude the start tile and end on the
//! first tile that satisfies the goal.

use crate::map::{GameMap, TilePos};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

const STRAIGHT_COST: u32 = 10;
const DIAGONAL_COST: u32 = 14;

const NEIGHBORS: [(i32, i32); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

/// Target area of a search: every walkable tile within `reach` tiles
/// (Chebyshev) of the `size`×`size` block at `origin` satisfies it.
#[derive(Debug, Clone, Copy)]
pub struct Goal {
    pub origin: TilePos,
    pub size: i32,
    pub reach: i32,
}

impl Goal {
    pub fn tile(pos: TilePos) -> Self {
        Self {
            origin: pos,
            size: 1,
            reach: 0,
        }
    }

    /// Any tile touching the footprint, for approaching buildings.
    pub fn adjacent_to(origin: TilePos, size: i32) -> Self {
        Self {
            origin,
            size,
            reach: 1,
        }
    }

    /// Per-axis distance from `pos` to the footprint, zero inside it.
    fn axis_gaps(&self, pos: TilePos) -> (i32, i32) {
        let max_x = self.origin.x + self.size - 1;
        let max_y = self.origin.y + self.size - 1;
        let dx = (self.origin.x - pos.x).max(pos.x - max_x).max(0);
        let dy = (self.origin.y - pos.y).max(pos.y - max_y).max(0);
        (dx, dy)
    }

    pub fn is_satisfied(&self, pos: TilePos) -> bool {
        let (dx, dy) = self.axis_gaps(pos);
        dx.max(dy) <= self.reach
    }

    /// Octile distance to the nearest tile within reach, in step-cost units.
    fn heuristic(&self, pos: TilePos) -> u32 {
        let (dx, dy) = self.axis_gaps(pos);
        let dx = (dx - self.reach).max(0) as u32;
        let dy = (dy - self.reach).max(0) as u32;
        STRAIGHT_COST * dx.max(dy) + (DIAGONAL_COST - STRAIGHT_COST) * dx.min(dy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Frontier {
    estimate: u32,
    cost: u32,
    pos: TilePos,
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .estimate
            .cmp(&self.estimate)
            // Among equal estimates prefer the node furthest along.
            .then_with(|| self.cost.cmp(&other.cost))
            .then_with(|| self.pos.cmp(&other.pos))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Shortest path from `start` to an exact tile. `None` when the target is
/// blocked or unreachable.
pub fn find_path(map: &GameMap, start: TilePos, target: TilePos) -> Option<Vec<TilePos>> {
    if !map.is_walkable(target) {
        return None;
    }
    find_path_to(map, start, Goal::tile(target))
}

/// Shortest path from `start` to the nearest walkable tile satisfying `goal`.
pub fn find_path_to(map: &GameMap, start: TilePos, goal: Goal) -> Option<Vec<TilePos>> {
    if goal.is_satisfied(start) && (map.is_walkable(start) || goal.reach > 0) {
        return Some(Vec::new());
    }

    let budget = (map.size() as usize).pow(2);
    let mut open = BinaryHeap::new();
    let mut came_from: HashMap<TilePos, TilePos> = HashMap::new();
    let mut best_cost: HashMap<TilePos, u32> = HashMap::new();

    best_cost.insert(start, 0);
    open.push(Frontier {
        estimate: goal.heuristic(start),
        cost: 0,
        pos: start,
    });

    let mut expanded = 0usize;
    while let Some(Frontier { cost, pos, .. }) = open.pop() {
        if pos != start && goal.is_satisfied(pos) {
            return Some(reconstruct(&came_from, start, pos));
        }
        if best_cost.get(&pos).map(|c| cost > *c).unwrap_or(false) {
            continue;
        }
        expanded += 1;
        if expanded > budget {
            break;
        }

        for (dx, dy) in NEIGHBORS {
            let next = pos.offset(dx, dy);
            if !map.is_walkable(next) {
                continue;
            }
            let diagonal = dx != 0 && dy != 0;
            if diagonal
                && (!map.is_walkable(pos.offset(dx, 0)) || !map.is_walkable(pos.offset(0, dy)))
            {
                continue;
            }

            let next_cost = cost + if diagonal { DIAGONAL_COST } else { STRAIGHT_COST };
            if best_cost.get(&next).map(|c| next_cost < *c).unwrap_or(true) {
                best_cost.insert(next, next_cost);
                came_from.insert(next, pos);
                open.push(Frontier {
                    estimate: next_cost + goal.heuristic(next),
                    cost: next_cost,
                    pos: next,
                });
            }
        }
    }

    None
}

fn reconstruct(came_from: &HashMap<TilePos, TilePos>, start: TilePos, end: TilePos) -> Vec<TilePos> {
    let mut path = vec![end];
    let mut current = end;
    while let Some(previous) = came_from.get(&current) {
        if *previous == start {
            break;
        }
        path.push(*previous);
        current = *previous;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_straight_line() {
        let map = GameMap::new(10);
        let path = find_path(&map, TilePos::new(0, 0), TilePos::new(4, 0)).unwrap();
        assert_eq!(
            path,
            vec![
                TilePos::new(1, 0),
                TilePos::new(2, 0),
                TilePos::new(3, 0),
                TilePos::new(4, 0)
            ]
        );
    }

    #[test]
    fn test_heuristic_is_octile_distance() {
        assert_eq!(Goal::tile(TilePos::new(10, 4)).heuristic(TilePos::new(0, 0)), 116);
        assert_eq!(Goal::tile(TilePos::new(0, 7)).heuristic(TilePos::new(0, 0)), 70);
        assert_eq!(
            Goal::adjacent_to(TilePos::new(10, 10), 2).heuristic(TilePos::new(0, 0)),
            126
        );
        assert_eq!(
            Goal::adjacent_to(TilePos::new(10, 10), 2).heuristic(TilePos::new(9, 12)),
            0
        );
    }

    #[test]
    fn test_open_map_diagonal() {
        let map = GameMap::new(64);
        let path = find_path(&map, TilePos::new(0, 0), TilePos::new(63, 63)).unwrap();
        assert_eq!(path.len(), 63);
        assert!(path.iter().enumerate().all(|(i, p)| p.x == i as i32 + 1 && p.y == i as i32 + 1));
    }

    #[test]
    fn test_same_tile_is_empty_path() {
        let map = GameMap::new(10);
        assert_eq!(
            find_path(&map, TilePos::new(3, 3), TilePos::new(3, 3)),
            Some(Vec::new())
        );
    }

    #[test]
    fn test_routes_around_wall() {
        let mut map = GameMap::new(10);
        for y in 0..9 {
            map.set_walkable(TilePos::new(5, y), false);
        }
        let path = find_path(&map, TilePos::new(2, 2), TilePos::new(8, 2)).unwrap();
        assert_eq!(path.last(), Some(&TilePos::new(8, 2)));
        assert!(path.iter().all(|p| map.is_walkable(*p)));
        assert!(path.contains(&TilePos::new(5, 9)));
    }

    #[test]
    fn test_no_corner_cutting() {
        let mut map = GameMap::new(4);
        map.set_walkable(TilePos::new(1, 0), false);
        let path = find_path(&map, TilePos::new(0, 0), TilePos::new(1, 1)).unwrap();
        assert_eq!(path, vec![TilePos::new(0, 1), TilePos::new(1, 1)]);
    }

    #[test]
    fn test_unreachable_target() {
        let mut map = GameMap::new(6);
        for x in 0..6 {
            map.set_walkable(TilePos::new(x, 3), false);
        }
        assert_eq!(find_path(&map, TilePos::new(0, 0), TilePos::new(0, 5)), None);
        assert_eq!(find_path(&map, TilePos::new(0, 0), TilePos::new(0, 3)), None);
    }

    #[test]
    fn test_adjacent_goal_stops_next_to_footprint() {
        let mut map = GameMap::new(12);
        let origin = TilePos::new(6, 6);
        for pos in GameMap::footprint(origin, 2) {
            map.set_walkable(pos, false);
        }
        let path = find_path_to(&map, TilePos::new(0, 6), Goal::adjacent_to(origin, 2)).unwrap();
        assert_eq!(path.last(), Some(&TilePos::new(5, 6)));
    }
}
