//! A* pathfinding over the tile grid
//!
//! Four-directional moves, unit step cost, Manhattan heuristic. Search nodes live
//! in a flat arena and point at their parent by index, so the parent tree never
//! needs shared ownership.
//!
//! Ties in the open set are broken deterministically: lowest `f`, then lowest
//! `h`, then the node that was pushed first.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ahash::{AHashMap, AHashSet};

use crate::core::types::{GridCoord, Vec2};
use crate::spatial::walkability::Walkability;

/// One explored tile. Exists only for the duration of a single search.
#[derive(Debug, Clone)]
struct SearchNode {
    coord: GridCoord,
    g: u32,
    h: u32,
    parent: Option<usize>,
}

impl SearchNode {
    fn f(&self) -> u32 {
        self.g + self.h
    }
}

/// Entry in the open set, pointing into the node arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenEntry {
    f: u32,
    h: u32,
    seq: u64,
    node: usize,
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.h.cmp(&self.h))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Reusable A* planner
///
/// Buffers are kept between calls to avoid reallocating, but every call to
/// [`PathPlanner::find_path`] clears them first, so no state leaks from one
/// search into the next.
#[derive(Debug, Default)]
pub struct PathPlanner {
    nodes: Vec<SearchNode>,
    open: BinaryHeap<OpenEntry>,
    closed: AHashSet<GridCoord>,
    best: AHashMap<GridCoord, usize>,
    seq: u64,
}

impl PathPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    fn reset(&mut self) {
        self.nodes.clear();
        self.open.clear();
        self.closed.clear();
        self.best.clear();
        self.seq = 0;
    }

    fn push(&mut self, coord: GridCoord, g: u32, goal: GridCoord, parent: Option<usize>) {
        let h = coord.manhattan(&goal);
        let node = self.nodes.len();
        self.nodes.push(SearchNode { coord, g, h, parent });
        self.best.insert(coord, node);
        self.open.push(OpenEntry {
            f: g + h,
            h,
            seq: self.seq,
            node,
        });
        self.seq += 1;
    }

    /// Plan a route between two pixel positions
    ///
    /// Returns tile-center waypoints from the start tile to the goal tile, both
    /// included, each one tile-step from the previous. An empty result means the
    /// goal cannot be reached; that is a normal outcome, not an error.
    pub fn find_path(&mut self, world: &dyn Walkability, start: Vec2, end: Vec2) -> Vec<Vec2> {
        self.reset();

        let start = world.pixel_to_tile(start);
        let goal = world.pixel_to_tile(end);

        if start == goal {
            return vec![world.tile_center(goal)];
        }

        self.push(start, 0, goal, None);

        while let Some(entry) = self.open.pop() {
            let current = self.nodes[entry.node].clone();

            // Superseded duplicate of a tile already expanded
            if self.closed.contains(&current.coord) {
                continue;
            }

            if current.coord == goal {
                let path = self.reconstruct(entry.node, world);
                tracing::trace!(
                    expanded = self.closed.len(),
                    length = path.len(),
                    "path found"
                );
                return path;
            }

            self.closed.insert(current.coord);
            debug_assert_eq!(entry.f, current.f());

            for neighbor in current.coord.neighbors() {
                if self.closed.contains(&neighbor) || !world.is_walkable(neighbor.x, neighbor.y) {
                    continue;
                }

                let tentative_g = current.g + 1;
                if let Some(&known) = self.best.get(&neighbor) {
                    if self.nodes[known].g <= tentative_g {
                        continue;
                    }
                }

                self.push(neighbor, tentative_g, goal, Some(entry.node));
            }
        }

        tracing::trace!(expanded = self.closed.len(), "no route");
        Vec::new()
    }

    /// Walk parent links from the goal back to the start, then reverse
    fn reconstruct(&self, goal_node: usize, world: &dyn Walkability) -> Vec<Vec2> {
        let mut path = Vec::new();
        let mut cursor = Some(goal_node);
        while let Some(index) = cursor {
            let node = &self.nodes[index];
            path.push(world.tile_center(node.coord));
            cursor = node.parent;
        }
        path.reverse();
        path
    }
}

/// Plan a route with a throwaway planner
pub fn find_path(world: &dyn Walkability, start: Vec2, end: Vec2) -> Vec<Vec2> {
    PathPlanner::new().find_path(world, start, end)
}
