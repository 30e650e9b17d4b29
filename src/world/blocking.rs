//! Blocked cells for pathfinding
//!
//! Uses a HashSet-based approach for O(1) lookup of blocked cells.

use ahash::AHashSet;

use crate::core::types::GridCoord;

/// Set of non-walkable grid cells (ponds, fences, buildings)
#[derive(Debug, Clone, Default)]
pub struct BlockedCells {
    cells: AHashSet<GridCoord>,
}

impl BlockedCells {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block a cell at grid coordinates
    pub fn block(&mut self, x: i32, y: i32) {
        self.cells.insert(GridCoord::new(x, y));
    }

    /// Check if a cell at grid coordinates is blocked
    pub fn is_blocked(&self, x: i32, y: i32) -> bool {
        self.cells.contains(&GridCoord::new(x, y))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
