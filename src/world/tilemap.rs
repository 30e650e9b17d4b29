//! Bounded tile grid backing the walkability oracle

use crate::spatial::walkability::Walkability;
use crate::world::blocking::BlockedCells;

/// A `width` x `height` grid of tiles; everything inside is walkable unless blocked
#[derive(Debug, Clone)]
pub struct TileMap {
    pub width: u32,
    pub height: u32,
    tile_size: f32,
    blocked: BlockedCells,
}

impl TileMap {
    pub fn new(width: u32, height: u32, tile_size: f32) -> Self {
        Self {
            width,
            height,
            tile_size,
            blocked: BlockedCells::new(),
        }
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    pub fn block(&mut self, x: i32, y: i32) {
        self.blocked.block(x, y);
    }

    pub fn blocked(&self) -> &BlockedCells {
        &self.blocked
    }
}

impl Walkability for TileMap {
    fn is_walkable(&self, x: i32, y: i32) -> bool {
        self.in_bounds(x, y) && !self.blocked.is_blocked(x, y)
    }

    fn tile_size(&self) -> f32 {
        self.tile_size
    }
}
