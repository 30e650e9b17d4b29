//! Walkability oracle consumed by the path planner
//!
//! The terrain behind the oracle (fences, ponds, buildings) is owned by world
//! generation; the planner only ever asks whether a tile can be entered.

use crate::core::types::{GridCoord, Vec2};

/// Answers whether a grid cell is traversable
pub trait Walkability {
    /// True if an agent may enter tile `(x, y)`. Out-of-world tiles are not walkable.
    fn is_walkable(&self, x: i32, y: i32) -> bool;

    /// Edge length of one tile in pixels
    fn tile_size(&self) -> f32;

    /// Tile containing a pixel position (floor division by tile size)
    fn pixel_to_tile(&self, pos: Vec2) -> GridCoord {
        pixel_to_tile(pos, self.tile_size())
    }

    /// Pixel center of a tile
    fn tile_center(&self, coord: GridCoord) -> Vec2 {
        tile_center(coord, self.tile_size())
    }
}

#[inline]
pub fn pixel_to_tile(pos: Vec2, tile_size: f32) -> GridCoord {
    GridCoord::new(
        (pos.x / tile_size).floor() as i32,
        (pos.y / tile_size).floor() as i32,
    )
}

#[inline]
pub fn tile_center(coord: GridCoord, tile_size: f32) -> Vec2 {
    Vec2::new(
        (coord.x as f32 + 0.5) * tile_size,
        (coord.y as f32 + 0.5) * tile_size,
    )
}
