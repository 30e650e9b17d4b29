//! Village layout: the central farmland, the pathways around it, and the
//! scattered ponds that agents have to route around.
//!
//! Only walkability matters here. Textures and noise-driven terrain belong to
//! the renderer.

use rand::Rng;

use crate::core::config::SimulationConfig;
use crate::core::error::{Result, SimError};
use crate::core::types::{GridCoord, Vec2};
use crate::spatial::walkability::tile_center;
use crate::world::tilemap::TileMap;

/// Edge length of one farm plot, in tiles
const PLOT_TILES: u32 = 3;

/// Half-open tile bounds of the farmland square
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FarmlandBounds {
    pub start_x: i32,
    pub start_y: i32,
    pub end_x: i32,
    pub end_y: i32,
}

#[derive(Debug, Clone)]
pub struct VillageLayout {
    pub world_tiles: u32,
    pub farm_tiles: u32,
    pub tile_size: f32,
    pub farmland: FarmlandBounds,
}

impl VillageLayout {
    pub fn new(world_tiles: u32, farm_tiles: u32, tile_size: f32) -> Self {
        let start = (world_tiles.saturating_sub(farm_tiles) / 2) as i32;
        let farmland = FarmlandBounds {
            start_x: start,
            start_y: start,
            end_x: start + farm_tiles as i32,
            end_y: start + farm_tiles as i32,
        };
        Self {
            world_tiles,
            farm_tiles,
            tile_size,
            farmland,
        }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(config.world_tiles, config.farm_tiles, config.tile_size)
    }

    pub fn is_farmland(&self, x: i32, y: i32) -> bool {
        let b = &self.farmland;
        x >= b.start_x && x < b.end_x && y >= b.start_y && y < b.end_y
    }

    /// Ring path around the farmland plus a cross running out to the world edges
    pub fn is_pathway(&self, x: i32, y: i32) -> bool {
        let b = &self.farmland;
        let center = (self.world_tiles / 2) as i32;

        let on_ring = ((x == b.start_x - 1 || x == b.end_x) && y >= b.start_y - 1 && y <= b.end_y)
            || ((y == b.start_y - 1 || y == b.end_y) && x >= b.start_x - 1 && x <= b.end_x);

        let on_cross = (x == center && (y < b.start_y - 1 || y > b.end_y))
            || (y == center && (x < b.start_x - 1 || x > b.end_x));

        on_ring || on_cross
    }

    /// Number of farm plots the farmland holds
    pub fn plot_capacity(&self) -> usize {
        let per_row = (self.farm_tiles / PLOT_TILES) as usize;
        per_row * per_row
    }

    /// Home tile of each farm, one per agent, at the center of its plot
    pub fn farm_homes(&self, count: usize) -> Result<Vec<Vec2>> {
        if count > self.plot_capacity() {
            return Err(SimError::InvalidConfig(format!(
                "{} farms requested but the farmland only holds {}",
                count,
                self.plot_capacity()
            )));
        }

        let per_row = self.farm_tiles / PLOT_TILES;
        let homes = (0..count as u32)
            .map(|i| {
                let coord = GridCoord::new(
                    self.farmland.start_x + ((i % per_row) * PLOT_TILES + 1) as i32,
                    self.farmland.start_y + ((i / per_row) * PLOT_TILES + 1) as i32,
                );
                tile_center(coord, self.tile_size)
            })
            .collect();
        Ok(homes)
    }

    /// Build the walkability map, scattering `ponds` blocking tiles off the
    /// farmland and pathways
    pub fn build_map<R: Rng>(&self, ponds: u32, rng: &mut R) -> TileMap {
        let mut map = TileMap::new(self.world_tiles, self.world_tiles, self.tile_size);
        if self.world_tiles == 0 {
            return map;
        }

        let mut placed = 0;
        let mut tries = 0;
        while placed < ponds && tries < ponds.saturating_mul(20) {
            tries += 1;
            let x = rng.gen_range(0..self.world_tiles) as i32;
            let y = rng.gen_range(0..self.world_tiles) as i32;
            if self.is_farmland(x, y) || self.is_pathway(x, y) || map.blocked().is_blocked(x, y) {
                continue;
            }
            map.block(x, y);
            placed += 1;
        }

        tracing::debug!(ponds = placed, tries, "village map built");
        map
    }
}
