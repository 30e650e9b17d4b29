//! World terrain as the simulation sees it: which tiles can be walked on

pub mod blocking;
pub mod tilemap;
pub mod village;

pub use blocking::BlockedCells;
pub use tilemap::TileMap;
pub use village::VillageLayout;
