//! Grid-space queries: the walkability oracle and route planning

pub mod pathfinding;
pub mod walkability;

pub use pathfinding::{find_path, PathPlanner};
pub use walkability::Walkability;
