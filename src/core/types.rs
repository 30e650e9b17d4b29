//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};

/// Pixel-space position. Continuous; agents move through it every tick.
pub type Vec2 = glam::Vec2;

/// Simulation tick counter (one tick = `SimulationConfig::tick_ms` of simulated time)
pub type Tick = u64;

/// Unique identifier for agents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub u32);

impl AgentId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "agent#{}", self.0)
    }
}

/// Unique identifier for pending events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

/// Integer tile index on the world grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCoord {
    pub x: i32,
    pub y: i32,
}

impl GridCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance between two tiles
    pub fn manhattan(&self, other: &Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// The four orthogonal neighbours, in +x, -x, +y, -y order
    pub fn neighbors(&self) -> [GridCoord; 4] {
        [
            GridCoord::new(self.x + 1, self.y),
            GridCoord::new(self.x - 1, self.y),
            GridCoord::new(self.x, self.y + 1),
            GridCoord::new(self.x, self.y - 1),
        ]
    }
}

/// Direction an agent is facing (drives sprite selection in the renderer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Facing {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl Facing {
    /// Facing for a movement delta, picked by whichever axis moves more.
    ///
    /// Ties go to the vertical axis.
    pub fn from_delta(delta: Vec2) -> Self {
        if delta.x.abs() > delta.y.abs() {
            if delta.x > 0.0 {
                Facing::Right
            } else {
                Facing::Left
            }
        } else if delta.y > 0.0 {
            Facing::Down
        } else {
            Facing::Up
        }
    }
}
