//! Agent movement and interaction state machine
//!
//! ```text
//! Idle ──move_to──▶ Moving ──route consumed──▶ Idle
//! Idle ──set_busy──▶ Busy ──release_busy──▶ Idle
//! Idle/Moving/Busy ──start_conversation──▶ Conversing ──end_conversation──▶ (previous)
//! ```
//!
//! Busy and Conversing freeze movement without discarding the route, so a walk
//! interrupted by a conversation picks up where it stopped.

use serde::{Deserialize, Serialize};

use crate::core::types::{AgentId, Facing, Vec2};
use crate::spatial::pathfinding::PathPlanner;
use crate::spatial::walkability::Walkability;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MovementState {
    #[default]
    Idle,
    Moving,
    Busy,
    Conversing,
}

/// Why a route was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveTag {
    Farm,
    Visit,
    Home,
}

/// Result of a movement tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MovementResult {
    pub moved: bool,
    pub reached_waypoint: bool,
    /// The last waypoint was reached this tick
    pub arrived: bool,
}

/// What the renderer reads each frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AgentView {
    pub id: AgentId,
    pub position: Vec2,
    pub facing: Facing,
    pub movement_state: MovementState,
    /// Walk animation should be playing
    pub walking: bool,
}

/// A movable villager
#[derive(Debug, Clone)]
pub struct Agent {
    pub id: AgentId,
    position: Vec2,
    facing: Facing,
    path: Vec<Vec2>,
    path_index: usize,
    movement_state: MovementState,
    speed: f32,
    move_tag: Option<MoveTag>,
    walking: bool,
    /// Open conversations; movement stays frozen until all are closed
    conversation_holds: u32,
    /// State to restore once the last conversation closes
    resume_state: MovementState,
}

impl Agent {
    pub fn new(id: AgentId, position: Vec2, speed: f32) -> Self {
        Self {
            id,
            position,
            facing: Facing::default(),
            path: Vec::new(),
            path_index: 0,
            movement_state: MovementState::Idle,
            speed,
            move_tag: None,
            walking: false,
            conversation_holds: 0,
            resume_state: MovementState::Idle,
        }
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn movement_state(&self) -> MovementState {
        self.movement_state
    }

    pub fn move_tag(&self) -> Option<MoveTag> {
        self.move_tag
    }

    pub fn path(&self) -> &[Vec2] {
        &self.path
    }

    pub fn path_index(&self) -> usize {
        self.path_index
    }

    pub fn remaining_waypoints(&self) -> usize {
        self.path.len().saturating_sub(self.path_index)
    }

    pub fn view(&self) -> AgentView {
        AgentView {
            id: self.id,
            position: self.position,
            facing: self.facing,
            movement_state: self.movement_state,
            walking: self.walking,
        }
    }

    /// Place the agent without walking (world population, tests)
    pub fn place_at(&mut self, position: Vec2) {
        self.position = position;
    }

    /// Request a route to `target`, replacing any current one
    ///
    /// Does not block; the route is walked by [`Agent::update`]. Returns false
    /// when no route exists, in which case the agent is left at its target in the
    /// sense of [`Agent::is_at_target`] and callers decide whether to retry.
    pub fn move_to(
        &mut self,
        planner: &mut PathPlanner,
        world: &dyn Walkability,
        target: Vec2,
        tag: MoveTag,
    ) -> bool {
        self.path = planner.find_path(world, self.position, target);
        self.path_index = 0;
        self.move_tag = Some(tag);

        let found = !self.path.is_empty();
        match self.movement_state {
            MovementState::Idle | MovementState::Moving => {
                self.movement_state = if found {
                    MovementState::Moving
                } else {
                    MovementState::Idle
                };
                self.walking = found;
            }
            // Frozen; the new route is walked once released
            MovementState::Busy | MovementState::Conversing => {}
        }

        tracing::trace!(agent = %self.id, ?tag, waypoints = self.path.len(), "route requested");
        found
    }

    /// Advance one tick along the current route
    pub fn update(&mut self) -> MovementResult {
        let mut result = MovementResult::default();

        if self.is_busy_state() {
            self.walking = false;
            return result;
        }

        let Some(&waypoint) = self.path.get(self.path_index) else {
            self.stop();
            return result;
        };

        let delta = waypoint - self.position;
        let distance = delta.length();
        if distance > 0.0 {
            self.facing = Facing::from_delta(delta);
        }

        if distance < self.speed {
            self.position = waypoint;
            self.path_index += 1;
            result.reached_waypoint = true;
        } else {
            self.position += delta / distance * self.speed;
        }
        result.moved = true;
        self.walking = true;

        if self.is_at_target() {
            self.stop();
            result.arrived = true;
        }

        result
    }

    fn stop(&mut self) {
        if self.movement_state == MovementState::Moving {
            self.movement_state = MovementState::Idle;
        }
        self.walking = false;
    }

    /// True when the route is empty or fully walked
    pub fn is_at_target(&self) -> bool {
        self.path_index >= self.path.len()
    }

    /// True when frozen in Busy or Conversing
    pub fn is_busy_state(&self) -> bool {
        matches!(
            self.movement_state,
            MovementState::Busy | MovementState::Conversing
        )
    }

    /// State to fall back to once nothing is freezing the agent
    fn settled_state(&self) -> MovementState {
        if self.is_at_target() {
            MovementState::Idle
        } else {
            MovementState::Moving
        }
    }

    /// Enter the Busy wait (farming)
    pub fn set_busy(&mut self) {
        if self.movement_state == MovementState::Conversing {
            self.resume_state = MovementState::Busy;
        } else {
            self.movement_state = MovementState::Busy;
        }
        self.walking = false;
    }

    /// Leave the Busy wait
    pub fn release_busy(&mut self) {
        match self.movement_state {
            MovementState::Busy => self.movement_state = self.settled_state(),
            MovementState::Conversing if self.resume_state == MovementState::Busy => {
                self.resume_state = MovementState::Idle;
            }
            _ => {}
        }
    }

    /// Freeze for a conversation, keeping the current route
    pub fn start_conversation(&mut self) {
        if self.conversation_holds == 0 {
            self.resume_state = self.movement_state;
            self.movement_state = MovementState::Conversing;
            self.walking = false;
        }
        self.conversation_holds += 1;
    }

    /// Close one conversation; movement resumes after the last one closes
    pub fn end_conversation(&mut self) {
        if self.conversation_holds == 0 {
            return;
        }
        self.conversation_holds -= 1;
        if self.conversation_holds == 0 {
            self.movement_state = match self.resume_state {
                MovementState::Busy => MovementState::Busy,
                _ => self.settled_state(),
            };
            self.resume_state = MovementState::Idle;
        }
    }

    pub fn conversation_holds(&self) -> u32 {
        self.conversation_holds
    }
}
