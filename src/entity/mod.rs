pub mod agent;
pub mod state;

pub use agent::{Agent, AgentView, MoveTag, MovementState};
pub use state::{AgentAction, AgentState, Friendship, PendingEvent};
