//! Behavior engine: the scheduler, its tasks, and the rules they apply

pub mod behavior;
pub mod events;
pub mod outcome;
pub mod probability;
pub mod scheduler;
pub mod store;

pub use behavior::{Behavior, BehaviorTask, FarmTask, TaskStatus, VisitTask};
pub use events::{EventGenerator, SimEvent};
pub use outcome::{resolve_visit, VisitOutcome};
pub use probability::{seeded, SimRng};
pub use scheduler::{AgentSummary, Scheduler};
pub use store::{AgentRecord, AgentStore};
