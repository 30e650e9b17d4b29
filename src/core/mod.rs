pub mod config;
pub mod error;
pub mod types;

pub use config::{ProbabilityTable, SimulationConfig};
pub use error::{Result, SimError};
