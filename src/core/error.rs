use thiserror::Error;

use crate::core::types::AgentId;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Agent not found: {0}")]
    AgentNotFound(AgentId),

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Dialogue error: {0}")]
    DialogueError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
