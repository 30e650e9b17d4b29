//! Optional NPC dialogue service

pub mod client;
pub mod dialogue;

pub use client::DialogueClient;
pub use dialogue::{DialogueHistory, DialogueRequest, DialogueResponse};
