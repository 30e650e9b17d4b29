//! Hearthvale - village agent simulation core
//!
//! Grid path planning, agent movement, and a cooperative per-tick behavior
//! engine (farming, visiting, helping, accusing) driven by a seeded random
//! source.

pub mod core;
pub mod entity;
pub mod llm;
pub mod simulation;
pub mod spatial;
pub mod world;
