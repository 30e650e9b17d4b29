//! Simulation configuration with documented constants
//!
//! All magic numbers are collected here with explanations of their purpose.
//! Durations are expressed in ticks; one tick is `tick_ms` of simulated time,
//! which is also the interval at which behavior tasks poll for progress.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};

/// Named probabilities driving the behavior engine
///
/// Every random branch the scheduler takes reads one of these, so tests can
/// force a branch by setting its chance to 0.0 or 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbabilityTable {
    /// Chance per idle pass that a new event is raised on some other agent
    pub event_chance: f64,

    /// Chance after a conversation that the visitor tries to pay off the
    /// target's oldest event
    pub help_chance: f64,

    /// Chance, checked only when help did not happen, that the visitor accuses
    /// the target
    pub accuse_chance: f64,

    /// Chance an idle agent picks VISIT over FARM
    pub visit_chance: f64,
}

impl Default for ProbabilityTable {
    fn default() -> Self {
        Self {
            event_chance: 0.10,
            help_chance: 0.30,
            accuse_chance: 0.10,
            visit_chance: 0.5,
        }
    }
}

impl ProbabilityTable {
    fn validate(&self) -> Result<()> {
        let named = [
            ("event_chance", self.event_chance),
            ("help_chance", self.help_chance),
            ("accuse_chance", self.accuse_chance),
            ("visit_chance", self.visit_chance),
        ];
        for (name, p) in named {
            if !(0.0..=1.0).contains(&p) {
                return Err(SimError::InvalidConfig(format!(
                    "{} ({}) must be within [0, 1]",
                    name, p
                )));
            }
        }
        Ok(())
    }
}

/// Configuration for the village simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // === CLOCK ===
    /// Simulated milliseconds per tick
    ///
    /// Only used to pace the binary against wall-clock time; the library
    /// itself counts ticks.
    pub tick_ms: u64,

    /// Seed for the simulation's random source
    pub seed: u64,

    // === WORLD ===
    /// Edge length of a tile in pixels
    pub tile_size: f32,

    /// Edge length of the square world in tiles
    pub world_tiles: u32,

    /// Edge length of the central farmland square in tiles
    pub farm_tiles: u32,

    /// Number of blocking pond tiles scattered outside the farmland
    pub pond_tiles: u32,

    // === MOVEMENT ===
    /// Pixels an agent covers per tick along its route
    ///
    /// At 8 px/tick and 32 px tiles an agent crosses one tile in 4 ticks.
    pub agent_speed: f32,

    // === ECONOMY ===
    /// Gold every agent starts the session with
    pub starting_gold: u32,

    /// Inclusive range of gold earned by one farming session
    pub farm_gold_min: u32,
    pub farm_gold_max: u32,

    /// Inclusive range of gold an event costs to resolve
    pub event_gold_min: u32,
    pub event_gold_max: u32,

    // === FARM BEHAVIOR ===
    /// Attempts to walk home before the FARM action is left stranded
    pub farm_max_attempts: u32,

    /// Ticks one attempt may spend walking home (600 ticks = 60 s)
    pub farm_arrival_timeout_ticks: u64,

    /// Pause between failed attempts (10 ticks = 1 s)
    pub farm_retry_backoff_ticks: u64,

    /// Length of the farming wait once home (100 ticks = 10 s)
    pub farming_ticks: u64,

    /// Ticks the scheduler waits before resuming a stranded FARM action
    pub stranded_retry_ticks: u64,

    // === VISIT BEHAVIOR ===
    /// Replanning attempts while chasing a target
    pub visit_max_attempts: u32,

    /// Distance, in tiles, at which a visitor has caught up with its target
    pub visit_range_tiles: f32,

    /// Length of the paired conversation (100 ticks = 10 s)
    pub conversation_ticks: u64,

    /// Pause after a help or an accusation before heading home (50 ticks = 5 s)
    pub outcome_linger_ticks: u64,

    /// Whether the visitor walks home before its VISIT action clears
    pub return_home_after_visit: bool,

    /// Ticks the walk home may take before the action clears anyway
    pub return_home_timeout_ticks: u64,

    /// Behavior-engine probabilities
    pub probabilities: ProbabilityTable,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            seed: 42,

            tile_size: 32.0,
            world_tiles: 100,
            farm_tiles: 10,
            pond_tiles: 40,

            agent_speed: 8.0,

            starting_gold: 100,
            farm_gold_min: 5,
            farm_gold_max: 24,
            event_gold_min: 10,
            event_gold_max: 59,

            farm_max_attempts: 3,
            farm_arrival_timeout_ticks: 600,
            farm_retry_backoff_ticks: 10,
            farming_ticks: 100,
            stranded_retry_ticks: 50,

            visit_max_attempts: 4,
            visit_range_tiles: 2.0,
            conversation_ticks: 100,
            outcome_linger_ticks: 50,
            return_home_after_visit: true,
            return_home_timeout_ticks: 600,

            probabilities: ProbabilityTable::default(),
        }
    }
}

impl SimulationConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document; keys it omits keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.tile_size <= 0.0 {
            return Err(SimError::InvalidConfig("tile_size must be positive".into()));
        }
        if self.agent_speed <= 0.0 {
            return Err(SimError::InvalidConfig("agent_speed must be positive".into()));
        }
        if self.farm_tiles + 2 > self.world_tiles {
            return Err(SimError::InvalidConfig(format!(
                "farm_tiles ({}) plus its ring path must fit inside world_tiles ({})",
                self.farm_tiles, self.world_tiles
            )));
        }
        if self.farm_gold_min > self.farm_gold_max {
            return Err(SimError::InvalidConfig(format!(
                "farm_gold_min ({}) should be <= farm_gold_max ({})",
                self.farm_gold_min, self.farm_gold_max
            )));
        }
        if self.event_gold_min > self.event_gold_max {
            return Err(SimError::InvalidConfig(format!(
                "event_gold_min ({}) should be <= event_gold_max ({})",
                self.event_gold_min, self.event_gold_max
            )));
        }
        if self.farm_max_attempts == 0 || self.visit_max_attempts == 0 {
            return Err(SimError::InvalidConfig("attempt budgets must be at least 1".into()));
        }
        if self.farm_arrival_timeout_ticks == 0 {
            return Err(SimError::InvalidConfig(
                "farm_arrival_timeout_ticks must be positive".into(),
            ));
        }
        if self.visit_range_tiles <= 0.0 {
            return Err(SimError::InvalidConfig("visit_range_tiles must be positive".into()));
        }
        self.probabilities.validate()
    }

    /// Catch-up distance for a visit, in pixels
    pub fn visit_range(&self) -> f32 {
        self.visit_range_tiles * self.tile_size
    }
}
