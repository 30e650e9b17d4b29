//! NPC dialogue: request/response shapes, prompt building, reply cleanup
//!
//! Dialogue is flavor only. Nothing in the simulation waits on it, and a failed
//! request just means no line is spoken.

use std::collections::VecDeque;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};
use crate::core::types::AgentId;
use crate::entity::state::AgentState;

/// Lines kept per agent pair
pub const HISTORY_LINES: usize = 6;

const STOP_MARKERS: [&str; 2] = ["Player:", "NPC:"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueRequest {
    pub prompt: String,
    pub history: Option<String>,
}

impl DialogueRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            history: None,
        }
    }

    pub fn with_history(mut self, history: Option<String>) -> Self {
        self.history = history.filter(|h| !h.trim().is_empty());
        self
    }

    /// Reject requests with nothing to say
    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(SimError::DialogueError("prompt is required".into()));
        }
        Ok(())
    }

    /// Text handed to the completion model
    pub fn completion_prompt(&self) -> String {
        match &self.history {
            Some(history) => format!("{}\nNPC: {}", history, self.prompt),
            None => format!("NPC: {}", self.prompt),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueResponse {
    pub reply: String,
}

/// Trim a raw completion down to a single spoken line
pub fn clean_reply(raw: &str) -> String {
    let mut line = raw.trim();
    if let Some(end) = line.find('\n') {
        line = &line[..end];
    }
    for marker in STOP_MARKERS {
        if let Some(end) = line.find(marker) {
            line = &line[..end];
        }
    }
    line.trim().to_string()
}

/// Opening line for a visit, built from what the visitor knows
pub fn conversation_prompt(visitor: &AgentState, target: &AgentState) -> String {
    let mood = match visitor.friendship(target.id).map(|f| f.value()) {
        Some(score) if score >= 7 => "warmly",
        Some(score) if score <= 3 => "coldly",
        _ => "politely",
    };
    let mut prompt = format!(
        "You are {}, a villager. You {} greet your neighbour {}.",
        visitor.name, mood, target.name
    );
    if let Some(event) = target.oldest_event() {
        prompt.push_str(&format!(
            " You have heard that {}, and it would cost {} gold.",
            event.description, event.gold_required
        ));
    }
    prompt
}

/// Recent dialogue per agent pair, independent of who spoke first
#[derive(Debug, Default)]
pub struct DialogueHistory {
    lines: AHashMap<(AgentId, AgentId), VecDeque<String>>,
}

impl DialogueHistory {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(a: AgentId, b: AgentId) -> (AgentId, AgentId) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    pub fn record(&mut self, a: AgentId, b: AgentId, line: impl Into<String>) {
        let lines = self.lines.entry(Self::key(a, b)).or_default();
        lines.push_back(line.into());
        while lines.len() > HISTORY_LINES {
            lines.pop_front();
        }
    }

    /// Newline-joined transcript, if the pair has spoken before
    pub fn transcript(&self, a: AgentId, b: AgentId) -> Option<String> {
        let lines = self.lines.get(&Self::key(a, b))?;
        if lines.is_empty() {
            return None;
        }
        Some(lines.iter().cloned().collect::<Vec<_>>().join("\n"))
    }
}
