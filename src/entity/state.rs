//! Per-agent domain state: purse, current action, relationships, pending events

use std::collections::VecDeque;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::types::{AgentId, EventId, Vec2};

pub const FRIENDSHIP_MIN: u8 = 1;
pub const FRIENDSHIP_MAX: u8 = 10;
/// Score a relationship starts from before its first delta is applied
pub const FRIENDSHIP_INITIAL: u8 = 5;

/// One agent's disposition toward another, always within [1, 10]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Friendship(u8);

impl Friendship {
    pub fn new(score: i32) -> Self {
        Self(score.clamp(FRIENDSHIP_MIN as i32, FRIENDSHIP_MAX as i32) as u8)
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn apply(self, delta: i32) -> Self {
        Self::new(self.0 as i32 + delta)
    }
}

impl Default for Friendship {
    fn default() -> Self {
        Self(FRIENDSHIP_INITIAL)
    }
}

/// The action an agent is committed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentAction {
    Farm,
    Visit { target: AgentId },
    Accuse { target: AgentId },
}

impl AgentAction {
    pub fn is_visit(&self) -> bool {
        matches!(self, AgentAction::Visit { .. })
    }

    pub fn target(&self) -> Option<AgentId> {
        match self {
            AgentAction::Farm => None,
            AgentAction::Visit { target } | AgentAction::Accuse { target } => Some(*target),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgentAction::Farm => "farm",
            AgentAction::Visit { .. } => "visit",
            AgentAction::Accuse { .. } => "accuse",
        }
    }
}

/// An obligation on an agent that someone else can pay off
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingEvent {
    pub id: EventId,
    pub description: String,
    pub gold_required: u32,
}

/// Domain state of one agent
///
/// Fields are read through accessors; only the simulation module mutates them.
#[derive(Debug, Clone)]
pub struct AgentState {
    pub id: AgentId,
    pub name: String,
    gold: u32,
    home: Vec2,
    current_action: Option<AgentAction>,
    relationships: AHashMap<AgentId, Friendship>,
    events: VecDeque<PendingEvent>,
}

impl AgentState {
    pub fn new(id: AgentId, name: String, home: Vec2, gold: u32) -> Self {
        Self {
            id,
            name,
            gold,
            home,
            current_action: None,
            relationships: AHashMap::new(),
            events: VecDeque::new(),
        }
    }

    pub fn gold(&self) -> u32 {
        self.gold
    }

    pub fn home(&self) -> Vec2 {
        self.home
    }

    pub fn current_action(&self) -> Option<AgentAction> {
        self.current_action
    }

    pub fn friendship(&self, other: AgentId) -> Option<Friendship> {
        self.relationships.get(&other).copied()
    }

    /// Relationships sorted by agent id
    pub fn relationships(&self) -> Vec<(AgentId, Friendship)> {
        let mut all: Vec<_> = self.relationships.iter().map(|(id, f)| (*id, *f)).collect();
        all.sort_by_key(|(id, _)| *id);
        all
    }

    pub fn events(&self) -> impl Iterator<Item = &PendingEvent> {
        self.events.iter()
    }

    pub fn oldest_event(&self) -> Option<&PendingEvent> {
        self.events.front()
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub(crate) fn set_action(&mut self, action: Option<AgentAction>) {
        self.current_action = action;
    }

    pub(crate) fn earn(&mut self, amount: u32) {
        self.gold = self.gold.saturating_add(amount);
    }

    /// Deduct `amount` if affordable
    pub(crate) fn spend(&mut self, amount: u32) -> bool {
        if self.gold < amount {
            return false;
        }
        self.gold -= amount;
        true
    }

    pub(crate) fn push_event(&mut self, event: PendingEvent) {
        self.events.push_back(event);
    }

    pub(crate) fn remove_event(&mut self, id: EventId) -> Option<PendingEvent> {
        let index = self.events.iter().position(|e| e.id == id)?;
        self.events.remove(index)
    }

    /// Apply a friendship delta toward `other`, creating the entry at the
    /// initial score first if needed
    pub(crate) fn adjust_friendship(&mut self, other: AgentId, delta: i32) -> Friendship {
        let entry = self.relationships.entry(other).or_default();
        *entry = entry.apply(delta);
        *entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AgentState {
        AgentState::new(AgentId(1), "Ada".into(), Vec2::ZERO, 100)
    }

    #[test]
    fn test_friendship_clamps() {
        assert_eq!(Friendship::new(0).value(), 1);
        assert_eq!(Friendship::new(42).value(), 10);
        assert_eq!(Friendship::new(7).value(), 7);
        assert_eq!(Friendship::new(9).apply(5).value(), 10);
        assert_eq!(Friendship::new(2).apply(-3).value(), 1);
    }

    #[test]
    fn test_first_adjustment_starts_from_initial() {
        let mut s = state();
        assert_eq!(s.friendship(AgentId(2)), None);

        assert_eq!(s.adjust_friendship(AgentId(2), 2).value(), 7);
        assert_eq!(s.adjust_friendship(AgentId(3), -3).value(), 2);
        assert_eq!(s.adjust_friendship(AgentId(3), -3).value(), 1);
        assert_eq!(s.relationships().len(), 2);
    }

    #[test]
    fn test_spend_refuses_overdraft() {
        let mut s = state();
        assert!(!s.spend(101));
        assert_eq!(s.gold(), 100);
        assert!(s.spend(60));
        assert_eq!(s.gold(), 40);
    }

    #[test]
    fn test_events_fifo_and_removal() {
        let mut s = state();
        for (i, gold) in [12, 30, 55].into_iter().enumerate() {
            s.push_event(PendingEvent {
                id: EventId(i as u64),
                description: "needs help".into(),
                gold_required: gold,
            });
        }

        assert_eq!(s.oldest_event().map(|e| e.gold_required), Some(12));
        assert!(s.remove_event(EventId(1)).is_some());
        assert!(s.remove_event(EventId(1)).is_none());
        assert_eq!(s.event_count(), 2);
        assert_eq!(s.oldest_event().map(|e| e.id), Some(EventId(0)));
    }

    #[test]
    fn test_action_targets() {
        assert_eq!(AgentAction::Farm.target(), None);
        assert_eq!(AgentAction::Visit { target: AgentId(4) }.target(), Some(AgentId(4)));
        assert!(AgentAction::Visit { target: AgentId(4) }.is_visit());
        assert!(!AgentAction::Accuse { target: AgentId(4) }.is_visit());
        assert_eq!(AgentAction::Accuse { target: AgentId(4) }.label(), "accuse");
    }
}
