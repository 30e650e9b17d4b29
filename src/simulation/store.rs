//! Scheduler-owned registry of agents and their domain state
//!
//! Records are kept in registration order so iteration (and with it the whole
//! tick) is deterministic; an id index gives O(1) lookup.

use ahash::AHashMap;

use crate::core::error::{Result, SimError};
use crate::core::types::{AgentId, Vec2};
use crate::entity::agent::Agent;
use crate::entity::state::AgentState;

/// Movable agent plus its domain state
#[derive(Debug, Clone)]
pub struct AgentRecord {
    pub agent: Agent,
    pub state: AgentState,
}

#[derive(Debug, Default)]
pub struct AgentStore {
    records: Vec<AgentRecord>,
    index: AHashMap<AgentId, usize>,
    next_id: u32,
}

impl AgentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new agent standing on its home position
    pub fn insert(&mut self, name: String, home: Vec2, gold: u32, speed: f32) -> AgentId {
        let id = AgentId(self.next_id);
        self.next_id += 1;

        self.index.insert(id, self.records.len());
        self.records.push(AgentRecord {
            agent: Agent::new(id, home, speed),
            state: AgentState::new(id, name, home, gold),
        });
        id
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.index.contains_key(&id)
    }

    /// Ids in registration order
    pub fn ids(&self) -> Vec<AgentId> {
        self.records.iter().map(|r| r.state.id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgentRecord> {
        self.records.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut AgentRecord> {
        self.records.iter_mut()
    }

    fn slot(&self, id: AgentId) -> Result<usize> {
        self.index.get(&id).copied().ok_or(SimError::AgentNotFound(id))
    }

    pub fn record(&self, id: AgentId) -> Result<&AgentRecord> {
        let slot = self.slot(id)?;
        Ok(&self.records[slot])
    }

    pub(crate) fn record_mut(&mut self, id: AgentId) -> Result<&mut AgentRecord> {
        let slot = self.slot(id)?;
        Ok(&mut self.records[slot])
    }

    pub fn agent(&self, id: AgentId) -> Result<&Agent> {
        Ok(&self.record(id)?.agent)
    }

    pub fn state(&self, id: AgentId) -> Result<&AgentState> {
        Ok(&self.record(id)?.state)
    }

    pub(crate) fn agent_mut(&mut self, id: AgentId) -> Result<&mut Agent> {
        Ok(&mut self.record_mut(id)?.agent)
    }

    pub(crate) fn state_mut(&mut self, id: AgentId) -> Result<&mut AgentState> {
        Ok(&mut self.record_mut(id)?.state)
    }

    /// Mutable access to two distinct agents at once
    ///
    /// The only place two agents are mutated together is the end of a
    /// conversation; borrowing both here keeps that a single step.
    pub(crate) fn pair_mut(
        &mut self,
        first: AgentId,
        second: AgentId,
    ) -> Result<(&mut AgentRecord, &mut AgentRecord)> {
        if first == second {
            return Err(SimError::InvalidAction(format!(
                "{} cannot pair with itself",
                first
            )));
        }
        let a = self.slot(first)?;
        let b = self.slot(second)?;

        if a < b {
            let (low, high) = self.records.split_at_mut(b);
            Ok((&mut low[a], &mut high[0]))
        } else {
            let (low, high) = self.records.split_at_mut(a);
            Ok((&mut high[0], &mut low[b]))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(n: usize) -> AgentStore {
        let mut store = AgentStore::new();
        for i in 0..n {
            store.insert(format!("Agent_{}", i), Vec2::new(i as f32 * 32.0, 0.0), 100, 8.0);
        }
        store
    }

    #[test]
    fn test_insert_assigns_sequential_ids() {
        let store = store_with(3);
        assert_eq!(store.ids(), vec![AgentId(0), AgentId(1), AgentId(2)]);
        assert_eq!(store.state(AgentId(1)).unwrap().name, "Agent_1");
        assert_eq!(store.agent(AgentId(2)).unwrap().position(), Vec2::new(64.0, 0.0));
    }

    #[test]
    fn test_missing_agent_is_error() {
        let store = store_with(1);
        assert!(matches!(
            store.state(AgentId(9)),
            Err(SimError::AgentNotFound(AgentId(9)))
        ));
    }

    #[test]
    fn test_pair_mut_both_orders() {
        let mut store = store_with(3);

        let (a, b) = store.pair_mut(AgentId(2), AgentId(0)).unwrap();
        assert_eq!(a.state.id, AgentId(2));
        assert_eq!(b.state.id, AgentId(0));
        a.state.earn(5);
        b.state.earn(1);

        let (a, b) = store.pair_mut(AgentId(0), AgentId(2)).unwrap();
        assert_eq!(a.state.gold(), 101);
        assert_eq!(b.state.gold(), 105);
    }

    #[test]
    fn test_pair_mut_rejects_self() {
        let mut store = store_with(2);
        assert!(store.pair_mut(AgentId(1), AgentId(1)).is_err());
    }
}
