//! Scheduler - the per-tick entry point of the behavior engine
//!
//! Each tick:
//! movement update -> (per agent, in registration order) step task | start task -> tick + 1
//!
//! The scheduler owns every agent, every live behavior task and the only random
//! source, so a run is fully determined by its config and seed. At most one task
//! exists per agent at any time.

use ahash::{AHashMap, AHashSet};
use serde::Serialize;

use crate::core::config::SimulationConfig;
use crate::core::error::{Result, SimError};
use crate::core::types::{AgentId, Tick, Vec2};
use crate::entity::agent::{Agent, AgentView};
use crate::entity::state::{AgentAction, AgentState};
use crate::simulation::behavior::{
    select_visit_target, Behavior, BehaviorTask, FarmTask, TaskContext, TaskStatus, VisitTask,
};
use crate::simulation::events::{EventGenerator, SimEvent};
use crate::simulation::probability::{roll, seeded, SimRng};
use crate::simulation::store::AgentStore;
use crate::spatial::pathfinding::PathPlanner;
use crate::spatial::walkability::Walkability;
use crate::world::tilemap::TileMap;

/// Serializable end-of-run view of one agent
#[derive(Debug, Clone, Serialize)]
pub struct AgentSummary {
    pub id: AgentId,
    pub name: String,
    pub gold: u32,
    pub action: Option<AgentAction>,
    pub position: Vec2,
    pub friendships: Vec<(AgentId, u8)>,
    pub pending_events: usize,
}

impl AgentSummary {
    fn from_parts(agent: &Agent, state: &AgentState) -> Self {
        Self {
            id: state.id,
            name: state.name.clone(),
            gold: state.gold(),
            action: state.current_action(),
            position: agent.position(),
            friendships: state
                .relationships()
                .into_iter()
                .map(|(id, f)| (id, f.value()))
                .collect(),
            pending_events: state.event_count(),
        }
    }
}

pub struct Scheduler<W: Walkability = TileMap> {
    store: AgentStore,
    world: W,
    planner: PathPlanner,
    rng: SimRng,
    config: SimulationConfig,
    tick: Tick,
    tasks: AHashMap<AgentId, BehaviorTask>,
    /// When each agent's FARM last ran out of attempts
    stranded_at: AHashMap<AgentId, Tick>,
    /// Visit targets taken during the current tick, plus any assigned
    /// between ticks; emptied once the tick completes
    claimed: AHashSet<AgentId>,
    outbox: Vec<SimEvent>,
    generator: EventGenerator,
}

impl<W: Walkability> Scheduler<W> {
    pub fn new(config: SimulationConfig, world: W) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store: AgentStore::new(),
            world,
            planner: PathPlanner::new(),
            rng: seeded(config.seed),
            config,
            tick: 0,
            tasks: AHashMap::new(),
            stranded_at: AHashMap::new(),
            claimed: AHashSet::new(),
            outbox: Vec::new(),
            generator: EventGenerator::new(),
        })
    }

    /// Register an agent standing on its home position
    pub fn add_agent(&mut self, name: impl Into<String>, home: Vec2) -> AgentId {
        self.store.insert(
            name.into(),
            home,
            self.config.starting_gold,
            self.config.agent_speed,
        )
    }

    /// Register an agent whose home is elsewhere
    pub fn add_agent_at(&mut self, name: impl Into<String>, home: Vec2, position: Vec2) -> AgentId {
        let id = self.add_agent(name, home);
        if let Ok(agent) = self.store.agent_mut(id) {
            agent.place_at(position);
        }
        id
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn store(&self) -> &AgentStore {
        &self.store
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn agent(&self, id: AgentId) -> Result<&Agent> {
        self.store.agent(id)
    }

    pub fn state(&self, id: AgentId) -> Result<&AgentState> {
        self.store.state(id)
    }

    pub fn has_task(&self, id: AgentId) -> bool {
        self.tasks.contains_key(&id)
    }

    pub fn task_behavior(&self, id: AgentId) -> Option<Behavior> {
        self.tasks.get(&id).map(BehaviorTask::behavior)
    }

    pub fn active_task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Render snapshot of every agent, in registration order
    pub fn views(&self) -> Vec<AgentView> {
        self.store.iter().map(|r| r.agent.view()).collect()
    }

    pub fn summaries(&self) -> Vec<AgentSummary> {
        self.store
            .iter()
            .map(|r| AgentSummary::from_parts(&r.agent, &r.state))
            .collect()
    }

    /// Take every event emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Advance the simulation by one tick
    pub fn run_tick(&mut self) {
        for record in self.store.iter_mut() {
            record.agent.update();
        }

        for id in self.store.ids() {
            if self.tasks.contains_key(&id) {
                self.drive(id);
            } else {
                self.consider_idle(id);
            }
        }

        self.claimed.clear();
        self.tick += 1;
    }

    pub fn run_ticks(&mut self, count: u64) {
        for _ in 0..count {
            self.run_tick();
        }
    }

    /// Force a behavior on an agent that has no running task
    pub fn assign(&mut self, agent: AgentId, behavior: Behavior) -> Result<()> {
        self.check_assignable(agent)?;
        self.start(agent, behavior);
        Ok(())
    }

    /// Send `visitor` after a specific `target`
    pub fn assign_visit(&mut self, visitor: AgentId, target: AgentId) -> Result<()> {
        self.check_assignable(visitor)?;
        if visitor == target {
            return Err(SimError::InvalidAction(format!(
                "{} cannot visit itself",
                visitor
            )));
        }
        if !self.store.contains(target) {
            return Err(SimError::AgentNotFound(target));
        }
        self.claimed.insert(target);
        self.launch(BehaviorTask::Visit(VisitTask::new(visitor, target)));
        Ok(())
    }

    fn check_assignable(&self, agent: AgentId) -> Result<()> {
        let record = self.store.record(agent)?;
        if self.tasks.contains_key(&agent) {
            return Err(SimError::InvalidAction(format!(
                "{} already has a running task",
                agent
            )));
        }
        if record.agent.is_busy_state() {
            return Err(SimError::InvalidAction(format!("{} is busy", agent)));
        }
        Ok(())
    }

    /// An agent without a task: maybe raise an event, then pick a behavior
    fn consider_idle(&mut self, id: AgentId) {
        let Ok(record) = self.store.record(id) else {
            return;
        };
        if record.agent.is_busy_state() {
            return;
        }
        let action = record.state.current_action();

        match action {
            None => {
                match self
                    .generator
                    .maybe_raise(&mut self.store, id, &mut self.rng, &self.config)
                {
                    Ok(Some(event)) => self.outbox.push(event),
                    Ok(None) => {}
                    Err(err) => tracing::warn!(agent = %id, error = %err, "event generation failed"),
                }

                let behavior = if roll(&mut self.rng, self.config.probabilities.visit_chance) {
                    Behavior::Visit
                } else {
                    Behavior::Farm
                };
                self.start(id, behavior);
            }
            Some(AgentAction::Farm) => {
                let since = *self.stranded_at.entry(id).or_insert(self.tick);
                if self.tick >= since + self.config.stranded_retry_ticks {
                    tracing::debug!(agent = %id, "retrying stranded farm");
                    self.start(id, Behavior::Farm);
                }
            }
            Some(action) => {
                // Only a task sets Visit/Accuse; without one the action is orphaned
                tracing::warn!(agent = %id, action = action.label(), "clearing orphaned action");
                if let Ok(state) = self.store.state_mut(id) {
                    state.set_action(None);
                }
                self.outbox.push(SimEvent::ActionCleared { agent: id });
            }
        }
    }

    fn start(&mut self, id: AgentId, behavior: Behavior) {
        let task = match behavior {
            Behavior::Farm => BehaviorTask::Farm(FarmTask::new(id)),
            Behavior::Visit => {
                match select_visit_target(&self.store, id, &self.claimed, &mut self.rng) {
                    Some(target) => {
                        self.claimed.insert(target);
                        BehaviorTask::Visit(VisitTask::new(id, target))
                    }
                    None => {
                        tracing::debug!(agent = %id, "nobody to visit, farming instead");
                        self.outbox.push(SimEvent::NoVisitTarget { agent: id });
                        BehaviorTask::Farm(FarmTask::new(id))
                    }
                }
            }
        };
        self.launch(task);
    }

    /// Register a task and give it its first step right away
    fn launch(&mut self, task: BehaviorTask) {
        let id = task.agent();
        self.outbox.push(SimEvent::BehaviorStarted {
            agent: id,
            behavior: task.behavior(),
        });
        self.stranded_at.remove(&id);
        self.tasks.insert(id, task);
        self.drive(id);
    }

    fn drive(&mut self, id: AgentId) {
        let Some(mut task) = self.tasks.remove(&id) else {
            return;
        };

        let mut ctx = TaskContext {
            store: &mut self.store,
            planner: &mut self.planner,
            world: &self.world,
            rng: &mut self.rng,
            config: &self.config,
            tick: self.tick,
            events: &mut self.outbox,
        };

        match task.step(&mut ctx) {
            Ok(TaskStatus::Pending) => {
                self.tasks.insert(id, task);
            }
            Ok(TaskStatus::Done) => {
                let stranded = self
                    .store
                    .state(id)
                    .is_ok_and(|s| s.current_action() == Some(AgentAction::Farm));
                if stranded {
                    self.stranded_at.insert(id, self.tick);
                }
            }
            Err(err) => self.fault(id, task, err),
        }
    }

    /// Contain a failed task: release what it held and free the agent
    fn fault(&mut self, id: AgentId, mut task: BehaviorTask, err: SimError) {
        tracing::warn!(
            agent = %id,
            behavior = ?task.behavior(),
            error = %err,
            "behavior task faulted"
        );
        task.abort(&mut self.store);
        if let Ok(state) = self.store.state_mut(id) {
            state.set_action(None);
        }
        self.outbox.push(SimEvent::TaskFault {
            agent: id,
            reason: err.to_string(),
        });
    }
}
