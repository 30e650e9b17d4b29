//! Behavior tasks: long-running FARM and VISIT routines
//!
//! Each task is an explicit state machine advanced once per tick by the
//! scheduler. Every wait (walking, farming, talking, backing off) is a phase the
//! task sits in until its condition holds, returning `TaskStatus::Pending` in
//! the meantime; nothing ever sleeps.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::core::config::SimulationConfig;
use crate::core::error::Result;
use crate::core::types::{AgentId, Tick, Vec2};
use crate::entity::agent::MoveTag;
use crate::entity::state::AgentAction;
use crate::simulation::events::SimEvent;
use crate::simulation::outcome::{resolve_visit, VisitOutcome};
use crate::simulation::probability::{amount_in, pick, SimRng};
use crate::simulation::store::AgentStore;
use crate::spatial::pathfinding::PathPlanner;
use crate::spatial::walkability::Walkability;

/// Routine the scheduler can hand to an idle agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Behavior {
    Farm,
    Visit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Waiting on something; step again next tick
    Pending,
    /// Finished; the task can be dropped
    Done,
}

/// Everything a task may touch during one step
pub struct TaskContext<'a> {
    pub store: &'a mut AgentStore,
    pub planner: &'a mut PathPlanner,
    pub world: &'a dyn Walkability,
    pub rng: &'a mut SimRng,
    pub config: &'a SimulationConfig,
    pub tick: Tick,
    pub events: &'a mut Vec<SimEvent>,
}

impl TaskContext<'_> {
    fn move_agent(&mut self, id: AgentId, target: Vec2, tag: MoveTag) -> Result<bool> {
        let agent = self.store.agent_mut(id)?;
        Ok(agent.move_to(self.planner, self.world, target, tag))
    }

    fn distance(&self, a: AgentId, b: AgentId) -> Result<f32> {
        let pa = self.store.agent(a)?.position();
        let pb = self.store.agent(b)?.position();
        Ok(pa.distance(pb))
    }

    fn clear_action(&mut self, id: AgentId) -> Result<()> {
        self.store.state_mut(id)?.set_action(None);
        self.events.push(SimEvent::ActionCleared { agent: id });
        Ok(())
    }
}

/// Pick someone to visit: any other agent not already on a visit and not
/// claimed by another visitor this tick
pub fn select_visit_target(
    store: &AgentStore,
    visitor: AgentId,
    claimed: &AHashSet<AgentId>,
    rng: &mut SimRng,
) -> Option<AgentId> {
    let candidates: Vec<AgentId> = store
        .iter()
        .filter(|r| r.state.id != visitor)
        .filter(|r| !r.state.current_action().is_some_and(|a| a.is_visit()))
        .filter(|r| !claimed.contains(&r.state.id))
        .map(|r| r.state.id)
        .collect();
    pick(rng, &candidates).copied()
}

// ============================================================================
// FARM
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum FarmPhase {
    Start,
    /// Walking home; the attempt fails at `deadline` or if the route runs out
    Travel { attempt: u32, deadline: Tick },
    /// Pausing before the next attempt
    Backoff { attempt: u32, resume_at: Tick },
    Farming { until: Tick },
}

/// Walk home, farm for a while, pocket the harvest
///
/// Resumable: the FARM action is set before any movement, and when every
/// attempt to get home fails the action is left pending so the scheduler can
/// start a fresh task for it later.
#[derive(Debug, Clone)]
pub struct FarmTask {
    agent: AgentId,
    phase: FarmPhase,
    holding_busy: bool,
}

impl FarmTask {
    pub fn new(agent: AgentId) -> Self {
        Self {
            agent,
            phase: FarmPhase::Start,
            holding_busy: false,
        }
    }

    pub fn agent(&self) -> AgentId {
        self.agent
    }

    fn near_home(&self, ctx: &TaskContext) -> Result<bool> {
        let record = ctx.store.record(self.agent)?;
        let distance = record.agent.position().distance(record.state.home());
        Ok(distance <= ctx.world.tile_size())
    }

    pub fn step(&mut self, ctx: &mut TaskContext) -> Result<TaskStatus> {
        match self.phase {
            FarmPhase::Start => {
                ctx.store.state_mut(self.agent)?.set_action(Some(AgentAction::Farm));
                if self.near_home(ctx)? {
                    self.begin_farming(ctx)?;
                } else {
                    tracing::debug!(agent = %self.agent, "returning to farm");
                    self.begin_attempt(ctx, 1)?;
                }
                Ok(TaskStatus::Pending)
            }
            FarmPhase::Travel { attempt, deadline } => {
                if self.near_home(ctx)? {
                    self.begin_farming(ctx)?;
                    return Ok(TaskStatus::Pending);
                }
                let route_spent = ctx.store.agent(self.agent)?.is_at_target();
                if route_spent || ctx.tick >= deadline {
                    return self.fail_attempt(ctx, attempt);
                }
                Ok(TaskStatus::Pending)
            }
            FarmPhase::Backoff { attempt, resume_at } => {
                if ctx.tick >= resume_at {
                    self.begin_attempt(ctx, attempt)?;
                }
                Ok(TaskStatus::Pending)
            }
            FarmPhase::Farming { until } => {
                if ctx.tick < until {
                    return Ok(TaskStatus::Pending);
                }
                self.harvest(ctx)?;
                Ok(TaskStatus::Done)
            }
        }
    }

    fn begin_attempt(&mut self, ctx: &mut TaskContext, attempt: u32) -> Result<()> {
        let home = ctx.store.state(self.agent)?.home();
        ctx.move_agent(self.agent, home, MoveTag::Farm)?;
        self.phase = FarmPhase::Travel {
            attempt,
            deadline: ctx.tick + ctx.config.farm_arrival_timeout_ticks,
        };
        Ok(())
    }

    fn fail_attempt(&mut self, ctx: &mut TaskContext, attempt: u32) -> Result<TaskStatus> {
        ctx.events.push(SimEvent::FarmAttemptFailed {
            agent: self.agent,
            attempt,
        });

        if attempt >= ctx.config.farm_max_attempts {
            tracing::warn!(
                agent = %self.agent,
                attempts = attempt,
                "could not reach farm; leaving FARM pending"
            );
            ctx.events.push(SimEvent::FarmStranded { agent: self.agent });
            return Ok(TaskStatus::Done);
        }

        tracing::debug!(agent = %self.agent, attempt, "farm attempt failed, backing off");
        self.phase = FarmPhase::Backoff {
            attempt: attempt + 1,
            resume_at: ctx.tick + ctx.config.farm_retry_backoff_ticks,
        };
        Ok(TaskStatus::Pending)
    }

    fn begin_farming(&mut self, ctx: &mut TaskContext) -> Result<()> {
        ctx.store.agent_mut(self.agent)?.set_busy();
        self.holding_busy = true;
        self.phase = FarmPhase::Farming {
            until: ctx.tick + ctx.config.farming_ticks,
        };
        tracing::debug!("{} is farming", ctx.store.state(self.agent)?.name);
        ctx.events.push(SimEvent::FarmingStarted { agent: self.agent });
        Ok(())
    }

    fn harvest(&mut self, ctx: &mut TaskContext) -> Result<()> {
        ctx.store.agent_mut(self.agent)?.release_busy();
        self.holding_busy = false;

        let gold = amount_in(ctx.rng, ctx.config.farm_gold_min, ctx.config.farm_gold_max);
        let state = ctx.store.state_mut(self.agent)?;
        state.earn(gold);
        tracing::info!("{} earned {} gold from farming", state.name, gold);

        ctx.events.push(SimEvent::FarmHarvested {
            agent: self.agent,
            gold,
        });
        ctx.clear_action(self.agent)
    }

    /// Release whatever the task holds on the agent
    pub fn abort(&mut self, store: &mut AgentStore) {
        if self.holding_busy {
            if let Ok(agent) = store.agent_mut(self.agent) {
                agent.release_busy();
            }
            self.holding_busy = false;
        }
    }
}

// ============================================================================
// VISIT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum VisitPhase {
    Start,
    /// Following a route planned toward where the target stood at `planned_for`
    Chase { attempt: u32, planned_for: Vec2 },
    Conversing { until: Tick },
    /// Outcome stays on display; the visitor is free again and finishes
    /// whatever is left of its chase route
    Linger { until: Tick },
    ReturnHome { deadline: Tick },
}

/// Chase another agent, talk, then settle the outcome
#[derive(Debug, Clone)]
pub struct VisitTask {
    agent: AgentId,
    target: AgentId,
    phase: VisitPhase,
    holding_conversation: bool,
}

impl VisitTask {
    pub fn new(agent: AgentId, target: AgentId) -> Self {
        Self {
            agent,
            target,
            phase: VisitPhase::Start,
            holding_conversation: false,
        }
    }

    pub fn agent(&self) -> AgentId {
        self.agent
    }

    pub fn target(&self) -> AgentId {
        self.target
    }

    pub fn step(&mut self, ctx: &mut TaskContext) -> Result<TaskStatus> {
        match self.phase {
            VisitPhase::Start => {
                let target_name = ctx.store.state(self.target)?.name.clone();
                let state = ctx.store.state_mut(self.agent)?;
                state.set_action(Some(AgentAction::Visit {
                    target: self.target,
                }));
                tracing::info!("{} is visiting {}", state.name, target_name);

                ctx.events.push(SimEvent::VisitStarted {
                    visitor: self.agent,
                    target: self.target,
                });
                self.begin_chase(ctx, 1)?;
                Ok(TaskStatus::Pending)
            }
            VisitPhase::Chase {
                attempt,
                planned_for,
            } => {
                if ctx.distance(self.agent, self.target)? <= ctx.config.visit_range() {
                    self.begin_conversation(ctx)?;
                    return Ok(TaskStatus::Pending);
                }

                let live = ctx.store.agent(self.target)?.position();
                let tile = ctx.world.tile_size();
                let target_moved =
                    (planned_for.x - live.x).abs() > tile || (planned_for.y - live.y).abs() > tile;
                let route_spent = ctx.store.agent(self.agent)?.is_at_target();

                if !(target_moved || route_spent) {
                    return Ok(TaskStatus::Pending);
                }
                if attempt >= ctx.config.visit_max_attempts {
                    return self.abandon(ctx);
                }
                self.begin_chase(ctx, attempt + 1)?;
                Ok(TaskStatus::Pending)
            }
            VisitPhase::Conversing { until } => {
                if ctx.tick < until {
                    return Ok(TaskStatus::Pending);
                }
                let outcome = self.finish_conversation(ctx)?;
                let lingers = !matches!(outcome, VisitOutcome::Nothing);
                if lingers && ctx.config.outcome_linger_ticks > 0 {
                    self.phase = VisitPhase::Linger {
                        until: ctx.tick + ctx.config.outcome_linger_ticks,
                    };
                    return Ok(TaskStatus::Pending);
                }
                self.head_home(ctx)
            }
            VisitPhase::Linger { until } => {
                if ctx.tick < until {
                    return Ok(TaskStatus::Pending);
                }
                self.head_home(ctx)
            }
            VisitPhase::ReturnHome { deadline } => {
                let arrived = ctx.store.agent(self.agent)?.is_at_target();
                if arrived || ctx.tick >= deadline {
                    ctx.clear_action(self.agent)?;
                    return Ok(TaskStatus::Done);
                }
                Ok(TaskStatus::Pending)
            }
        }
    }

    /// Start an attempt: catch up immediately if already close, otherwise plan
    /// a route to where the target stands right now
    fn begin_chase(&mut self, ctx: &mut TaskContext, attempt: u32) -> Result<()> {
        if ctx.distance(self.agent, self.target)? <= ctx.config.visit_range() {
            return self.begin_conversation(ctx);
        }

        let live = ctx.store.agent(self.target)?.position();
        ctx.move_agent(self.agent, live, MoveTag::Visit)?;
        tracing::debug!(visitor = %self.agent, target = %self.target, attempt, "chasing");
        self.phase = VisitPhase::Chase {
            attempt,
            planned_for: live,
        };
        Ok(())
    }

    fn abandon(&mut self, ctx: &mut TaskContext) -> Result<TaskStatus> {
        tracing::info!(
            "{} couldn't catch up with {}",
            ctx.store.state(self.agent)?.name,
            ctx.store.state(self.target)?.name
        );
        ctx.events.push(SimEvent::VisitAbandoned {
            visitor: self.agent,
            target: self.target,
        });
        ctx.clear_action(self.agent)?;
        Ok(TaskStatus::Done)
    }

    fn begin_conversation(&mut self, ctx: &mut TaskContext) -> Result<()> {
        let (visitor, target) = ctx.store.pair_mut(self.agent, self.target)?;
        visitor.agent.start_conversation();
        target.agent.start_conversation();
        self.holding_conversation = true;

        tracing::info!("{} is talking with {}", visitor.state.name, target.state.name);
        ctx.events.push(SimEvent::ConversationStarted {
            visitor: self.agent,
            target: self.target,
        });
        self.phase = VisitPhase::Conversing {
            until: ctx.tick + ctx.config.conversation_ticks,
        };
        Ok(())
    }

    /// Both participants leave the conversation and the outcome is applied in
    /// the same step
    fn finish_conversation(&mut self, ctx: &mut TaskContext) -> Result<VisitOutcome> {
        let (visitor, target) = ctx.store.pair_mut(self.agent, self.target)?;
        visitor.agent.end_conversation();
        target.agent.end_conversation();
        self.holding_conversation = false;

        let outcome = resolve_visit(
            ctx.store,
            self.agent,
            self.target,
            ctx.rng,
            &ctx.config.probabilities,
        )?;
        ctx.events.push(SimEvent::VisitResolved {
            visitor: self.agent,
            target: self.target,
            outcome: outcome.clone(),
        });
        Ok(outcome)
    }

    fn head_home(&mut self, ctx: &mut TaskContext) -> Result<TaskStatus> {
        if !ctx.config.return_home_after_visit {
            ctx.clear_action(self.agent)?;
            return Ok(TaskStatus::Done);
        }

        let home = ctx.store.state(self.agent)?.home();
        ctx.move_agent(self.agent, home, MoveTag::Home)?;
        self.phase = VisitPhase::ReturnHome {
            deadline: ctx.tick + ctx.config.return_home_timeout_ticks,
        };
        Ok(TaskStatus::Pending)
    }

    /// Release whatever the task holds on either participant
    pub fn abort(&mut self, store: &mut AgentStore) {
        if !self.holding_conversation {
            return;
        }
        for id in [self.agent, self.target] {
            if let Ok(agent) = store.agent_mut(id) {
                agent.end_conversation();
            }
        }
        self.holding_conversation = false;
    }
}

// ============================================================================
// Task wrapper
// ============================================================================

#[derive(Debug, Clone)]
pub enum BehaviorTask {
    Farm(FarmTask),
    Visit(VisitTask),
}

impl BehaviorTask {
    pub fn agent(&self) -> AgentId {
        match self {
            BehaviorTask::Farm(task) => task.agent(),
            BehaviorTask::Visit(task) => task.agent(),
        }
    }

    pub fn behavior(&self) -> Behavior {
        match self {
            BehaviorTask::Farm(_) => Behavior::Farm,
            BehaviorTask::Visit(_) => Behavior::Visit,
        }
    }

    pub fn step(&mut self, ctx: &mut TaskContext) -> Result<TaskStatus> {
        match self {
            BehaviorTask::Farm(task) => task.step(ctx),
            BehaviorTask::Visit(task) => task.step(ctx),
        }
    }

    pub fn abort(&mut self, store: &mut AgentStore) {
        match self {
            BehaviorTask::Farm(task) => task.abort(store),
            BehaviorTask::Visit(task) => task.abort(store),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::agent::MovementState;
    use crate::simulation::probability::seeded;
    use crate::world::tilemap::TileMap;

    const TILE: f32 = 32.0;

    fn center(x: i32, y: i32) -> Vec2 {
        Vec2::new((x as f32 + 0.5) * TILE, (y as f32 + 0.5) * TILE)
    }

    struct Harness {
        store: AgentStore,
        planner: PathPlanner,
        map: TileMap,
        rng: SimRng,
        config: SimulationConfig,
        tick: Tick,
        events: Vec<SimEvent>,
    }

    impl Harness {
        fn new(map: TileMap) -> Self {
            let config = SimulationConfig {
                farming_ticks: 5,
                conversation_ticks: 3,
                outcome_linger_ticks: 2,
                farm_retry_backoff_ticks: 2,
                ..Default::default()
            };
            Self {
                store: AgentStore::new(),
                planner: PathPlanner::new(),
                map,
                rng: seeded(11),
                config,
                tick: 0,
                events: Vec::new(),
            }
        }

        fn add(&mut self, name: &str, home: Vec2) -> AgentId {
            self.store.insert(name.into(), home, 100, 8.0)
        }

        /// Move every agent one tick, then step the task
        fn tick(&mut self, task: &mut BehaviorTask) -> TaskStatus {
            for record in self.store.iter_mut() {
                record.agent.update();
            }
            let status = {
                let mut ctx = TaskContext {
                    store: &mut self.store,
                    planner: &mut self.planner,
                    world: &self.map,
                    rng: &mut self.rng,
                    config: &self.config,
                    tick: self.tick,
                    events: &mut self.events,
                };
                task.step(&mut ctx).unwrap()
            };
            self.tick += 1;
            status
        }

        /// Send an agent walking somewhere on its own
        fn walk(&mut self, id: AgentId, to: Vec2) {
            let agent = self.store.agent_mut(id).unwrap();
            assert!(agent.move_to(&mut self.planner, &self.map, to, MoveTag::Home));
        }

        /// Run until done, returning the highest chase attempt reached
        fn run_chase(&mut self, task: &mut BehaviorTask, max_ticks: usize) -> u32 {
            let mut highest = 0;
            for _ in 0..max_ticks {
                let status = self.tick(task);
                if let BehaviorTask::Visit(VisitTask {
                    phase: VisitPhase::Chase { attempt, .. },
                    ..
                }) = task
                {
                    highest = highest.max(*attempt);
                }
                if status == TaskStatus::Done {
                    return highest;
                }
            }
            panic!("visit did not finish in {} ticks", max_ticks);
        }

        fn run(&mut self, task: &mut BehaviorTask, max_ticks: usize) -> usize {
            for n in 0..max_ticks {
                if self.tick(task) == TaskStatus::Done {
                    return n + 1;
                }
            }
            panic!("task did not finish in {} ticks", max_ticks);
        }
    }

    #[test]
    fn test_farm_at_home_skips_movement() {
        let mut h = Harness::new(TileMap::new(10, 10, TILE));
        let id = h.add("Ada", center(2, 2));
        let mut task = BehaviorTask::Farm(FarmTask::new(id));

        h.tick(&mut task);
        assert_eq!(h.store.state(id).unwrap().current_action(), Some(AgentAction::Farm));
        assert_eq!(h.store.agent(id).unwrap().movement_state(), MovementState::Busy);

        h.run(&mut task, 20);
        let state = h.store.state(id).unwrap();
        assert_eq!(state.current_action(), None);
        assert!((105..=124).contains(&state.gold()));
        assert_eq!(h.store.agent(id).unwrap().movement_state(), MovementState::Idle);
    }

    #[test]
    fn test_farm_walks_home_first() {
        let mut h = Harness::new(TileMap::new(10, 10, TILE));
        let id = h.add("Ada", center(8, 8));
        h.store.agent_mut(id).unwrap().place_at(center(1, 1));
        let mut task = BehaviorTask::Farm(FarmTask::new(id));

        h.run(&mut task, 200);

        assert!(h.events.contains(&SimEvent::FarmingStarted { agent: id }));
        let position = h.store.agent(id).unwrap().position();
        assert!(position.distance(center(8, 8)) <= TILE);
        assert_eq!(h.store.state(id).unwrap().current_action(), None);
    }

    #[test]
    fn test_farm_strands_when_home_unreachable() {
        let mut map = TileMap::new(10, 10, TILE);
        for y in 0..10 {
            map.block(5, y);
        }
        let mut h = Harness::new(map);
        let id = h.add("Ada", center(8, 8));
        h.store.agent_mut(id).unwrap().place_at(center(1, 1));
        let mut task = BehaviorTask::Farm(FarmTask::new(id));

        h.run(&mut task, 100);

        let failures = h
            .events
            .iter()
            .filter(|e| matches!(e, SimEvent::FarmAttemptFailed { .. }))
            .count();
        assert_eq!(failures, 3);
        assert!(h.events.contains(&SimEvent::FarmStranded { agent: id }));
        assert_eq!(h.store.state(id).unwrap().current_action(), Some(AgentAction::Farm));
        assert_eq!(h.store.state(id).unwrap().gold(), 100);
    }

    #[test]
    fn test_farm_attempt_times_out() {
        let mut h = Harness::new(TileMap::new(30, 1, TILE));
        h.config.farm_arrival_timeout_ticks = 5;
        h.config.farm_max_attempts = 1;
        let id = h.add("Ada", center(29, 0));
        h.store.agent_mut(id).unwrap().place_at(center(0, 0));
        let mut task = BehaviorTask::Farm(FarmTask::new(id));

        let ticks = h.run(&mut task, 50);
        assert!(ticks <= 7);
        assert!(h.events.contains(&SimEvent::FarmStranded { agent: id }));
    }

    #[test]
    fn test_visit_converses_and_returns_home() {
        let mut h = Harness::new(TileMap::new(12, 12, TILE));
        h.config.probabilities.help_chance = 0.0;
        h.config.probabilities.accuse_chance = 0.0;
        let visitor = h.add("Ada", center(0, 0));
        let target = h.add("Bo", center(9, 0));
        let mut task = BehaviorTask::Visit(VisitTask::new(visitor, target));

        h.tick(&mut task);
        assert_eq!(
            h.store.state(visitor).unwrap().current_action(),
            Some(AgentAction::Visit { target })
        );

        h.run(&mut task, 400);

        assert!(h.events.contains(&SimEvent::ConversationStarted { visitor, target }));
        assert!(h.events.contains(&SimEvent::VisitResolved {
            visitor,
            target,
            outcome: VisitOutcome::Nothing,
        }));
        assert_eq!(h.store.state(visitor).unwrap().current_action(), None);
        assert_eq!(h.store.agent(visitor).unwrap().position(), center(0, 0));
        assert_eq!(h.store.agent(target).unwrap().movement_state(), MovementState::Idle);
    }

    #[test]
    fn test_both_participants_converse_together() {
        let mut h = Harness::new(TileMap::new(12, 12, TILE));
        let visitor = h.add("Ada", center(0, 0));
        let target = h.add("Bo", center(1, 0));
        let mut task = BehaviorTask::Visit(VisitTask::new(visitor, target));

        // Already within range: conversation starts on the first step
        h.tick(&mut task);
        assert_eq!(h.store.agent(visitor).unwrap().movement_state(), MovementState::Conversing);
        assert_eq!(h.store.agent(target).unwrap().movement_state(), MovementState::Conversing);

        h.tick(&mut task);
        h.tick(&mut task);
        h.tick(&mut task);
        assert!(!h.store.agent(visitor).unwrap().is_busy_state());
        assert!(!h.store.agent(target).unwrap().is_busy_state());
    }

    #[test]
    fn test_visit_abandons_unreachable_target() {
        let mut map = TileMap::new(10, 10, TILE);
        for y in 0..10 {
            map.block(5, y);
        }
        let mut h = Harness::new(map);
        let visitor = h.add("Ada", center(0, 0));
        let target = h.add("Bo", center(9, 9));
        let mut task = BehaviorTask::Visit(VisitTask::new(visitor, target));

        h.run(&mut task, 20);

        assert!(h.events.contains(&SimEvent::VisitAbandoned { visitor, target }));
        assert!(!h
            .events
            .iter()
            .any(|e| matches!(e, SimEvent::ConversationStarted { .. })));
        assert_eq!(h.store.state(visitor).unwrap().current_action(), None);
    }

    #[test]
    fn test_visit_gives_up_on_fleeing_target() {
        let mut h = Harness::new(TileMap::new(60, 3, TILE));
        let visitor = h.add("Ada", center(0, 1));
        let target = h.add("Bo", center(4, 1));
        h.walk(target, center(59, 1));
        let mut task = BehaviorTask::Visit(VisitTask::new(visitor, target));

        let attempts = h.run_chase(&mut task, 200);

        assert_eq!(attempts, h.config.visit_max_attempts);
        assert!(h.events.contains(&SimEvent::VisitAbandoned { visitor, target }));
        assert!(!h
            .events
            .iter()
            .any(|e| matches!(e, SimEvent::ConversationStarted { .. })));
        assert_eq!(h.store.state(visitor).unwrap().current_action(), None);
    }

    #[test]
    fn test_visit_replans_then_catches_settled_target() {
        let mut h = Harness::new(TileMap::new(30, 3, TILE));
        h.config.probabilities.help_chance = 0.0;
        h.config.probabilities.accuse_chance = 0.0;
        let visitor = h.add("Ada", center(0, 1));
        let target = h.add("Bo", center(10, 1));
        h.walk(target, center(13, 1));
        let mut task = BehaviorTask::Visit(VisitTask::new(visitor, target));

        let attempts = h.run_chase(&mut task, 400);

        assert!(attempts >= 2, "target moved but no replan happened");
        assert!(attempts <= h.config.visit_max_attempts);
        assert!(h.events.contains(&SimEvent::ConversationStarted { visitor, target }));
        assert!(!h
            .events
            .iter()
            .any(|e| matches!(e, SimEvent::VisitAbandoned { .. })));
        assert_eq!(h.store.state(visitor).unwrap().current_action(), None);
    }

    #[test]
    fn test_accusation_visible_while_lingering() {
        let mut h = Harness::new(TileMap::new(12, 12, TILE));
        h.config.probabilities.help_chance = 0.0;
        h.config.probabilities.accuse_chance = 1.0;
        let visitor = h.add("Ada", center(0, 0));
        let target = h.add("Bo", center(1, 0));
        let mut task = BehaviorTask::Visit(VisitTask::new(visitor, target));

        // Start + three conversation ticks
        for _ in 0..4 {
            h.tick(&mut task);
        }
        assert_eq!(
            h.store.state(visitor).unwrap().current_action(),
            Some(AgentAction::Accuse { target })
        );
        assert_eq!(
            h.store.state(visitor).unwrap().friendship(target).map(|f| f.value()),
            Some(2)
        );
        // Lingering does not hold either participant in place
        assert!(!h.store.agent(visitor).unwrap().is_busy_state());
        assert!(!h.store.agent(target).unwrap().is_busy_state());

        h.run(&mut task, 50);
        assert_eq!(h.store.state(visitor).unwrap().current_action(), None);
    }

    #[test]
    fn test_visit_to_missing_target_errors() {
        let mut h = Harness::new(TileMap::new(5, 5, TILE));
        let visitor = h.add("Ada", center(0, 0));
        let mut task = BehaviorTask::Visit(VisitTask::new(visitor, AgentId(42)));

        let mut ctx = TaskContext {
            store: &mut h.store,
            planner: &mut h.planner,
            world: &h.map,
            rng: &mut h.rng,
            config: &h.config,
            tick: 0,
            events: &mut h.events,
        };
        assert!(task.step(&mut ctx).is_err());
    }

    #[test]
    fn test_abort_releases_conversation() {
        let mut h = Harness::new(TileMap::new(5, 5, TILE));
        let visitor = h.add("Ada", center(0, 0));
        let target = h.add("Bo", center(1, 0));
        let mut task = BehaviorTask::Visit(VisitTask::new(visitor, target));

        h.tick(&mut task);
        assert!(h.store.agent(target).unwrap().is_busy_state());

        task.abort(&mut h.store);
        assert!(!h.store.agent(visitor).unwrap().is_busy_state());
        assert!(!h.store.agent(target).unwrap().is_busy_state());
    }

    #[test]
    fn test_select_visit_target_skips_visitors_and_claimed() {
        let mut store = AgentStore::new();
        let a = store.insert("A".into(), Vec2::ZERO, 100, 8.0);
        let b = store.insert("B".into(), Vec2::ZERO, 100, 8.0);
        let c = store.insert("C".into(), Vec2::ZERO, 100, 8.0);
        let d = store.insert("D".into(), Vec2::ZERO, 100, 8.0);
        store
            .state_mut(b)
            .unwrap()
            .set_action(Some(AgentAction::Visit { target: d }));
        let mut claimed = AHashSet::new();
        claimed.insert(c);

        let mut rng = seeded(3);
        for _ in 0..20 {
            assert_eq!(select_visit_target(&store, a, &claimed, &mut rng), Some(d));
        }

        claimed.insert(d);
        assert_eq!(select_visit_target(&store, a, &claimed, &mut rng), None);
    }
}
