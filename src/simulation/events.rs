//! Simulation events: the outbox the scheduler fills each tick, and the random
//! generator that raises pending events on agents.

use serde::Serialize;

use crate::core::config::SimulationConfig;
use crate::core::error::Result;
use crate::core::types::{AgentId, EventId};
use crate::entity::state::PendingEvent;
use crate::simulation::behavior::Behavior;
use crate::simulation::outcome::VisitOutcome;
use crate::simulation::probability::{amount_in, pick, roll, SimRng};
use crate::simulation::store::AgentStore;

/// Observable transitions, drained with `Scheduler::drain_events`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SimEvent {
    /// A pending event was raised on `agent`
    EventRaised {
        agent: AgentId,
        event: EventId,
        gold_required: u32,
    },
    BehaviorStarted {
        agent: AgentId,
        behavior: Behavior,
    },
    /// VISIT found nobody to visit and fell back to FARM
    NoVisitTarget {
        agent: AgentId,
    },
    FarmingStarted {
        agent: AgentId,
    },
    FarmAttemptFailed {
        agent: AgentId,
        attempt: u32,
    },
    /// Every attempt to walk home failed; the FARM action stays pending
    FarmStranded {
        agent: AgentId,
    },
    FarmHarvested {
        agent: AgentId,
        gold: u32,
    },
    VisitStarted {
        visitor: AgentId,
        target: AgentId,
    },
    VisitAbandoned {
        visitor: AgentId,
        target: AgentId,
    },
    ConversationStarted {
        visitor: AgentId,
        target: AgentId,
    },
    VisitResolved {
        visitor: AgentId,
        target: AgentId,
        outcome: VisitOutcome,
    },
    ActionCleared {
        agent: AgentId,
    },
    TaskFault {
        agent: AgentId,
        reason: String,
    },
}

impl SimEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            SimEvent::EventRaised { .. } => "event_raised",
            SimEvent::BehaviorStarted { .. } => "behavior_started",
            SimEvent::NoVisitTarget { .. } => "no_visit_target",
            SimEvent::FarmingStarted { .. } => "farming_started",
            SimEvent::FarmAttemptFailed { .. } => "farm_attempt_failed",
            SimEvent::FarmStranded { .. } => "farm_stranded",
            SimEvent::FarmHarvested { .. } => "farm_harvested",
            SimEvent::VisitStarted { .. } => "visit_started",
            SimEvent::VisitAbandoned { .. } => "visit_abandoned",
            SimEvent::ConversationStarted { .. } => "conversation_started",
            SimEvent::VisitResolved { outcome, .. } => match outcome {
                VisitOutcome::Helped { .. } => "visit_helped",
                VisitOutcome::Accused { .. } => "visit_accused",
                VisitOutcome::Nothing => "visit_nothing",
            },
            SimEvent::ActionCleared { .. } => "action_cleared",
            SimEvent::TaskFault { .. } => "task_fault",
        }
    }
}

/// Raises pending events with increasing ids
#[derive(Debug, Default)]
pub struct EventGenerator {
    next_id: u64,
}

impl EventGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Roll the event chance for one idle pass of `source`; on success raise an
    /// event on some other agent
    pub fn maybe_raise(
        &mut self,
        store: &mut AgentStore,
        source: AgentId,
        rng: &mut SimRng,
        config: &SimulationConfig,
    ) -> Result<Option<SimEvent>> {
        if !roll(rng, config.probabilities.event_chance) {
            return Ok(None);
        }

        let others: Vec<AgentId> = store.ids().into_iter().filter(|id| *id != source).collect();
        let Some(&target) = pick(rng, &others) else {
            return Ok(None);
        };

        let gold_required = amount_in(rng, config.event_gold_min, config.event_gold_max);
        let id = EventId(self.next_id);
        self.next_id += 1;

        let state = store.state_mut(target)?;
        let description = format!("{} needs help resolving an issue", state.name);
        tracing::info!(
            "{} has encountered an event requiring {} gold",
            state.name,
            gold_required
        );
        state.push_event(PendingEvent {
            id,
            description,
            gold_required,
        });

        Ok(Some(SimEvent::EventRaised {
            agent: target,
            event: id,
            gold_required,
        }))
    }
}
