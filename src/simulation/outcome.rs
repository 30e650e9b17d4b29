//! Visit outcome resolution
//!
//! The one place where two agents' state changes together. Every check runs
//! before the first write, so the pair is either fully resolved or untouched.

use serde::Serialize;

use crate::core::config::ProbabilityTable;
use crate::core::error::Result;
use crate::core::types::{AgentId, EventId};
use crate::entity::state::{AgentAction, Friendship};
use crate::simulation::probability::{roll, SimRng};
use crate::simulation::store::AgentStore;

pub const HELP_FRIENDSHIP_DELTA: i32 = 2;
pub const ACCUSE_FRIENDSHIP_DELTA: i32 = -3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum VisitOutcome {
    /// Visitor paid off the target's oldest event
    Helped {
        event: EventId,
        cost: u32,
        friendship: Friendship,
    },
    /// Visitor accused the target
    Accused { friendship: Friendship },
    Nothing,
}

impl VisitOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            VisitOutcome::Helped { .. } => "helped",
            VisitOutcome::Accused { .. } => "accused",
            VisitOutcome::Nothing => "nothing",
        }
    }
}

/// Decide and apply the outcome of `visitor`'s conversation with `target`
///
/// Help fires with `help_chance` when the target has a pending event the
/// visitor can afford. Otherwise an independent `accuse_chance` roll decides an
/// accusation, which also sets the visitor's action to `Accuse`.
pub fn resolve_visit(
    store: &mut AgentStore,
    visitor: AgentId,
    target: AgentId,
    rng: &mut SimRng,
    probabilities: &ProbabilityTable,
) -> Result<VisitOutcome> {
    let (visitor_rec, target_rec) = store.pair_mut(visitor, target)?;
    let visitor_state = &mut visitor_rec.state;
    let target_state = &mut target_rec.state;

    if roll(rng, probabilities.help_chance) {
        let affordable = target_state
            .oldest_event()
            .filter(|event| visitor_state.gold() >= event.gold_required)
            .map(|event| (event.id, event.gold_required));

        if let Some((event, cost)) = affordable {
            visitor_state.spend(cost);
            target_state.remove_event(event);
            let friendship = visitor_state.adjust_friendship(target, HELP_FRIENDSHIP_DELTA);

            tracing::info!(
                "{} helped {} resolve their event for {} gold",
                visitor_state.name,
                target_state.name,
                cost
            );
            return Ok(VisitOutcome::Helped {
                event,
                cost,
                friendship,
            });
        }
    }

    if roll(rng, probabilities.accuse_chance) {
        visitor_state.set_action(Some(AgentAction::Accuse { target }));
        let friendship = visitor_state.adjust_friendship(target, ACCUSE_FRIENDSHIP_DELTA);

        tracing::info!(
            "{} accused {} of being a witch",
            visitor_state.name,
            target_state.name
        );
        return Ok(VisitOutcome::Accused { friendship });
    }

    Ok(VisitOutcome::Nothing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Vec2;
    use crate::entity::state::PendingEvent;
    use crate::simulation::probability::seeded;

    fn table(help: f64, accuse: f64) -> ProbabilityTable {
        ProbabilityTable {
            help_chance: help,
            accuse_chance: accuse,
            ..Default::default()
        }
    }

    fn setup(visitor_gold: u32, event_cost: Option<u32>) -> AgentStore {
        let mut store = AgentStore::new();
        store.insert("Visitor".into(), Vec2::ZERO, visitor_gold, 8.0);
        store.insert("Target".into(), Vec2::ZERO, 100, 8.0);
        if let Some(cost) = event_cost {
            store.state_mut(AgentId(1)).unwrap().push_event(PendingEvent {
                id: EventId(7),
                description: "Target needs help resolving an issue".into(),
                gold_required: cost,
            });
        }
        store
    }

    #[test]
    fn test_help_pays_event_and_raises_friendship() {
        let mut store = setup(100, Some(40));
        let outcome =
            resolve_visit(&mut store, AgentId(0), AgentId(1), &mut seeded(1), &table(1.0, 0.0))
                .unwrap();

        assert_eq!(
            outcome,
            VisitOutcome::Helped {
                event: EventId(7),
                cost: 40,
                friendship: Friendship::new(7),
            }
        );
        assert_eq!(store.state(AgentId(0)).unwrap().gold(), 60);
        assert_eq!(store.state(AgentId(1)).unwrap().event_count(), 0);
        assert_eq!(store.state(AgentId(1)).unwrap().gold(), 100);
    }

    #[test]
    fn test_cannot_afford_falls_through_to_accuse_roll() {
        let mut store = setup(10, Some(40));
        let outcome =
            resolve_visit(&mut store, AgentId(0), AgentId(1), &mut seeded(1), &table(1.0, 1.0))
                .unwrap();

        assert!(matches!(outcome, VisitOutcome::Accused { .. }));
        assert_eq!(store.state(AgentId(0)).unwrap().gold(), 10);
        assert_eq!(store.state(AgentId(1)).unwrap().event_count(), 1);
    }

    #[test]
    fn test_accuse_sets_action_and_lowers_friendship() {
        let mut store = setup(100, None);
        let outcome =
            resolve_visit(&mut store, AgentId(0), AgentId(1), &mut seeded(1), &table(1.0, 1.0))
                .unwrap();

        assert_eq!(
            outcome,
            VisitOutcome::Accused {
                friendship: Friendship::new(2)
            }
        );
        assert_eq!(
            store.state(AgentId(0)).unwrap().current_action(),
            Some(AgentAction::Accuse { target: AgentId(1) })
        );
    }

    #[test]
    fn test_repeated_accusations_stay_clamped() {
        let mut store = setup(100, None);
        for _ in 0..5 {
            resolve_visit(&mut store, AgentId(0), AgentId(1), &mut seeded(1), &table(0.0, 1.0))
                .unwrap();
        }
        let friendship = store.state(AgentId(0)).unwrap().friendship(AgentId(1)).unwrap();
        assert_eq!(friendship.value(), 1);
    }

    #[test]
    fn test_nothing_leaves_state_untouched() {
        let mut store = setup(100, Some(20));
        let outcome =
            resolve_visit(&mut store, AgentId(0), AgentId(1), &mut seeded(1), &table(0.0, 0.0))
                .unwrap();

        assert_eq!(outcome, VisitOutcome::Nothing);
        assert_eq!(store.state(AgentId(0)).unwrap().gold(), 100);
        assert_eq!(store.state(AgentId(0)).unwrap().friendship(AgentId(1)), None);
        assert_eq!(store.state(AgentId(1)).unwrap().event_count(), 1);
    }

    #[test]
    fn test_missing_target_changes_nothing() {
        let mut store = setup(100, None);
        let result =
            resolve_visit(&mut store, AgentId(0), AgentId(5), &mut seeded(1), &table(1.0, 1.0));

        assert!(result.is_err());
        assert_eq!(store.state(AgentId(0)).unwrap().current_action(), None);
    }
}
