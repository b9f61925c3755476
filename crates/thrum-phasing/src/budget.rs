//! Budget Phaser
//!
//! Grants updates from a global budget derived from elapsed sim time and a
//! configured updates-per-second rate. Each rebalance sorts the population
//! by how long ago each entity was last serviced and activates the
//! longest-starved entities up to the budget, so a slow frame grants a
//! larger budget and long-run throughput stays near the configured rate
//! regardless of frame-rate variance.

use thrum_core::time::SimTime;

use crate::state::{PhaseState, Phased};
use crate::{Phaser, PhaserId, PhasingError, PhasingResult};

/// Least-recently-serviced budget scheduler.
///
/// The recency clock advances only when an active entity is actually
/// queried: [`phase`](Phaser::phase) stamps the service time, so an entity
/// that was granted a run but never asked keeps its starved ordering.
///
/// The budget is the literal per-call `floor(elapsed_ms * rate / 1000)`
/// with no fractional carry; rebalance on a cadence of at least
/// `1000 / rate` milliseconds (`TickCadence::from_hz(rate)` or slower) or
/// the floor rounds every grant down to zero.
#[derive(Debug)]
pub struct BudgetPhaser {
    id: PhaserId,
    updates_per_second: u32,
    last_tick: SimTime,
}

impl BudgetPhaser {
    /// Create a phaser granting `updates_per_second` entity updates.
    ///
    /// A rate of zero can never service anyone and is rejected.
    pub fn new(updates_per_second: u32) -> PhasingResult<Self> {
        if updates_per_second < 1 {
            return Err(PhasingError::RateTooSmall(updates_per_second));
        }
        Ok(Self {
            id: PhaserId::next(),
            updates_per_second,
            last_tick: SimTime::ZERO,
        })
    }

    /// Get this phaser's identity
    pub fn id(&self) -> PhaserId {
        self.id
    }

    /// Get the configured rate
    pub fn updates_per_second(&self) -> u32 {
        self.updates_per_second
    }

    fn budget_for(&self, elapsed_ms: u64) -> usize {
        (elapsed_ms * self.updates_per_second as u64 / 1000) as usize
    }
}

impl<E: Phased> Phaser<E> for BudgetPhaser {
    fn id(&self) -> PhaserId {
        self.id
    }

    fn register(&self, entity: &mut E) {
        entity
            .phase_states_mut()
            .init(self.id, PhaseState::budget_default());
    }

    /// Returns the current grant; an active query also stamps the service
    /// time so the next rebalance sees this entity as freshly serviced.
    fn phase(&self, entity: &mut E, now: SimTime) -> bool {
        match entity.phase_states_mut().get_mut(self.id) {
            Some(PhaseState::Budget {
                last_serviced,
                active,
            }) => {
                if *active {
                    *last_serviced = now;
                }
                *active
            }
            _ => false,
        }
    }

    fn rebalance(&mut self, entities: &mut [E], now: SimTime) {
        let elapsed_ms = now.millis_since(self.last_tick);
        self.last_tick = now;
        let budget = self.budget_for(elapsed_ms);

        // Longest-starved first; the stable sort keeps slice order for ties
        let mut order: Vec<(usize, SimTime)> = entities
            .iter()
            .enumerate()
            .filter_map(|(index, entity)| match entity.phase_states().get(self.id) {
                Some(PhaseState::Budget { last_serviced, .. }) => Some((index, *last_serviced)),
                _ => None,
            })
            .collect();
        order.sort_by_key(|&(_, last_serviced)| last_serviced);

        log::trace!(
            "budget tick: {}ms elapsed, granting {} of {} entities",
            elapsed_ms,
            budget.min(order.len()),
            order.len()
        );

        for (rank, &(index, _)) in order.iter().enumerate() {
            if let Some(PhaseState::Budget { active, .. }) =
                entities[index].phase_states_mut().get_mut(self.id)
            {
                *active = rank < budget;
            }
        }
    }
}
