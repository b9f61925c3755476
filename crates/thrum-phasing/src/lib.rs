//! # Thrum Phasing
//!
//! Update phasing for the Thrum world simulation.
//!
//! Running every entity's full update logic every frame is wasted work when
//! most updates tolerate being spread out. This crate decides, for a large
//! and changing population, which subset may run its expensive update this
//! frame, while guaranteeing that every entity is eventually serviced and
//! that load stays balanced over time.
//!
//! ## Policies
//! - [`BucketPhaser`]: a fixed ring of discrete phases; entities rotate
//!   through the ring and run only while in phase 0, with occupancy
//!   rebalancing when the ring gets skewed
//! - [`BudgetPhaser`]: a global update budget derived from elapsed time and
//!   a configured rate, granted to the least-recently-serviced entities
//!
//! Both implement [`Phaser`] and are driven the same way: a periodic
//! [`rebalance`](Phaser::rebalance) pass over the full population (on a
//! maintenance cadence, not every frame) and a per-frame
//! [`phase`](Phaser::phase) query per entity gating that entity's update.
//!
//! The phasers never perform updates themselves, never retain entities
//! between calls, and hold no shared mutable state; all calls touching one
//! phaser or one entity's state must be serialized by the host.

use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

use thrum_core::time::SimTime;

pub mod bucket;
pub mod budget;
pub mod state;

pub use bucket::BucketPhaser;
pub use budget::BudgetPhaser;
pub use state::{PhaseState, PhaseStates, Phased};

/// Phasing configuration errors
#[derive(Error, Debug)]
pub enum PhasingError {
    #[error("phase count must be at least 2, got {0}")]
    PhaseCountTooSmall(u32),

    #[error("updates per second must be at least 1, got {0}")]
    RateTooSmall(u32),
}

/// Result type for phasing operations
pub type PhasingResult<T> = Result<T, PhasingError>;

/// Identity of one phaser instance, unique within the process.
///
/// A single entity may be tracked by several independent phasers at once
/// (one gating AI, another gating collision-shape refresh); per-entity phase
/// state is keyed by this ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhaserId(u64);

static NEXT_PHASER_ID: AtomicU64 = AtomicU64::new(0);

impl PhaserId {
    /// Allocate a fresh process-unique phaser ID
    fn next() -> Self {
        Self(NEXT_PHASER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Common contract for update-phasing policies.
///
/// The host loop picks a policy at construction time, stores it behind this
/// trait, calls [`rebalance`](Phaser::rebalance) on a maintenance cadence
/// with the complete current population, and calls [`phase`](Phaser::phase)
/// once per entity per frame to decide whether that entity's update runs.
///
/// Rebalancing has O(population) cost; querying is O(1). Decoupling the two
/// cadences is the point of the design.
pub trait Phaser<E: Phased> {
    /// Get this phaser's process-unique identity
    fn id(&self) -> PhaserId;

    /// Initialize the entity's phase state for this phaser.
    ///
    /// Must be called once before the entity is first queried; the slot is
    /// created with the policy's zero value. Registering an
    /// already-registered entity keeps its existing state.
    fn register(&self, entity: &mut E);

    /// Decide whether the entity's update may run this frame.
    ///
    /// Querying an entity that was never registered is a caller error; it
    /// deterministically returns `false` rather than panicking.
    fn phase(&self, entity: &mut E, now: SimTime) -> bool;

    /// Reassign phase state across the full population.
    ///
    /// `entities` must be the complete population currently tracked by this
    /// phaser: destroyed entities excluded, newly created (and registered)
    /// ones included. Entities with no state for this phaser are skipped.
    fn rebalance(&mut self, entities: &mut [E], now: SimTime);
}
