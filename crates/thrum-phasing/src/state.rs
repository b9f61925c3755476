//! Per-Entity Phase State
//!
//! Each entity owns one phase-state slot per phaser tracking it, keyed by
//! [`PhaserId`]. Slots are created explicitly when the entity registers with
//! a phaser and die with the entity; a phaser never retains entity state
//! between rebalance calls.

use ahash::AHashMap;

use thrum_core::time::SimTime;

use crate::PhaserId;

/// Phase state for one (entity, phaser) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseState {
    /// Bucket policy: the slot in the phase ring the entity currently
    /// occupies
    Bucket { bucket: u32 },
    /// Budget policy: when the entity's update last ran, and whether it is
    /// granted a run this cycle
    Budget {
        last_serviced: SimTime,
        active: bool,
    },
}

impl PhaseState {
    /// Zero value for the bucket policy: phase 0
    pub fn bucket_default() -> Self {
        Self::Bucket { bucket: 0 }
    }

    /// Zero value for the budget policy: never serviced, not active
    pub fn budget_default() -> Self {
        Self::Budget {
            last_serviced: SimTime::ZERO,
            active: false,
        }
    }
}

/// Per-entity mapping from phaser identity to phase state.
///
/// Owned by the entity, mutated only by the owning phaser's `register`,
/// `phase`, and `rebalance` operations.
#[derive(Debug, Clone, Default)]
pub struct PhaseStates {
    slots: AHashMap<PhaserId, PhaseState>,
}

impl PhaseStates {
    /// Create an empty slot map
    pub fn new() -> Self {
        Self {
            slots: AHashMap::new(),
        }
    }

    /// Initialize the slot for `phaser` with `state` if absent.
    ///
    /// An existing slot is kept, so re-registration never resets progress.
    pub fn init(&mut self, phaser: PhaserId, state: PhaseState) {
        self.slots.entry(phaser).or_insert(state);
    }

    /// Get the slot for `phaser`
    pub fn get(&self, phaser: PhaserId) -> Option<&PhaseState> {
        self.slots.get(&phaser)
    }

    /// Get the slot for `phaser` mutably
    pub fn get_mut(&mut self, phaser: PhaserId) -> Option<&mut PhaseState> {
        self.slots.get_mut(&phaser)
    }

    /// Check whether a slot exists for `phaser`
    pub fn is_registered(&self, phaser: PhaserId) -> bool {
        self.slots.contains_key(&phaser)
    }

    /// Remove the slot for `phaser`, returning it if present.
    ///
    /// Used when the host drops a phaser while its entities live on.
    pub fn remove(&mut self, phaser: PhaserId) -> Option<PhaseState> {
        self.slots.remove(&phaser)
    }

    /// Number of phasers tracking this entity
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check whether no phaser tracks this entity
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Access to an entity's phase-state slots.
///
/// Implemented by whatever entity type the host simulation uses; phasers
/// reach per-entity state only through this trait and know nothing else
/// about the entity.
pub trait Phased {
    fn phase_states(&self) -> &PhaseStates;
    fn phase_states_mut(&mut self) -> &mut PhaseStates;
}
