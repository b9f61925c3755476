//! Bucket Phaser
//!
//! Partitions the population into a fixed ring of phases. An entity's update
//! runs only while it occupies phase 0; every rebalance shifts each entity
//! one phase forward, so the ring guarantees every entity is serviced once
//! per full rotation. When occupancy skew gets bad enough the rebalance pass
//! also redistributes entities out of overfull buckets, bounding per-cycle
//! load without a full sort.

use smallvec::{SmallVec, smallvec};

use thrum_core::time::SimTime;

use crate::state::{PhaseState, Phased};
use crate::{Phaser, PhaserId, PhasingError, PhasingResult};

/// Occupancy tallies stay inline for typical ring sizes
type BucketCounts = SmallVec<[u32; 16]>;

/// Ratio of ideal peak occupancy to observed peak occupancy below which a
/// rebalance also redistributes. Rotation alone already guarantees
/// eventual service; redistribution only bounds momentary skew, so the exact
/// cutoff is a tuning knob rather than a correctness requirement.
const REDISTRIBUTE_BELOW: f32 = 0.8;

/// Round-robin phase ring.
///
/// Entities are serviced while in bucket 0 and rotate one bucket forward on
/// every [`rebalance`](Phaser::rebalance), visiting every bucket once per
/// `phase_count` calls. After a triggered redistribution no bucket holds
/// more than `ceil(population / phase_count)` entities.
#[derive(Debug)]
pub struct BucketPhaser {
    id: PhaserId,
    phase_count: u32,
}

impl BucketPhaser {
    /// Create a phaser with `phase_count` buckets.
    ///
    /// Fewer than two buckets cannot distribute load and is rejected.
    pub fn new(phase_count: u32) -> PhasingResult<Self> {
        if phase_count < 2 {
            return Err(PhasingError::PhaseCountTooSmall(phase_count));
        }
        Ok(Self {
            id: PhaserId::next(),
            phase_count,
        })
    }

    /// Get this phaser's identity
    pub fn id(&self) -> PhaserId {
        self.id
    }

    /// Get the number of buckets in the ring
    pub fn phase_count(&self) -> u32 {
        self.phase_count
    }

    /// First bucket at or after `start` (wrapping) with occupancy below
    /// `cap`
    fn bucket_with_room(&self, counts: &BucketCounts, start: u32, cap: u32) -> Option<u32> {
        let k = self.phase_count;
        (0..k)
            .map(|step| (start + step) % k)
            .find(|&b| counts[b as usize] < cap)
    }
}

impl<E: Phased> Phaser<E> for BucketPhaser {
    fn id(&self) -> PhaserId {
        self.id
    }

    fn register(&self, entity: &mut E) {
        entity
            .phase_states_mut()
            .init(self.id, PhaseState::bucket_default());
    }

    /// True iff the entity currently occupies bucket 0. Pure read.
    fn phase(&self, entity: &mut E, _now: SimTime) -> bool {
        match entity.phase_states().get(self.id) {
            Some(PhaseState::Bucket { bucket }) => *bucket == 0,
            _ => false,
        }
    }

    fn rebalance(&mut self, entities: &mut [E], _now: SimTime) {
        let k = self.phase_count;
        let mut counts: BucketCounts = smallvec![0; k as usize];
        let desired_max = (entities.len() as u32).div_ceil(k);
        let mut max_occupancy = 0u32;
        let mut candidates: Vec<usize> = Vec::new();

        // Pass 1: rotate every entity one bucket forward, tallying where
        // each lands. An entity pushing its bucket past the ideal cap is a
        // redistribution candidate.
        for (index, entity) in entities.iter_mut().enumerate() {
            let Some(PhaseState::Bucket { bucket }) = entity.phase_states_mut().get_mut(self.id)
            else {
                // Unregistered: caller error, skipped
                continue;
            };
            *bucket = (*bucket + 1) % k;

            let landed = *bucket as usize;
            counts[landed] += 1;
            max_occupancy = max_occupancy.max(counts[landed]);
            if counts[landed] > desired_max {
                candidates.push(index);
            }
        }

        if max_occupancy == 0 {
            return;
        }

        // Only spend the redistribution pass when the peak bucket is well
        // past ideal.
        if desired_max as f32 / max_occupancy as f32 >= REDISTRIBUTE_BELOW {
            return;
        }

        log::debug!(
            "bucket ring skewed (peak {} vs ideal {}), redistributing {} of {} entities",
            max_occupancy,
            desired_max,
            candidates.len(),
            entities.len()
        );

        // Pass 2: walk candidates newest-first and greedily move each into
        // the next bucket (scanning forward, wrapping) still under the cap.
        for &index in candidates.iter().rev() {
            let Some(PhaseState::Bucket { bucket }) =
                entities[index].phase_states_mut().get_mut(self.id)
            else {
                continue;
            };
            let from = *bucket;
            if counts[from as usize] <= desired_max {
                // Earlier moves already drained this bucket below the cap
                continue;
            }
            if let Some(dest) = self.bucket_with_room(&counts, (from + 1) % k, desired_max) {
                counts[from as usize] -= 1;
                counts[dest as usize] += 1;
                *bucket = dest;
            }
        }
    }
}
