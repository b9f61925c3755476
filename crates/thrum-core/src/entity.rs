//! Entity Identity
//!
//! Stable entity identifiers with generation counters so stale references
//! can be detected after an index is reused.

use serde::{Deserialize, Serialize};

/// Entity identifier with generation counter for stable IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId {
    /// Entity index
    index: u32,
    /// Generation counter to detect stale references
    generation: u32,
}

impl EntityId {
    /// Create a new entity ID with the given index and generation
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Get the entity index
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Get the entity generation
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Create a null entity ID (invalid reference)
    pub fn null() -> Self {
        Self {
            index: u32::MAX,
            generation: 0,
        }
    }

    /// Check if this is a null entity ID
    pub fn is_null(&self) -> bool {
        self.index == u32::MAX
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::null()
    }
}
