//! System registry — tracks added systems, their ordering, and their
//! matched entities.
//!
//! Systems run in ascending `index` order; equal indices break ties by
//! insertion sequence. The slot list is kept sorted, so iteration order
//! is always execution order. Re-indexing reorders immediately;
//! matched-set recomputation only happens at reconciliation boundaries.

use crate::entity::Entity;
use crate::system::{System, SystemId};

/// A system together with its registry bookkeeping.
pub(crate) struct SystemSlot {
    pub id: SystemId,
    /// Ordering key. Defaults to the insertion sequence.
    pub index: i64,
    /// Insertion sequence, used as the tie-break for equal indices.
    pub seq: u64,
    /// Cleared while the system is pending removal.
    pub active: bool,
    /// Matched entities in insertion order (comparator order for sorted
    /// systems).
    pub matched: Vec<Entity>,
    pub system: System,
}

/// Registry of all systems in a world, kept in execution order.
#[derive(Default)]
pub(crate) struct SystemRegistry {
    slots: Vec<SystemSlot>,
    next_seq: u64,
    next_id: u64,
}

impl SystemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a fresh system handle. The system itself is inserted
    /// later, when the queued addition is applied.
    pub fn reserve_id(&mut self) -> SystemId {
        let id = SystemId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Insert a system under a previously reserved handle. Its index
    /// defaults to the insertion sequence.
    pub fn insert(&mut self, id: SystemId, system: System) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.slots.push(SystemSlot {
            id,
            index: seq as i64,
            seq,
            active: true,
            matched: Vec::new(),
            system,
        });
        self.sort();
    }

    /// Remove a system, returning its slot.
    pub fn remove(&mut self, id: SystemId) -> Option<SystemSlot> {
        let pos = self.slots.iter().position(|s| s.id == id)?;
        Some(self.slots.remove(pos))
    }

    pub fn get(&self, id: SystemId) -> Option<&SystemSlot> {
        self.slots.iter().find(|s| s.id == id)
    }

    pub fn get_mut(&mut self, id: SystemId) -> Option<&mut SystemSlot> {
        self.slots.iter_mut().find(|s| s.id == id)
    }

    /// Change a system's ordering key, returning the previous one.
    /// Takes effect immediately for iteration order.
    pub fn set_index(&mut self, id: SystemId, index: i64) -> Option<i64> {
        let slot = self.get_mut(id)?;
        let old = slot.index;
        slot.index = index;
        self.sort();
        Some(old)
    }

    /// Slots in execution order.
    pub fn slots(&self) -> &[SystemSlot] {
        &self.slots
    }

    pub fn slots_mut(&mut self) -> &mut [SystemSlot] {
        &mut self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// All system handles, in execution order.
    pub fn ids(&self) -> Vec<SystemId> {
        self.slots.iter().map(|s| s.id).collect()
    }

    fn sort(&mut self) {
        self.slots.sort_by_key(|s| (s.index, s.seq));
    }
}
