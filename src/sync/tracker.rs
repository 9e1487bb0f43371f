//! Value tracker: last-write records per storage slot.
//!
//! Generations alone cannot catch every coherency mistake: a write with
//! *neither* a modify nor a sync declaration leaves both generations equal,
//! yet the opposite space's buffer is silently stale. The tracker records,
//! for every tracked write, which space wrote the slot, at which generation,
//! and the written value, so the interceptor can flag exactly the slots
//! whose last write the reading space never observed. Records are retired
//! when a sync actually copies data, and cleared wholesale when a layout
//! rebuild remaps slot offsets.
//!
//! Device-side kernels record writes concurrently for distinct slots, so
//! the map must tolerate concurrent insertion; slot records are independent.

use dashmap::DashMap;

use crate::sync::MemorySpace;

/// Last write observed for one flat storage slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccessRecord {
    /// Space that performed the write.
    pub space: MemorySpace,
    /// That space's generation at write time.
    pub generation: u64,
    /// Written value, widened for diagnostics.
    pub value: f64,
}

/// Per-state map of slot index to its last write.
#[derive(Debug, Default)]
pub struct ValueTracker {
    records: DashMap<usize, AccessRecord>,
}

impl ValueTracker {
    /// Record a write; overwrites any prior record for the slot.
    pub fn note_write(&self, slot: usize, space: MemorySpace, generation: u64, value: f64) {
        self.records.insert(
            slot,
            AccessRecord {
                space,
                generation,
                value,
            },
        );
    }

    /// Last write recorded for `slot`, if any.
    pub fn record(&self, slot: usize) -> Option<AccessRecord> {
        self.records.get(&slot).map(|r| *r)
    }

    /// True iff the slot's last write came from the opposite space and the
    /// reading space's generation has not advanced past it.
    pub fn is_slot_stale(&self, slot: usize, read_space: MemorySpace, read_generation: u64) -> bool {
        self.records.get(&slot).is_some_and(|r| {
            r.space == read_space.opposite() && r.generation >= read_generation
        })
    }

    /// True iff any live record from `source` has not been observed by a
    /// destination currently at `dest_generation`. Used as the rotation
    /// precondition.
    pub fn has_unreconciled(&self, source: MemorySpace, dest_generation: u64) -> bool {
        self.records
            .iter()
            .any(|r| r.space == source && r.generation >= dest_generation)
    }

    /// Retire every record written by `space`; called when a sync copies
    /// that space's data to the other side.
    pub fn retire(&self, space: MemorySpace) {
        self.records.retain(|_, r| r.space != space);
    }

    /// Drop all records; called when a layout rebuild remaps offsets.
    pub fn clear(&self) {
        self.records.clear();
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True iff no records are live.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
