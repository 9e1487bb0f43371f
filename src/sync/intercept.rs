//! Access interceptor: the per-read coherency check.
//!
//! `SyncDebugger` is the capability object behind every instrumented field.
//! With the `sync-debug` feature enabled it owns the per-state value
//! trackers and the rotation counter and evaluates read hazards; with the
//! feature disabled an identically shaped zero-sized stand-in is compiled
//! instead, so the instrumented call sites cost nothing in production
//! builds. Call sites are identical either way.
//!
//! Hazard ordering: structural hazards (state rotation or mesh
//! modification behind the handle's back) take priority over timing hazards
//! (stale data), because a structurally invalid view may alias entirely
//! different entities' storage.

use crate::mirror_error::MeshMirrorError;
use crate::sync::MemorySpace;
use crate::sync::clock::GenerationClock;

/// Outcome of an intercepted read that violated the coherency contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hazard {
    /// The read space's copy lags the last declared or recorded write.
    Stale,
    /// The view predates a structural change (mesh modification or state
    /// rotation) and was never re-acquired.
    Unrefreshed,
}

#[cfg(feature = "sync-debug")]
mod enabled {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::{GenerationClock, Hazard, MemorySpace, MeshMirrorError};
    use crate::sync::tracker::ValueTracker;

    /// Debug-build coherency capability for one field.
    #[derive(Debug)]
    pub struct SyncDebugger {
        /// One tracker per field state; index 0 is the newest state.
        trackers: Vec<ValueTracker>,
        /// Bumped once per successful state rotation.
        rotations: AtomicU64,
    }

    impl SyncDebugger {
        /// Whether the capability is compiled in.
        pub const ENABLED: bool = true;

        /// Capability for a field with `states` buffers.
        pub fn new(states: usize) -> Self {
            Self {
                trackers: (0..states).map(|_| ValueTracker::default()).collect(),
                rotations: AtomicU64::new(0),
            }
        }

        /// Record a write to `slot` on `space`.
        #[inline]
        pub fn note_write(
            &self,
            state: usize,
            slot: usize,
            space: MemorySpace,
            generation: u64,
            value: f64,
        ) {
            self.trackers[state].note_write(slot, space, generation, value);
        }

        /// Evaluate the timing hazard for a read of `slot` on `space`.
        #[inline]
        pub fn read_hazard(
            &self,
            state: usize,
            slot: usize,
            space: MemorySpace,
            clock: &GenerationClock,
        ) -> Option<Hazard> {
            if clock.lags(space) {
                return Some(Hazard::Stale);
            }
            let generation = clock.generation(space);
            if self.trackers[state].is_slot_stale(slot, space, generation) {
                return Some(Hazard::Stale);
            }
            None
        }

        /// Retire `source`-space records after a sync copied its data.
        #[inline]
        pub fn on_synced(&self, state: usize, source: MemorySpace) {
            self.trackers[state].retire(source);
        }

        /// Drop all records; slot offsets were remapped.
        pub fn on_layout_rebuilt(&self) {
            for tracker in &self.trackers {
                tracker.clear();
            }
        }

        /// Rotation counter captured by device handles.
        #[inline]
        pub fn rotation_count(&self) -> u64 {
            self.rotations.load(Ordering::Acquire)
        }

        /// The fatal-tier rotation precondition: refuse when the device copy
        /// has unreconciled modifications, either by generation lag or by a
        /// live host-write record the device never observed.
        pub fn check_rotation(
            &self,
            field: &str,
            clock: &GenerationClock,
        ) -> Result<(), MeshMirrorError> {
            let device_generation = clock.generation(MemorySpace::Device);
            if clock.lags(MemorySpace::Device)
                || self.trackers[0].has_unreconciled(MemorySpace::Host, device_generation)
            {
                return Err(MeshMirrorError::StateRotationUnreconciled(field.to_owned()));
            }
            Ok(())
        }

        /// A rotation happened: retained device views are now logically
        /// undefined, and slot records refer to moved storage.
        pub fn on_rotated(&self) {
            for tracker in &self.trackers {
                tracker.clear();
            }
            self.rotations.fetch_add(1, Ordering::AcqRel);
        }
    }
}

#[cfg(not(feature = "sync-debug"))]
mod disabled {
    use super::{GenerationClock, Hazard, MemorySpace, MeshMirrorError};

    /// No-op stand-in compiled without the `sync-debug` feature.
    #[derive(Debug, Default)]
    pub struct SyncDebugger;

    impl SyncDebugger {
        /// Whether the capability is compiled in.
        pub const ENABLED: bool = false;

        #[inline(always)]
        pub fn new(_states: usize) -> Self {
            Self
        }

        #[inline(always)]
        pub fn note_write(
            &self,
            _state: usize,
            _slot: usize,
            _space: MemorySpace,
            _generation: u64,
            _value: f64,
        ) {
        }

        #[inline(always)]
        pub fn read_hazard(
            &self,
            _state: usize,
            _slot: usize,
            _space: MemorySpace,
            _clock: &GenerationClock,
        ) -> Option<Hazard> {
            None
        }

        #[inline(always)]
        pub fn on_synced(&self, _state: usize, _source: MemorySpace) {}

        #[inline(always)]
        pub fn on_layout_rebuilt(&self) {}

        #[inline(always)]
        pub fn rotation_count(&self) -> u64 {
            0
        }

        #[inline(always)]
        pub fn check_rotation(
            &self,
            _field: &str,
            _clock: &GenerationClock,
        ) -> Result<(), MeshMirrorError> {
            Ok(())
        }

        #[inline(always)]
        pub fn on_rotated(&self) {}
    }
}

#[cfg(feature = "sync-debug")]
pub use enabled::SyncDebugger;
#[cfg(not(feature = "sync-debug"))]
pub use disabled::SyncDebugger;

#[cfg(all(test, feature = "sync-debug"))]
mod tests {
    use super::*;
    use crate::sync::MemorySpace::{Device, Host};

    #[test]
    fn clean_field_has_no_hazard() {
        let debug = SyncDebugger::new(1);
        let clock = GenerationClock::default();
        assert_eq!(debug.read_hazard(0, 0, Device, &clock), None);
    }

    #[test]
    fn generation_lag_is_stale() {
        let debug = SyncDebugger::new(1);
        let clock = GenerationClock::default();
        clock.declare_modified(Host);
        assert_eq!(debug.read_hazard(0, 0, Device, &clock), Some(Hazard::Stale));
        assert_eq!(debug.read_hazard(0, 0, Host, &clock), None);
    }

    #[test]
    fn undeclared_write_is_stale_via_records() {
        let debug = SyncDebugger::new(1);
        let clock = GenerationClock::default();
        debug.note_write(0, 7, Host, clock.generation(Host), 3.14);
        assert_eq!(debug.read_hazard(0, 7, Device, &clock), Some(Hazard::Stale));
        assert_eq!(debug.read_hazard(0, 8, Device, &clock), None);
    }

    #[test]
    fn rotation_refused_until_reconciled() {
        let debug = SyncDebugger::new(2);
        let clock = GenerationClock::default();
        debug.note_write(0, 0, Host, clock.generation(Host), 1.0);
        assert!(debug.check_rotation("temperature", &clock).is_err());

        clock.declare_modified(Host);
        clock.declare_synced(Host, Device);
        debug.on_synced(0, Host);
        assert!(debug.check_rotation("temperature", &clock).is_ok());
    }

    #[test]
    fn rotation_bumps_the_counter_and_clears_records() {
        let debug = SyncDebugger::new(2);
        let clock = GenerationClock::default();
        debug.note_write(0, 0, Host, 0, 1.0);
        let before = debug.rotation_count();
        debug.on_rotated();
        assert_eq!(debug.rotation_count(), before + 1);
        assert_eq!(debug.read_hazard(0, 0, Device, &clock), None);
    }
}
