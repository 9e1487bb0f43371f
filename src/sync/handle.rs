//! Device-side field views.
//!
//! A `DeviceField` is the lightweight, cloneable view a device kernel works
//! through, distinct from the canonical [`Field`](crate::data::field::Field)
//! object. At acquisition it captures the device allocation, the layout
//! snapshot, the mesh epoch, and the field's rotation count. Re-acquiring
//! through [`Field::device`](crate::data::field::Field::device) always
//! observes the current epoch; a clone retained across a mesh modification
//! or a state rotation keeps its old stamps (and its old allocation — the
//! view stays memory-safe, it just aliases data the mesh no longer owns)
//! and trips the un-updated diagnostic on its next read. A stale view is
//! discarded and re-acquired, never repaired in place.

use core::panic::Location;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use crate::data::field::Field;
use crate::data::layout::FieldLayout;
use crate::data::storage::{DeviceStorage, Storage};
use crate::data::{FieldScalar, to_f64};
use crate::sync::MemorySpace;
use crate::sync::intercept::{Hazard, SyncDebugger};
use crate::sync::report::value_text;
use crate::topology::epoch::EpochStamp;

/// Position of one entity slot: bucket ordinal plus in-bucket ordinal,
/// relative to the layout snapshot the view captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceIndex {
    /// Bucket ordinal in the captured layout.
    pub bucket: u32,
    /// Entity ordinal inside the bucket.
    pub ordinal: u32,
}

/// Cloneable device-side view of one field's newest state.
#[derive(Debug, Clone)]
pub struct DeviceField<V: FieldScalar> {
    field: Field<V>,
    data: Arc<RwLock<DeviceStorage<V>>>,
    layout: Arc<FieldLayout>,
    epoch_stamp: EpochStamp,
    rotation_stamp: u64,
}

impl<V: FieldScalar> DeviceField<V> {
    pub(crate) fn new(
        field: Field<V>,
        data: Arc<RwLock<DeviceStorage<V>>>,
        layout: Arc<FieldLayout>,
        epoch_stamp: EpochStamp,
        rotation_stamp: u64,
    ) -> Self {
        Self {
            field,
            data,
            layout,
            epoch_stamp,
            rotation_stamp,
        }
    }

    /// Field name.
    pub fn name(&self) -> &str {
        self.field.name()
    }

    /// Scalars per entity.
    pub fn components(&self) -> usize {
        self.layout.components()
    }

    /// Entity count in the captured layout.
    pub fn len(&self) -> usize {
        self.layout.len()
    }

    /// True iff the captured layout covers no entities.
    pub fn is_empty(&self) -> bool {
        self.layout.is_empty()
    }

    /// True iff no structural change happened since acquisition.
    pub fn is_current(&self) -> bool {
        !self.epoch_stamp.is_stale(&self.field.core.epoch)
            && self.rotation_stamp == self.field.core.debug.rotation_count()
    }

    /// Every valid index of the captured layout, bucket-major.
    pub fn indices(&self) -> Vec<DeviceIndex> {
        let mut out = Vec::with_capacity(self.layout.len());
        for (bucket, span) in self.layout.bucket_spans().iter().enumerate() {
            for ordinal in 0..span.entities {
                out.push(DeviceIndex {
                    bucket: bucket as u32,
                    ordinal: ordinal as u32,
                });
            }
        }
        out
    }

    /// Begin a read pass. One pass reports at most one violation for this
    /// field; a new pass re-arms reporting.
    pub fn read_pass(&self) -> DevicePass<'_, V> {
        DevicePass {
            view: self,
            warned: AtomicBool::new(false),
        }
    }

    /// One-shot intercepted read; its own single-slot pass.
    #[track_caller]
    pub fn get(&self, index: DeviceIndex, component: usize) -> V {
        self.read_pass().get(index, component)
    }

    /// Write one component of one entity. Writes are never validated; they
    /// land in the captured allocation.
    pub fn set(&self, index: DeviceIndex, component: usize, value: V) {
        let slot = self.slot(index, component);
        self.data.write().as_mut_slice()[slot] = value;
        self.field.core.debug.note_write(
            0,
            slot,
            MemorySpace::Device,
            self.field.core.clock.generation(MemorySpace::Device),
            to_f64(value),
        );
    }

    /// Overwrite every slot of the captured allocation.
    pub fn set_all(&self, value: V) {
        self.data.write().fill(value);
        let generation = self.field.core.clock.generation(MemorySpace::Device);
        let widened = to_f64(value);
        for slot in 0..self.layout.total_len() {
            self.field
                .core
                .debug
                .note_write(0, slot, MemorySpace::Device, generation, widened);
        }
    }

    /// Data-parallel variant of [`set_all`](Self::set_all).
    #[cfg(feature = "rayon")]
    pub fn par_set_all(&self, value: V) {
        use rayon::prelude::*;
        {
            let mut data = self.data.write();
            data.as_mut_slice().par_iter_mut().for_each(|slot| *slot = value);
        }
        let generation = self.field.core.clock.generation(MemorySpace::Device);
        let widened = to_f64(value);
        (0..self.layout.total_len()).into_par_iter().for_each(|slot| {
            self.field
                .core
                .debug
                .note_write(0, slot, MemorySpace::Device, generation, widened);
        });
    }

    /// Flat slot for an index.
    ///
    /// # Panics
    /// Panics if the index or component lies outside the captured layout;
    /// indices obtained from [`indices`](Self::indices) are valid by
    /// construction.
    fn slot(&self, index: DeviceIndex, component: usize) -> usize {
        let span = self
            .layout
            .bucket_span(index.bucket as usize)
            .expect("DeviceIndex bucket out of range for captured layout");
        assert!(
            (index.ordinal as usize) < span.entities,
            "DeviceIndex ordinal out of range for bucket"
        );
        let components = self.layout.components();
        assert!(component < components, "component out of range");
        span.offset + index.ordinal as usize * components + component
    }
}

/// Scoped device read pass with per-pass warning suppression.
pub struct DevicePass<'a, V: FieldScalar> {
    view: &'a DeviceField<V>,
    warned: AtomicBool,
}

impl<V: FieldScalar> DevicePass<'_, V> {
    /// Intercepted read of one component of one entity.
    #[track_caller]
    pub fn get(&self, index: DeviceIndex, component: usize) -> V {
        let caller = Location::caller();
        let slot = self.view.slot(index, component);
        let value = self.view.data.read().as_slice()[slot];
        if !SyncDebugger::ENABLED {
            return value;
        }
        let core = &self.view.field.core;
        let hazard = if !self.view.is_current() {
            Some(Hazard::Unrefreshed)
        } else {
            core.debug
                .read_hazard(0, slot, MemorySpace::Device, &core.clock)
        };
        let Some(hazard) = hazard else { return value };
        if self.warned.swap(true, Ordering::Relaxed) {
            return value;
        }
        match hazard {
            Hazard::Stale => core.reporter.stale_access(
                MemorySpace::Device,
                self.view.name(),
                component,
                &value_text(MemorySpace::Device, value),
                caller,
            ),
            Hazard::Unrefreshed => {
                core.reporter
                    .unrefreshed_access(self.view.name(), MemorySpace::Device, caller)
            }
        }
        value
    }
}
