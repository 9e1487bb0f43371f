//! Mirrored fields: per-entity data replicated across host and device.
//!
//! A `Field<V>` couples a [`FieldLayout`] with one host buffer and one
//! device allocation per state, a [`GenerationClock`], and the
//! [`SyncDebugger`] capability. The field never moves data on its own
//! behalf except inside the explicit `sync_to_*` operations; everything
//! else is bookkeeping that the debug layer inspects at access time.
//!
//! `Field` is a cheap handle (`Arc` inner): clone it freely, hold it across
//! mesh modifications, and look it up again from the mesh by id. All
//! methods take `&self`; interior locks serialize buffer access.

use core::panic::Location;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use crate::data::layout::FieldLayout;
use crate::data::storage::{DeviceStorage, Storage, VecStorage};
use crate::data::{FieldScalar, to_f64};
use crate::mirror_error::MeshMirrorError;
use crate::sync::MemorySpace;
use crate::sync::clock::GenerationClock;
use crate::sync::handle::DeviceField;
use crate::sync::intercept::{Hazard, SyncDebugger};
use crate::sync::report::{DiagnosticReporter, value_text};
use crate::topology::bucket::Bucket;
use crate::topology::entity::{EntityId, EntityRank};
use crate::topology::epoch::EpochCounter;

/// Identity and shape of a field.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FieldMeta {
    name: String,
    rank: EntityRank,
    components: usize,
    states: usize,
}

impl FieldMeta {
    pub(crate) fn new(name: String, rank: EntityRank, components: usize, states: usize) -> Self {
        Self {
            name,
            rank,
            components,
            states,
        }
    }

    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entity rank the field attaches to.
    pub fn rank(&self) -> EntityRank {
        self.rank
    }

    /// Scalars per entity.
    pub fn components(&self) -> usize {
        self.components
    }

    /// Number of buffered states; 1 for plain fields.
    pub fn states(&self) -> usize {
        self.states
    }
}

/// One state's pair of mirrored buffers.
#[derive(Debug)]
pub(crate) struct FieldState<V: FieldScalar> {
    pub(crate) host: VecStorage<V>,
    /// Shared so retained device handles keep the allocation they captured
    /// alive after a mesh modification installs a fresh one.
    pub(crate) device: Arc<RwLock<DeviceStorage<V>>>,
}

#[derive(Debug)]
pub(crate) struct FieldCore<V: FieldScalar> {
    pub(crate) meta: FieldMeta,
    pub(crate) clock: GenerationClock,
    pub(crate) debug: SyncDebugger,
    /// Index 0 is the newest state.
    pub(crate) states: RwLock<Vec<FieldState<V>>>,
    pub(crate) layout: RwLock<Arc<FieldLayout>>,
    pub(crate) epoch: EpochCounter,
    pub(crate) reporter: Arc<DiagnosticReporter>,
}

/// User-facing handle to a mirrored field.
#[derive(Debug, Clone)]
pub struct Field<V: FieldScalar> {
    pub(crate) core: Arc<FieldCore<V>>,
}

impl<V: FieldScalar> Field<V> {
    pub(crate) fn new(
        meta: FieldMeta,
        epoch: EpochCounter,
        reporter: Arc<DiagnosticReporter>,
        buckets: &[Bucket],
    ) -> Result<Self, MeshMirrorError> {
        if meta.components == 0 {
            return Err(MeshMirrorError::ZeroComponentField(meta.name.clone()));
        }
        if meta.states == 0 {
            return Err(MeshMirrorError::ZeroStateField(meta.name.clone()));
        }
        let layout = Arc::new(FieldLayout::build(buckets, meta.rank, meta.components, 1));
        let states = (0..meta.states)
            .map(|_| FieldState {
                host: VecStorage::with_len(layout.total_len()),
                device: Arc::new(RwLock::new(DeviceStorage::with_len(layout.total_len()))),
            })
            .collect();
        let debug = SyncDebugger::new(meta.states);
        Ok(Self {
            core: Arc::new(FieldCore {
                meta,
                clock: GenerationClock::default(),
                debug,
                states: RwLock::new(states),
                layout: RwLock::new(layout),
                epoch,
                reporter,
            }),
        })
    }

    /// Field name.
    pub fn name(&self) -> &str {
        self.core.meta.name()
    }

    /// Identity and shape.
    pub fn meta(&self) -> &FieldMeta {
        &self.core.meta
    }

    /// Scalars per entity.
    pub fn components(&self) -> usize {
        self.core.meta.components()
    }

    /// Number of buffered states.
    pub fn states(&self) -> usize {
        self.core.meta.states()
    }

    /// Current layout snapshot.
    pub fn layout(&self) -> Arc<FieldLayout> {
        self.core.layout.read().clone()
    }

    /// Entities with a slot, in layout order.
    pub fn entities(&self) -> Vec<EntityId> {
        self.layout().entities().collect()
    }

    /// Number of buckets covered by the layout.
    pub fn bucket_count(&self) -> usize {
        self.layout().bucket_count()
    }

    /// Current generation of `space`.
    pub fn generation(&self, space: MemorySpace) -> u64 {
        self.core.clock.generation(space)
    }

    /// Declare the host copy modified.
    pub fn modify_on_host(&self) {
        let generation = self.core.clock.declare_modified(MemorySpace::Host);
        log::debug!("field `{}`: modified on Host (gen {generation})", self.name());
    }

    /// Declare the device copy modified.
    pub fn modify_on_device(&self) {
        let generation = self.core.clock.declare_modified(MemorySpace::Device);
        log::debug!("field `{}`: modified on Device (gen {generation})", self.name());
    }

    /// Reconcile the device copy from the host copy. Copies data only when
    /// the device actually lags; a sync without a preceding modify
    /// declaration moves nothing.
    pub fn sync_to_device(&self) {
        self.sync(MemorySpace::Host, MemorySpace::Device);
    }

    /// Reconcile the host copy from the device copy.
    pub fn sync_to_host(&self) {
        self.sync(MemorySpace::Device, MemorySpace::Host);
    }

    fn sync(&self, from: MemorySpace, to: MemorySpace) {
        if self.core.clock.lags(to) {
            let mut states = self.core.states.write();
            let state = &mut states[0];
            match to {
                MemorySpace::Device => {
                    let mut device = state.device.write();
                    device.as_mut_slice().copy_from_slice(state.host.as_slice());
                }
                MemorySpace::Host => {
                    let device = state.device.read();
                    state.host.as_mut_slice().copy_from_slice(device.as_slice());
                }
            }
            drop(states);
            self.core.debug.on_synced(0, from);
            log::debug!("field `{}`: synced {from} -> {to}", self.name());
        }
        self.core.clock.declare_synced(from, to);
    }

    /// Write one component of one entity on the host. Writes are never
    /// validated; only the subsequent declarations matter.
    pub fn write_host(
        &self,
        entity: EntityId,
        component: usize,
        value: V,
    ) -> Result<(), MeshMirrorError> {
        let slot = self.slot_of(entity, component)?;
        {
            let mut states = self.core.states.write();
            states[0].host.as_mut_slice()[slot] = value;
        }
        self.core.debug.note_write(
            0,
            slot,
            MemorySpace::Host,
            self.core.clock.generation(MemorySpace::Host),
            to_f64(value),
        );
        Ok(())
    }

    /// Write a whole bucket's slots on the host. `values` must hold
    /// `entities * components` scalars in slot order.
    pub fn write_host_bucket(
        &self,
        bucket: usize,
        values: &[V],
    ) -> Result<(), MeshMirrorError> {
        let layout = self.layout();
        let span = layout
            .bucket_span(bucket)
            .ok_or(MeshMirrorError::MissingBucket(bucket))?;
        let expected = span.entities * layout.components();
        if values.len() != expected {
            return Err(MeshMirrorError::BucketLengthMismatch {
                expected,
                found: values.len(),
            });
        }
        {
            let mut states = self.core.states.write();
            states[0].host.write_at(span.offset, values)?;
        }
        let generation = self.core.clock.generation(MemorySpace::Host);
        for (i, &value) in values.iter().enumerate() {
            self.core.debug.note_write(
                0,
                span.offset + i,
                MemorySpace::Host,
                generation,
                to_f64(value),
            );
        }
        Ok(())
    }

    /// Begin a host read pass. One pass reports at most one violation for
    /// this field; a new pass re-arms reporting.
    pub fn host_read(&self) -> HostReadPass<'_, V> {
        HostReadPass {
            field: self,
            warned: AtomicBool::new(false),
        }
    }

    /// One-shot intercepted host read; its own single-slot pass.
    #[track_caller]
    pub fn host_value(&self, entity: EntityId, component: usize) -> Result<V, MeshMirrorError> {
        self.host_read().value(entity, component)
    }

    /// Acquire the canonical device-side view. Always observes the current
    /// mesh epoch and rotation count; only views retained across a
    /// modification or rotation can go stale.
    pub fn device(&self) -> DeviceField<V> {
        let layout = self.layout();
        let data = self.core.states.read()[0].device.clone();
        DeviceField::new(
            self.clone(),
            data,
            layout,
            self.core.epoch.current(),
            self.core.debug.rotation_count(),
        )
    }

    /// Uninstrumented snapshot of the newest state's host buffer.
    pub fn host_buffer(&self) -> Vec<V> {
        self.core.states.read()[0].host.as_slice().to_vec()
    }

    /// Uninstrumented snapshot of the newest state's device allocation.
    pub fn device_buffer(&self) -> Vec<V> {
        self.core.states.read()[0].device.read().as_slice().to_vec()
    }

    pub(crate) fn slot_of(
        &self,
        entity: EntityId,
        component: usize,
    ) -> Result<usize, MeshMirrorError> {
        let layout = self.layout();
        let (offset, len) = layout
            .span(entity)
            .ok_or(MeshMirrorError::MissingFieldSlot(entity))?;
        if component >= len {
            return Err(MeshMirrorError::ComponentOutOfRange {
                name: self.name().to_owned(),
                component,
                components: len,
            });
        }
        Ok(offset + component)
    }

    /// Rebuild storage over a fresh bucket list after a mesh modification.
    /// Host data for surviving entities is preserved; each state gets a new
    /// device allocation structurally refreshed from its host buffer, and
    /// the field is implicitly declared modified on the host (the
    /// repartitioning itself touched host storage).
    pub(crate) fn rebuild(&self, buckets: &[Bucket]) {
        let old_layout = self.layout();
        let layout = Arc::new(FieldLayout::build(
            buckets,
            self.core.meta.rank(),
            self.core.meta.components(),
            old_layout.version() + 1,
        ));
        let mut states = self.core.states.write();
        for state in states.iter_mut() {
            let mut host = VecStorage::with_len(layout.total_len());
            for entity in layout.entities() {
                if let (Some((new_off, len)), Some((old_off, _))) =
                    (layout.span(entity), old_layout.span(entity))
                {
                    let src = &state.host.as_slice()[old_off..old_off + len];
                    host.as_mut_slice()[new_off..new_off + len].copy_from_slice(src);
                }
            }
            let mut device = DeviceStorage::with_len(layout.total_len());
            device.as_mut_slice().copy_from_slice(host.as_slice());
            state.host = host;
            state.device = Arc::new(RwLock::new(device));
        }
        drop(states);
        *self.core.layout.write() = layout;
        self.core.debug.on_layout_rebuilt();
        self.core.clock.declare_modified(MemorySpace::Host);
        log::debug!(
            "field `{}`: storage rebuilt over {} bucket(s)",
            self.name(),
            self.bucket_count()
        );
    }

    /// Rotation precondition; checked for every multi-state field before
    /// any buffers move.
    pub(crate) fn validate_rotation(&self) -> Result<(), MeshMirrorError> {
        if self.core.meta.states() < 2 {
            return Ok(());
        }
        self.core.debug.check_rotation(self.name(), &self.core.clock)
    }

    /// Rotate state buffers: the oldest state's storage is recycled as the
    /// new newest state. Retained device views become logically undefined
    /// until re-acquired.
    pub(crate) fn rotate_states(&self) {
        if self.core.meta.states() < 2 {
            return;
        }
        self.core.states.write().rotate_right(1);
        self.core.debug.on_rotated();
        log::debug!("field `{}`: states rotated", self.name());
    }
}

/// Scoped host read pass with per-pass warning suppression.
pub struct HostReadPass<'a, V: FieldScalar> {
    field: &'a Field<V>,
    warned: AtomicBool,
}

impl<V: FieldScalar> HostReadPass<'_, V> {
    /// Intercepted read of one component of one entity.
    #[track_caller]
    pub fn value(&self, entity: EntityId, component: usize) -> Result<V, MeshMirrorError> {
        let caller = Location::caller();
        let slot = self.field.slot_of(entity, component)?;
        let value = self.field.core.states.read()[0].host.as_slice()[slot];
        self.intercept(slot, component, value, caller);
        Ok(value)
    }

    /// Intercepted read of a whole bucket's slots.
    #[track_caller]
    pub fn bucket_values(&self, bucket: usize) -> Result<Vec<V>, MeshMirrorError> {
        let caller = Location::caller();
        let layout = self.field.layout();
        let span = layout
            .bucket_span(bucket)
            .ok_or(MeshMirrorError::MissingBucket(bucket))?;
        let components = layout.components();
        let len = span.entities * components;
        let values = self.field.core.states.read()[0]
            .host
            .read_range(span.offset, len)?;
        for (i, &value) in values.iter().enumerate() {
            self.intercept(span.offset + i, i % components, value, caller);
        }
        Ok(values)
    }

    fn intercept(
        &self,
        slot: usize,
        component: usize,
        value: V,
        caller: &'static Location<'static>,
    ) {
        let core = &self.field.core;
        let Some(hazard) = core
            .debug
            .read_hazard(0, slot, MemorySpace::Host, &core.clock)
        else {
            return;
        };
        if self.warned.swap(true, Ordering::Relaxed) {
            return;
        }
        match hazard {
            Hazard::Stale => core.reporter.stale_access(
                MemorySpace::Host,
                self.field.name(),
                component,
                &value_text(MemorySpace::Host, value),
                caller,
            ),
            Hazard::Unrefreshed => {
                core.reporter
                    .unrefreshed_access(self.field.name(), MemorySpace::Host, caller)
            }
        }
    }
}
