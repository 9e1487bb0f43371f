//! Field registry: owns every declared field behind a type-erased facade.
//!
//! The registry is the tracker-side listener for mesh structural changes:
//! the mesh invokes the `on_*` notification hooks for each kind of change
//! in a batch, then `rebuild_all` once the new bucket list is final. State
//! rotation is two-phase — every multi-state field is validated before any
//! buffers move, so a refused rotation leaves all fields untouched.

use std::any::Any;
use std::sync::Arc;

use hashbrown::HashMap;

use crate::data::field::{Field, FieldMeta};
use crate::data::FieldScalar;
use crate::mirror_error::MeshMirrorError;
use crate::sync::report::DiagnosticReporter;
use crate::topology::bucket::Bucket;
use crate::topology::entity::{EntityId, EntityRank};
use crate::topology::epoch::EpochCounter;

/// Opaque handle to a declared field.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FieldId(pub(crate) u32);

/// Object-safe view of a field, independent of its scalar type.
trait AnyField: Send + Sync {
    fn meta(&self) -> &FieldMeta;
    fn rebuild(&self, buckets: &[Bucket]);
    fn validate_rotation(&self) -> Result<(), MeshMirrorError>;
    fn rotate_states(&self);
    fn as_any(&self) -> &dyn Any;
}

impl<V: FieldScalar> AnyField for Field<V> {
    // Dot syntax resolves to the inherent methods, not back into this impl.
    fn meta(&self) -> &FieldMeta {
        self.meta()
    }

    fn rebuild(&self, buckets: &[Bucket]) {
        self.rebuild(buckets);
    }

    fn validate_rotation(&self) -> Result<(), MeshMirrorError> {
        self.validate_rotation()
    }

    fn rotate_states(&self) {
        self.rotate_states();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(crate) struct FieldRegistry {
    fields: Vec<Box<dyn AnyField>>,
    by_name: HashMap<String, FieldId>,
    epoch: EpochCounter,
    reporter: Arc<DiagnosticReporter>,
}

impl FieldRegistry {
    pub(crate) fn new(epoch: EpochCounter, reporter: Arc<DiagnosticReporter>) -> Self {
        Self {
            fields: Vec::new(),
            by_name: HashMap::new(),
            epoch,
            reporter,
        }
    }

    pub(crate) fn declare<V: FieldScalar>(
        &mut self,
        name: &str,
        rank: EntityRank,
        components: usize,
        states: usize,
        buckets: &[Bucket],
    ) -> Result<FieldId, MeshMirrorError> {
        if self.by_name.contains_key(name) {
            return Err(MeshMirrorError::DuplicateField(name.to_owned()));
        }
        let meta = FieldMeta::new(name.to_owned(), rank, components, states);
        let field = Field::<V>::new(meta, self.epoch.clone(), self.reporter.clone(), buckets)?;
        let id = FieldId(self.fields.len() as u32);
        self.fields.push(Box::new(field));
        self.by_name.insert(name.to_owned(), id);
        Ok(id)
    }

    pub(crate) fn get<V: FieldScalar>(&self, id: FieldId) -> Result<Field<V>, MeshMirrorError> {
        let entry = self
            .fields
            .get(id.0 as usize)
            .ok_or_else(|| MeshMirrorError::UnknownField(format!("#{}", id.0)))?;
        entry
            .as_any()
            .downcast_ref::<Field<V>>()
            .cloned()
            .ok_or_else(|| MeshMirrorError::FieldTypeMismatch(entry.meta().name().to_owned()))
    }

    pub(crate) fn id_of(&self, name: &str) -> Option<FieldId> {
        self.by_name.get(name).copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.fields.len()
    }

    // Mesh notification hooks; the epoch bump itself happens once per batch
    // on the mesh side, after all hooks have fired.

    pub(crate) fn on_entities_added(&self, entities: &[EntityId]) {
        log::debug!("registry: {} entity(ies) added", entities.len());
    }

    pub(crate) fn on_entities_removed(&self, entities: &[EntityId]) {
        log::debug!("registry: {} entity(ies) removed", entities.len());
    }

    pub(crate) fn on_part_membership_changed(&self, entities: &[EntityId]) {
        log::debug!(
            "registry: part membership changed for {} entity(ies)",
            entities.len()
        );
    }

    /// Rebuild every field's storage over the final bucket list.
    pub(crate) fn rebuild_all(&self, buckets: &[Bucket]) {
        for field in &self.fields {
            field.rebuild(buckets);
        }
    }

    /// Rotate every multi-state field, validating all of them first.
    pub(crate) fn update_field_states(&self) -> Result<(), MeshMirrorError> {
        for field in &self.fields {
            field.validate_rotation()?;
        }
        for field in &self.fields {
            field.rotate_states();
        }
        Ok(())
    }
}
