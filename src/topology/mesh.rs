//! The bucket container: a minimal mesh collaborator for the tracker.
//!
//! `Mesh` owns the entity/part membership, the deterministic bucket
//! partitioning, the structural epoch, and the field registry. It is not a
//! mesh database — connectivity, ownership, and communication live
//! elsewhere; the tracker only needs a container that (a) partitions
//! entities into buckets, (b) notifies the registry when that partitioning
//! changes, and (c) bumps the epoch exactly once per modification batch.
//!
//! Structural changes go through [`Mesh::modify`], which stages a batch of
//! entity creations, destructions, and part-membership changes, validates
//! the whole batch up front, applies it, rebuilds the buckets (part
//! declaration order, then ascending entity id, split at the bucket
//! capacity), and bumps the epoch once.

use std::sync::Arc;

use hashbrown::HashMap;
use itertools::Itertools;

use crate::config::DebugConfig;
use crate::data::FieldScalar;
use crate::data::field::Field;
use crate::data::registry::{FieldId, FieldRegistry};
use crate::debug_invariants::DebugInvariants;
use crate::mirror_error::MeshMirrorError;
use crate::sync::report::{DiagnosticReporter, DiagnosticSink, StderrSink};
use crate::topology::bucket::Bucket;
use crate::topology::entity::{EntityId, EntityRank};
use crate::topology::epoch::{EpochCounter, EpochStamp};

/// Default number of entities per bucket.
pub const DEFAULT_BUCKET_CAPACITY: usize = 512;

/// Configures and builds a [`Mesh`].
pub struct MeshBuilder {
    bucket_capacity: usize,
    sink: Box<dyn DiagnosticSink>,
    config: DebugConfig,
}

impl Default for MeshBuilder {
    fn default() -> Self {
        Self {
            bucket_capacity: DEFAULT_BUCKET_CAPACITY,
            sink: Box::new(StderrSink),
            config: DebugConfig::default(),
        }
    }
}

impl MeshBuilder {
    /// Start from the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Entities per bucket before a new bucket is opened. Clamped to at
    /// least 1.
    pub fn with_bucket_capacity(mut self, capacity: usize) -> Self {
        self.bucket_capacity = capacity.max(1);
        self
    }

    /// Destination for coherency diagnostics.
    pub fn with_diagnostic_sink(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Override the environment-derived debug configuration.
    pub fn with_debug_config(mut self, config: DebugConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the mesh.
    pub fn build(self) -> Mesh {
        let epoch = EpochCounter::default();
        let reporter = Arc::new(DiagnosticReporter::new(self.sink, self.config));
        Mesh {
            bucket_capacity: self.bucket_capacity,
            parts: Vec::new(),
            membership: HashMap::new(),
            buckets: Vec::new(),
            registry: FieldRegistry::new(epoch.clone(), reporter),
            epoch,
        }
    }
}

/// Partitioned, mutable entity container with mirrored field storage.
pub struct Mesh {
    bucket_capacity: usize,
    /// Declared parts, in declaration order; bucket order follows it.
    parts: Vec<String>,
    membership: HashMap<EntityId, (EntityRank, usize)>,
    buckets: Vec<Bucket>,
    epoch: EpochCounter,
    registry: FieldRegistry,
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

impl Mesh {
    /// Mesh with default configuration.
    pub fn new() -> Self {
        MeshBuilder::default().build()
    }

    /// Builder for a configured mesh.
    pub fn builder() -> MeshBuilder {
        MeshBuilder::default()
    }

    /// Declare a part. Idempotent; bucket order follows declaration order.
    pub fn declare_part(&mut self, name: &str) {
        if !self.parts.iter().any(|p| p == name) {
            self.parts.push(name.to_owned());
        }
    }

    fn part_index(&self, name: &str) -> Result<usize, MeshMirrorError> {
        self.parts
            .iter()
            .position(|p| p == name)
            .ok_or_else(|| MeshMirrorError::UnknownPart(name.to_owned()))
    }

    /// Declare a mirrored field over the entities of `rank`.
    pub fn declare_field<V: FieldScalar>(
        &mut self,
        name: &str,
        rank: EntityRank,
        components: usize,
        states: usize,
    ) -> Result<FieldId, MeshMirrorError> {
        self.registry
            .declare::<V>(name, rank, components, states, &self.buckets)
    }

    /// Look up a declared field with its scalar type.
    pub fn field<V: FieldScalar>(&self, id: FieldId) -> Result<Field<V>, MeshMirrorError> {
        self.registry.get(id)
    }

    /// Id of a field by name.
    pub fn field_id(&self, name: &str) -> Option<FieldId> {
        self.registry.id_of(name)
    }

    /// Number of declared fields.
    pub fn field_count(&self) -> usize {
        self.registry.len()
    }

    /// Rotate the state buffers of every multi-state field.
    ///
    /// # Errors
    /// Fails with [`MeshMirrorError::StateRotationUnreconciled`] — before
    /// any buffers move — if any field's device copy has unreconciled
    /// modifications.
    pub fn update_field_states(&self) -> Result<(), MeshMirrorError> {
        self.registry.update_field_states()
    }

    /// Apply a batch of structural changes. The whole batch is validated
    /// before anything is applied; a non-empty batch bumps the epoch
    /// exactly once and rebuilds every field's storage.
    pub fn modify(
        &mut self,
        f: impl FnOnce(&mut MeshModification),
    ) -> Result<(), MeshMirrorError> {
        let mut batch = MeshModification::default();
        f(&mut batch);
        if batch.is_empty() {
            return Ok(());
        }
        self.validate(&batch)?;

        let created: Vec<EntityId> = batch.created.iter().map(|(e, _, _)| *e).collect();
        let destroyed: Vec<EntityId> = batch.destroyed.clone();
        let moved: Vec<EntityId> = batch.moved.iter().map(|(e, _)| *e).collect();

        for (entity, rank, part) in &batch.created {
            let part_idx = self.part_index(part)?;
            self.membership.insert(*entity, (*rank, part_idx));
        }
        for entity in &batch.destroyed {
            self.membership.remove(entity);
        }
        for (entity, part) in &batch.moved {
            let part_idx = self.part_index(part)?;
            if let Some(record) = self.membership.get_mut(entity) {
                record.1 = part_idx;
            }
        }

        if !created.is_empty() {
            self.registry.on_entities_added(&created);
        }
        if !destroyed.is_empty() {
            self.registry.on_entities_removed(&destroyed);
        }
        if !moved.is_empty() {
            self.registry.on_part_membership_changed(&moved);
        }

        self.rebuild_buckets();
        let stamp = self.epoch.bump();
        self.registry.rebuild_all(&self.buckets);
        self.debug_assert_invariants();
        log::debug!(
            "mesh modification applied: +{} -{} ~{} entities, epoch {:?}",
            created.len(),
            destroyed.len(),
            moved.len(),
            stamp
        );
        Ok(())
    }

    fn validate(&self, batch: &MeshModification) -> Result<(), MeshMirrorError> {
        let mut fresh = std::collections::HashSet::new();
        for (entity, _, part) in &batch.created {
            self.part_index(part)?;
            if self.membership.contains_key(entity) || !fresh.insert(*entity) {
                return Err(MeshMirrorError::DuplicateEntity(*entity));
            }
        }
        for entity in &batch.destroyed {
            if !self.membership.contains_key(entity) {
                return Err(MeshMirrorError::MissingEntity(*entity));
            }
        }
        for (entity, part) in &batch.moved {
            self.part_index(part)?;
            if !self.membership.contains_key(entity) {
                return Err(MeshMirrorError::MissingEntity(*entity));
            }
        }
        Ok(())
    }

    fn rebuild_buckets(&mut self) {
        let mut rows: Vec<(EntityRank, usize, EntityId)> = self
            .membership
            .iter()
            .map(|(&entity, &(rank, part))| (rank, part, entity))
            .collect();
        rows.sort_unstable();

        let mut buckets = Vec::new();
        for ((rank, part_idx), group) in &rows.iter().chunk_by(|&&(rank, part, _)| (rank, part)) {
            let ids: Vec<EntityId> = group.map(|&(_, _, entity)| entity).collect();
            for chunk in ids.chunks(self.bucket_capacity) {
                buckets.push(Bucket::new(rank, self.parts[part_idx].clone(), chunk.to_vec()));
            }
        }
        self.buckets = buckets;
    }

    /// Buckets of one rank, in bucket order.
    pub fn buckets(&self, rank: EntityRank) -> impl Iterator<Item = &Bucket> {
        self.buckets.iter().filter(move |b| b.rank() == rank)
    }

    /// True iff the entity is alive in the mesh.
    pub fn contains_entity(&self, entity: EntityId) -> bool {
        self.membership.contains_key(&entity)
    }

    /// Number of live entities of `rank`.
    pub fn entity_count(&self, rank: EntityRank) -> usize {
        self.membership.values().filter(|(r, _)| *r == rank).count()
    }

    /// Current structural epoch.
    pub fn epoch(&self) -> EpochStamp {
        self.epoch.current()
    }
}

impl DebugInvariants for Mesh {
    fn debug_assert_invariants(&self) {
        crate::debug_assert_ok!(self.validate_invariants(), "Mesh invalid");
    }

    fn validate_invariants(&self) -> Result<(), MeshMirrorError> {
        let mut seen = 0usize;
        for bucket in &self.buckets {
            if bucket.is_empty() {
                return Err(MeshMirrorError::MeshInvariant("empty bucket"));
            }
            if bucket.len() > self.bucket_capacity {
                return Err(MeshMirrorError::MeshInvariant("bucket over capacity"));
            }
            for entity in bucket.entities() {
                match self.membership.get(&entity) {
                    Some(&(rank, part)) => {
                        if rank != bucket.rank() || self.parts[part] != bucket.part() {
                            return Err(MeshMirrorError::MeshInvariant(
                                "bucket disagrees with membership",
                            ));
                        }
                    }
                    None => {
                        return Err(MeshMirrorError::MeshInvariant(
                            "bucket entity missing from membership",
                        ));
                    }
                }
                seen += 1;
            }
        }
        if seen != self.membership.len() {
            return Err(MeshMirrorError::MeshInvariant(
                "buckets do not partition the membership",
            ));
        }
        Ok(())
    }
}

/// A staged batch of structural changes.
#[derive(Debug, Default)]
pub struct MeshModification {
    created: Vec<(EntityId, EntityRank, String)>,
    destroyed: Vec<EntityId>,
    moved: Vec<(EntityId, String)>,
}

impl MeshModification {
    /// Stage an entity creation in `part`.
    pub fn create_entity(&mut self, entity: EntityId, rank: EntityRank, part: &str) {
        self.created.push((entity, rank, part.to_owned()));
    }

    /// Stage an entity destruction.
    pub fn destroy_entity(&mut self, entity: EntityId) {
        self.destroyed.push(entity);
    }

    /// Stage a part-membership change.
    pub fn change_part(&mut self, entity: EntityId, part: &str) {
        self.moved.push((entity, part.to_owned()));
    }

    fn is_empty(&self) -> bool {
        self.created.is_empty() && self.destroyed.is_empty() && self.moved.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eid(raw: u64) -> EntityId {
        EntityId::new(raw).unwrap()
    }

    fn mesh_with_parts() -> Mesh {
        let mut mesh = Mesh::builder().with_bucket_capacity(2).build();
        mesh.declare_part("block_a");
        mesh.declare_part("block_b");
        mesh
    }

    #[test]
    fn buckets_follow_part_order_then_id() {
        let mut mesh = mesh_with_parts();
        mesh.modify(|m| {
            m.create_entity(eid(3), EntityRank::Element, "block_b");
            m.create_entity(eid(1), EntityRank::Element, "block_a");
            m.create_entity(eid(2), EntityRank::Element, "block_a");
        })
        .unwrap();
        let buckets: Vec<_> = mesh.buckets(EntityRank::Element).collect();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].part(), "block_a");
        assert_eq!(
            buckets[0].entities().collect::<Vec<_>>(),
            vec![eid(1), eid(2)]
        );
        assert_eq!(buckets[1].part(), "block_b");
        assert_eq!(buckets[1].entities().collect::<Vec<_>>(), vec![eid(3)]);
    }

    #[test]
    fn capacity_splits_buckets() {
        let mut mesh = mesh_with_parts();
        mesh.modify(|m| {
            for raw in 1..=5 {
                m.create_entity(eid(raw), EntityRank::Element, "block_a");
            }
        })
        .unwrap();
        let sizes: Vec<_> = mesh.buckets(EntityRank::Element).map(Bucket::len).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(mesh.entity_count(EntityRank::Element), 5);
    }

    #[test]
    fn epoch_bumps_once_per_batch() {
        let mut mesh = mesh_with_parts();
        let before = mesh.epoch();
        mesh.modify(|m| {
            m.create_entity(eid(1), EntityRank::Element, "block_a");
            m.create_entity(eid(2), EntityRank::Element, "block_a");
            m.create_entity(eid(3), EntityRank::Element, "block_b");
        })
        .unwrap();
        let after = mesh.epoch();
        assert_ne!(before, after);

        // Destruction and membership change batch: one more bump.
        mesh.modify(|m| {
            m.destroy_entity(eid(3));
            m.change_part(eid(1), "block_b");
        })
        .unwrap();
        assert_ne!(after, mesh.epoch());
        assert!(!mesh.contains_entity(eid(3)));
    }

    #[test]
    fn empty_batch_does_not_bump_epoch() {
        let mut mesh = mesh_with_parts();
        let before = mesh.epoch();
        mesh.modify(|_| {}).unwrap();
        assert_eq!(before, mesh.epoch());
    }

    #[test]
    fn validation_rejects_bad_batches_atomically() {
        let mut mesh = mesh_with_parts();
        mesh.modify(|m| m.create_entity(eid(1), EntityRank::Element, "block_a"))
            .unwrap();
        let before = mesh.epoch();

        let err = mesh
            .modify(|m| {
                m.create_entity(eid(2), EntityRank::Element, "block_a");
                m.create_entity(eid(1), EntityRank::Element, "block_a");
            })
            .unwrap_err();
        assert_eq!(err, MeshMirrorError::DuplicateEntity(eid(1)));
        // Nothing applied, no epoch bump.
        assert!(!mesh.contains_entity(eid(2)));
        assert_eq!(before, mesh.epoch());

        let err = mesh
            .modify(|m| m.destroy_entity(eid(9)))
            .unwrap_err();
        assert_eq!(err, MeshMirrorError::MissingEntity(eid(9)));

        let err = mesh
            .modify(|m| m.change_part(eid(1), "nowhere"))
            .unwrap_err();
        assert_eq!(err, MeshMirrorError::UnknownPart("nowhere".to_owned()));
    }

    #[test]
    fn declare_part_is_idempotent() {
        let mut mesh = Mesh::new();
        mesh.declare_part("block_a");
        mesh.declare_part("block_a");
        mesh.declare_part("block_b");
        assert_eq!(mesh.parts, vec!["block_a", "block_b"]);
    }

    #[test]
    fn field_declaration_and_typed_lookup() {
        let mut mesh = mesh_with_parts();
        let id = mesh
            .declare_field::<f64>("pressure", EntityRank::Element, 1, 1)
            .unwrap();
        assert_eq!(mesh.field_id("pressure"), Some(id));
        assert_eq!(mesh.field_count(), 1);
        assert!(mesh.field::<f64>(id).is_ok());
        assert_eq!(
            mesh.field::<i32>(id).unwrap_err(),
            MeshMirrorError::FieldTypeMismatch("pressure".to_owned())
        );
        assert_eq!(
            mesh.declare_field::<f64>("pressure", EntityRank::Element, 1, 1)
                .unwrap_err(),
            MeshMirrorError::DuplicateField("pressure".to_owned())
        );
    }

    #[test]
    fn invariants_hold_after_modifications() {
        let mut mesh = mesh_with_parts();
        mesh.modify(|m| {
            for raw in 1..=7 {
                m.create_entity(eid(raw), EntityRank::Element, "block_a");
            }
        })
        .unwrap();
        mesh.modify(|m| {
            m.destroy_entity(eid(4));
            m.change_part(eid(5), "block_b");
        })
        .unwrap();
        assert!(mesh.validate_invariants().is_ok());
    }
}
