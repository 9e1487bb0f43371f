//! Shared fixture for the coherency-tracking scenario tests.
//!
//! Mirrors the shape of the scenarios the tracker is built for: a small
//! element mesh partitioned into named parts, one field under test filled
//! with `10 * id + component`, and read/write helpers at both access
//! granularities. Warning assertions work on the captured diagnostic lines.

#![allow(dead_code)]

use mesh_mirror::prelude::*;

pub fn eid(raw: u64) -> EntityId {
    EntityId::new(raw).unwrap()
}

/// Mesh over `parts` (entity count per part), ids assigned 1..N in order.
pub fn build_mesh(parts: &[(usize, &str)], bucket_capacity: usize) -> (Mesh, CaptureSink) {
    let sink = CaptureSink::default();
    let mut mesh = Mesh::builder()
        .with_bucket_capacity(bucket_capacity)
        .with_diagnostic_sink(sink.clone())
        .with_debug_config(DebugConfig {
            capture_location: true,
        })
        .build();
    for &(_, part) in parts {
        mesh.declare_part(part);
    }
    (mesh, sink)
}

pub fn build_field<V: FieldScalar>(
    name: &str,
    parts: &[(usize, &str)],
    components: usize,
    states: usize,
    bucket_capacity: usize,
) -> (Mesh, CaptureSink, Field<V>) {
    let (mut mesh, sink) = build_mesh(parts, bucket_capacity);
    let id = mesh
        .declare_field::<V>(name, EntityRank::Element, components, states)
        .unwrap();
    let mut next = 1u64;
    mesh.modify(|m| {
        for &(count, part) in parts {
            for _ in 0..count {
                m.create_entity(eid(next), EntityRank::Element, part);
                next += 1;
            }
        }
    })
    .unwrap();
    let field = mesh.field::<V>(id).unwrap();
    fill_initial_field(&field);
    (mesh, sink, field)
}

/// Field filled and reconciled: the device copy is initialized and the
/// declarations are caught up, so scenarios start warning-free.
pub fn build_initialized_field<V: FieldScalar>(
    name: &str,
    parts: &[(usize, &str)],
    components: usize,
    states: usize,
    bucket_capacity: usize,
) -> (Mesh, CaptureSink, Field<V>) {
    let (mesh, sink, field) = build_field::<V>(name, parts, components, states, bucket_capacity);
    initialize_device_field(&field);
    sink.take();
    (mesh, sink, field)
}

pub fn build_scalar_field(
    name: &str,
    parts: &[(usize, &str)],
) -> (Mesh, CaptureSink, Field<f64>) {
    build_initialized_field(name, parts, 1, 1, 512)
}

pub fn build_vector_field(
    name: &str,
    parts: &[(usize, &str)],
) -> (Mesh, CaptureSink, Field<f64>) {
    build_initialized_field(name, parts, 3, 1, 512)
}

/// `10 * id + component`, the conventional recognizable initial pattern.
pub fn fill_initial_field<V: FieldScalar>(field: &Field<V>) {
    for entity in field.entities() {
        for component in 0..field.components() {
            let value: V = num_traits::cast(10 * entity.get() + component as u64).unwrap();
            field.write_host(entity, component, value).unwrap();
        }
    }
}

/// Bring the device copy up to date with proper declarations.
pub fn initialize_device_field<V: FieldScalar>(field: &Field<V>) {
    field.modify_on_host();
    field.sync_to_device();
}

pub fn write_field_on_host<V: FieldScalar>(field: &Field<V>, component: usize, value: V) {
    for entity in field.entities() {
        field.write_host(entity, component, value).unwrap();
    }
}

pub fn write_field_on_host_by_bucket<V: FieldScalar>(field: &Field<V>, component: usize, value: V) {
    let layout = field.layout();
    for bucket in 0..field.bucket_count() {
        let span = layout.bucket_span(bucket).unwrap();
        let mut values = field.host_buffer()
            [span.offset..span.offset + span.entities * layout.components()]
            .to_vec();
        for entity_slot in values.chunks_mut(layout.components()) {
            entity_slot[component] = value;
        }
        field.write_host_bucket(bucket, &values).unwrap();
    }
}

pub fn write_field_on_device<V: FieldScalar>(field: &Field<V>, component: usize, value: V) {
    let view = field.device();
    for index in view.indices() {
        view.set(index, component, value);
    }
}

/// Whole-field device read through a freshly acquired view; one pass.
#[track_caller]
pub fn read_field_on_device<V: FieldScalar>(field: &Field<V>) {
    let view = field.device();
    read_view_on_device(&view);
}

/// Whole-field device read through a caller-retained view; one pass.
#[track_caller]
pub fn read_view_on_device<V: FieldScalar>(view: &DeviceField<V>) {
    let pass = view.read_pass();
    for index in view.indices() {
        for component in 0..view.components() {
            let _ = pass.get(index, component);
        }
    }
}

/// Whole-field host read, entity granularity; one pass.
#[track_caller]
pub fn read_field_on_host_by_entity<V: FieldScalar>(field: &Field<V>) {
    let pass = field.host_read();
    for entity in field.entities() {
        for component in 0..field.components() {
            let _ = pass.value(entity, component).unwrap();
        }
    }
}

/// Whole-field host read, bucket granularity; one pass.
#[track_caller]
pub fn read_field_on_host_by_bucket<V: FieldScalar>(field: &Field<V>) {
    let pass = field.host_read();
    for bucket in 0..field.bucket_count() {
        let _ = pass.bucket_values(bucket).unwrap();
    }
}

/// Assert `needle` occurs in exactly `expected` captured lines, then drop
/// those lines.
pub fn extract_warning(lines: &mut Vec<String>, expected: usize, needle: &str) {
    let found = lines.iter().filter(|l| l.contains(needle)).count();
    assert_eq!(
        found, expected,
        "expected {expected} occurrence(s) of {needle:?}, found {found} in {lines:#?}"
    );
    lines.retain(|l| !l.contains(needle));
}

pub fn check_no_warnings(lines: &[String]) {
    assert!(lines.is_empty(), "unexpected diagnostics: {lines:#?}");
}
