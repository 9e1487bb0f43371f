//! Structural-modification scenarios: part-membership changes, bucket
//! creation, and bucket deletion, read back through freshly fetched and
//! retained device views. A fresh view observes the current epoch and
//! reports ordinary staleness; a view retained across the modification
//! reports the un-updated hazard regardless of any declarations in
//! between, and that structural hazard takes priority over staleness.

mod common;

use common::*;
use mesh_mirror::prelude::*;

const UNREFRESHED: &str =
    "WARNING: Accessing un-updated Field pressure on Device after mesh modification";

#[test]
fn change_part_then_fresh_view_reports_staleness() {
    let (mut mesh, sink, field) =
        build_scalar_field("pressure", &[(2, "block_a"), (1, "block_b")]);

    mesh.modify(|m| m.change_part(eid(2), "block_b")).unwrap();
    write_field_on_host(&field, 0, 3.14);

    read_field_on_device(&field);

    let mut lines = sink.take();
    extract_warning(
        &mut lines,
        1,
        "WARNING: Accessing stale data on Device for Field pressure[0]=10.000000",
    );
    check_no_warnings(&lines);
}

#[test]
fn change_part_then_retained_view_reports_unrefreshed() {
    let (mut mesh, sink, field) =
        build_scalar_field("pressure", &[(2, "block_a"), (1, "block_b")]);
    let view = field.device();
    assert!(view.is_current());

    mesh.modify(|m| m.change_part(eid(2), "block_b")).unwrap();
    write_field_on_host(&field, 0, 3.14);

    assert!(!view.is_current());
    read_view_on_device(&view);

    let mut lines = sink.take();
    extract_warning(&mut lines, 1, UNREFRESHED);
    check_no_warnings(&lines);
}

#[test]
fn retained_view_warns_even_with_proper_declarations() {
    let (mut mesh, sink, field) =
        build_scalar_field("pressure", &[(2, "block_a"), (1, "block_b")]);
    let view = field.device();

    mesh.modify(|m| m.change_part(eid(2), "block_b")).unwrap();
    write_field_on_host(&field, 0, 3.14);
    field.modify_on_host();
    field.sync_to_device();

    read_view_on_device(&view);

    // Structural hazard wins: no stale-data line, only the un-updated one.
    let mut lines = sink.take();
    extract_warning(&mut lines, 1, UNREFRESHED);
    check_no_warnings(&lines);
}

#[test]
fn fresh_view_with_proper_declarations_is_clean() {
    let (mut mesh, sink, field) =
        build_scalar_field("pressure", &[(2, "block_a"), (1, "block_b")]);

    mesh.modify(|m| m.change_part(eid(2), "block_b")).unwrap();
    write_field_on_host(&field, 0, 3.14);
    field.modify_on_host();
    field.sync_to_device();

    read_field_on_device(&field);
    check_no_warnings(&sink.take());
}

#[test]
fn entity_creation_stales_retained_views() {
    let (mut mesh, sink, field) =
        build_initialized_field::<f64>("pressure", &[(1, "block_a"), (1, "block_b")], 1, 1, 1);
    let view = field.device();

    mesh.modify(|m| m.create_entity(eid(3), EntityRank::Element, "block_a"))
        .unwrap();
    write_field_on_host(&field, 0, 3.14);

    read_view_on_device(&view);
    let mut lines = sink.take();
    extract_warning(&mut lines, 1, UNREFRESHED);
    check_no_warnings(&lines);

    // A fresh fetch sees the grown layout and plain staleness instead.
    assert_eq!(field.entities().len(), 3);
    read_field_on_device(&field);
    let mut lines = sink.take();
    extract_warning(
        &mut lines,
        1,
        "WARNING: Accessing stale data on Device for Field pressure[0]=10.000000",
    );
    check_no_warnings(&lines);
}

#[test]
fn entity_destruction_stales_retained_views() {
    let (mut mesh, sink, field) =
        build_initialized_field::<f64>("pressure", &[(2, "block_a"), (1, "block_b")], 1, 1, 1);
    let view = field.device();

    mesh.modify(|m| m.destroy_entity(eid(2))).unwrap();
    write_field_on_host(&field, 0, 3.14);

    assert!(!mesh.contains_entity(eid(2)));
    read_view_on_device(&view);

    let mut lines = sink.take();
    extract_warning(&mut lines, 1, UNREFRESHED);
    check_no_warnings(&lines);

    // Surviving entities keep their host values across the rebuild.
    assert_eq!(field.entities(), vec![eid(1), eid(3)]);
}

#[test]
fn one_batch_is_one_epoch_for_retained_views() {
    let (mut mesh, sink, field) =
        build_scalar_field("pressure", &[(2, "block_a"), (1, "block_b")]);
    let view = field.device();
    let before = mesh.epoch();

    mesh.modify(|m| {
        m.create_entity(eid(4), EntityRank::Element, "block_a");
        m.change_part(eid(2), "block_b");
        m.destroy_entity(eid(3));
    })
    .unwrap();

    assert_ne!(before, mesh.epoch());
    read_view_on_device(&view);

    let mut lines = sink.take();
    extract_warning(&mut lines, 1, UNREFRESHED);
    check_no_warnings(&lines);
}

#[test]
fn retained_view_still_reads_its_captured_allocation() {
    let (mut mesh, sink, field) =
        build_scalar_field("pressure", &[(2, "block_a"), (1, "block_b")]);
    let view = field.device();

    mesh.modify(|m| m.destroy_entity(eid(3))).unwrap();

    // The captured allocation predates the rebuild: full original extent,
    // original values. Reading it is safe, just flagged.
    let pass = view.read_pass();
    let values: Vec<f64> = view.indices().iter().map(|&i| pass.get(i, 0)).collect();
    assert_eq!(values, vec![10.0, 20.0, 30.0]);

    let mut lines = sink.take();
    extract_warning(&mut lines, 1, UNREFRESHED);
    check_no_warnings(&lines);
}
