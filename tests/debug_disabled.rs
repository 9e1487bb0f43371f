//! Built without the `sync-debug` feature, the tracker compiles to no-ops:
//! the same staged violations emit nothing and rotation is unchecked.
//! (Run with `--no-default-features` to compile this suite.)

#![cfg(not(feature = "sync-debug"))]

mod common;

use common::*;

#[test]
fn staged_violations_emit_nothing() {
    let (_mesh, sink, field) = build_scalar_field("pressure", &[(2, "block_a")]);

    write_field_on_host(&field, 0, 3.14);
    read_field_on_device(&field);

    write_field_on_device(&field, 0, 2.18);
    read_field_on_host_by_entity(&field);

    check_no_warnings(&sink.take());
}

#[test]
fn retained_views_never_warn() {
    let (mut mesh, sink, field) =
        build_scalar_field("pressure", &[(2, "block_a"), (1, "block_b")]);
    let view = field.device();

    mesh.modify(|m| m.change_part(eid(2), "block_b")).unwrap();
    read_view_on_device(&view);

    check_no_warnings(&sink.take());
}

#[test]
fn rotation_is_unchecked() {
    let (mesh, _sink, _field) =
        build_field::<f64>("temperature", &[(2, "block_a")], 1, 2, 512);

    // The debug precondition does not exist in production builds.
    mesh.update_field_states().unwrap();
}
