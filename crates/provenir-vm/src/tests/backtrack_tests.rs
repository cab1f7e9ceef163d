use super::*;
use crate::frame::Slot;
use crate::machine::Machine;
use crate::query::QueryTarget;
use pretty_assertions::assert_eq;
use provenir_core::{CompareOp, DynamicDependency, MethodBuilder, MethodSig, ProgramBuilder, Type, Value};
use std::collections::BTreeSet;
use std::sync::Arc;

fn branch_fixture() -> ProgramBuilder {
    let mut p = ProgramBuilder::new();
    let main_cls = p.declare_class("Main").unwrap();
    let main = p
        .declare_method(
            main_cls,
            "main",
            MethodSig::new(vec![Type::Int, Type::Int, Type::Int], None),
        )
        .unwrap();
    let mut b = MethodBuilder::new(4);
    let then_arm = b.new_label();
    let merge = b.new_label();
    b.load(0);
    b.const_int(0);
    b.if_compare(CompareOp::Gt, then_arm);
    b.load(2);
    b.store(3);
    b.goto(merge);
    b.bind(then_arm);
    b.load(1);
    b.store(3);
    b.bind(merge);
    b.halt();
    p.define_method(main, b.finish().unwrap()).unwrap();
    p
}

/// Restoring a checkpoint reinstates exactly the control condition captured at the choice point.
#[test]
fn restore_reinstates_control_condition() {
    let (_, dep_x) = external(1);
    let (_, dep_a) = external(2);
    let (_, dep_b) = external(3);

    let p = branch_fixture();
    let mut m = Machine::new(Arc::new(p.build().unwrap())).unwrap();
    m.call_entry(
        "Main.main",
        vec![
            arg(Value::Int(5), &dep_x),
            arg(Value::Int(1), &dep_a),
            arg(Value::Int(2), &dep_b),
        ],
    )
    .unwrap();

    let checkpoint = m.checkpoint();
    assert!(m.frames()[0].control.is_none());

    m.run().unwrap();
    // The halted frame's condition records the branch decision.
    assert!(!DynamicDependency::leaf_set(m.frames()[0].control.as_ref()).is_empty());

    m.restore(&checkpoint);
    assert!(m.frames()[0].control.is_none());
    assert_eq!(m.frames()[0].pc, provenir_core::Pc(0));
}

/// Backtracking from branch A and retrying branch B leaves a condition containing only B's
/// decisions, with no residue from the abandoned exploration.
#[test]
fn retried_branch_has_no_residue_from_abandoned_branch() {
    let (src_x1, dep_x1) = external(1);
    let (src_a, dep_a) = external(2);
    let (src_b, dep_b) = external(3);
    let (src_x2, dep_x2) = external(4);

    let p = branch_fixture();
    let mut m = Machine::new(Arc::new(p.build().unwrap())).unwrap();
    m.call_entry(
        "Main.main",
        vec![
            arg(Value::Int(5), &dep_x1),
            arg(Value::Int(11), &dep_a),
            arg(Value::Int(22), &dep_b),
        ],
    )
    .unwrap();

    let choice_point = m.checkpoint();

    m.run().unwrap();
    let first = leaves_of(&m, QueryTarget::Local { frame: 0, slot: 3 });
    assert_eq!(first, BTreeSet::from([src_x1, src_a]));

    // The host retries the choice with a different value (and a fresh provenance tag).
    m.restore(&choice_point);
    m.set_local(0, 0, Slot::new(Value::Int(-5), Some(dep_x2.clone())))
        .unwrap();
    m.run().unwrap();

    let second = leaves_of(&m, QueryTarget::Local { frame: 0, slot: 3 });
    assert_eq!(second, BTreeSet::from([src_x2, src_b]));
    assert!(!second.contains(&src_x1));
    assert!(!second.contains(&src_a));
}

/// Heap side tables and property records are part of the snapshot, and re-executing the same
/// path after a restore reproduces identical dependency sources.
#[test]
fn heap_side_tables_ride_the_checkpoint() {
    let mut p = ProgramBuilder::new();
    let main_cls = p.declare_class("Main").unwrap();
    let main = p
        .declare_method(main_cls, "main", MethodSig::new(vec![Type::Int], None))
        .unwrap();
    let mut b = MethodBuilder::new(2);
    b.const_int(1);
    b.new_array(Type::Int); // pc 1
    b.store(1);
    b.load(1);
    b.const_int(0);
    b.load(0);
    b.array_store();
    b.halt();
    p.define_method(main, b.finish().unwrap()).unwrap();

    let (src_v, dep_v) = external(1);
    let program = Arc::new(p.build().unwrap());
    let alloc_site = site(&program, "Main.main", 1);
    let mut m = Machine::new(program).unwrap();
    m.call_entry("Main.main", vec![arg(Value::Int(9), &dep_v)])
        .unwrap();

    // Step past the allocation, then snapshot.
    for _ in 0..3 {
        m.step().unwrap();
    }
    let array = m
        .value_of(QueryTarget::Local { frame: 0, slot: 1 })
        .and_then(|v| v.as_ref())
        .expect("array allocated");
    let checkpoint = m.checkpoint();
    let trace_len = m.trace().len();

    m.run().unwrap();
    let first = leaves_of(&m, QueryTarget::Element { array, index: 0 });
    assert_eq!(first, BTreeSet::from([src_v, alloc_site]));

    m.restore(&checkpoint);
    assert_eq!(m.trace().len(), trace_len);
    assert!(m
        .dependency_of(QueryTarget::Element { array, index: 0 })
        .is_none());
    assert_eq!(
        m.value_of(QueryTarget::Element { array, index: 0 }),
        Some(Value::Int(0))
    );

    // Same path, same identities.
    m.run().unwrap();
    let second = leaves_of(&m, QueryTarget::Element { array, index: 0 });
    assert_eq!(first, second);
}
