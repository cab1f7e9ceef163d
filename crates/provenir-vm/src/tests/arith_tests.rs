use super::*;
use crate::machine::Machine;
use crate::query::QueryTarget;
use pretty_assertions::assert_eq;
use provenir_core::{MethodBuilder, MethodSig, ProgramBuilder, Type, Value};
use std::sync::Arc;

/// Loading and storing a constant with no active control condition attaches no dependency:
/// the value is path-independent and unconditionally known.
#[test]
fn constant_under_no_control_has_no_dependency() {
    let mut p = ProgramBuilder::new();
    let main_cls = p.declare_class("Main").unwrap();
    let main = p
        .declare_method(main_cls, "main", MethodSig::default())
        .unwrap();
    let mut b = MethodBuilder::new(1);
    b.const_int(42);
    b.store(0);
    b.halt();
    p.define_method(main, b.finish().unwrap()).unwrap();

    let mut m = Machine::new(Arc::new(p.build().unwrap())).unwrap();
    m.run_entry("Main.main").unwrap();

    assert_eq!(
        m.value_of(QueryTarget::Local { frame: 0, slot: 0 }),
        Some(Value::Int(42))
    );
    assert!(m
        .dependency_of(QueryTarget::Local { frame: 0, slot: 0 })
        .is_none());
}

/// An arithmetic result's flattened leaf set is the union of its operands' leaves.
#[test]
fn binary_result_unions_operand_leaves() {
    let mut p = ProgramBuilder::new();
    let main_cls = p.declare_class("Main").unwrap();
    let main = p
        .declare_method(
            main_cls,
            "main",
            MethodSig::new(vec![Type::Int, Type::Int], None),
        )
        .unwrap();
    let mut b = MethodBuilder::new(3);
    b.load(0);
    b.load(1);
    b.add();
    b.store(2);
    b.halt();
    p.define_method(main, b.finish().unwrap()).unwrap();

    let (src_a, dep_a) = external(1);
    let (src_b, dep_b) = external(2);
    let mut m = Machine::new(Arc::new(p.build().unwrap())).unwrap();
    m.call_entry(
        "Main.main",
        vec![arg(Value::Int(2), &dep_a), arg(Value::Int(3), &dep_b)],
    )
    .unwrap();
    m.run().unwrap();

    assert_eq!(
        m.value_of(QueryTarget::Local { frame: 0, slot: 2 }),
        Some(Value::Int(5))
    );
    let got = leaves_of(&m, QueryTarget::Local { frame: 0, slot: 2 });
    assert_eq!(got.into_iter().collect::<Vec<_>>(), vec![src_a, src_b]);
}

/// A chain of operations keeps the leaf set flat: no nesting blowup, no duplicates when the same
/// operand feeds in twice.
#[test]
fn reused_operand_appears_once_in_leaves() {
    let mut p = ProgramBuilder::new();
    let main_cls = p.declare_class("Main").unwrap();
    let main = p
        .declare_method(main_cls, "main", MethodSig::new(vec![Type::Int], None))
        .unwrap();
    let mut b = MethodBuilder::new(2);
    b.load(0);
    b.load(0);
    b.mul(); // x * x
    b.load(0);
    b.add(); // x*x + x
    b.store(1);
    b.halt();
    p.define_method(main, b.finish().unwrap()).unwrap();

    let (src_x, dep_x) = external(7);
    let mut m = Machine::new(Arc::new(p.build().unwrap())).unwrap();
    m.call_entry("Main.main", vec![arg(Value::Int(3), &dep_x)])
        .unwrap();
    m.run().unwrap();

    assert_eq!(
        m.value_of(QueryTarget::Local { frame: 0, slot: 1 }),
        Some(Value::Int(12))
    );
    let got = leaves_of(&m, QueryTarget::Local { frame: 0, slot: 1 });
    assert_eq!(got.into_iter().collect::<Vec<_>>(), vec![src_x]);
}

#[test]
fn unary_forwards_operand_dependency() {
    let mut p = ProgramBuilder::new();
    let main_cls = p.declare_class("Main").unwrap();
    let main = p
        .declare_method(main_cls, "main", MethodSig::new(vec![Type::Int], None))
        .unwrap();
    let mut b = MethodBuilder::new(2);
    b.load(0);
    b.neg();
    b.store(1);
    b.halt();
    p.define_method(main, b.finish().unwrap()).unwrap();

    let (src_x, dep_x) = external(3);
    let mut m = Machine::new(Arc::new(p.build().unwrap())).unwrap();
    m.call_entry("Main.main", vec![arg(Value::Int(9), &dep_x)])
        .unwrap();
    m.run().unwrap();

    assert_eq!(
        m.value_of(QueryTarget::Local { frame: 0, slot: 1 }),
        Some(Value::Int(-9))
    );
    let got = leaves_of(&m, QueryTarget::Local { frame: 0, slot: 1 });
    assert_eq!(got.into_iter().collect::<Vec<_>>(), vec![src_x]);
}

#[test]
fn comparison_result_depends_on_both_sides() {
    let mut p = ProgramBuilder::new();
    let main_cls = p.declare_class("Main").unwrap();
    let main = p
        .declare_method(
            main_cls,
            "main",
            MethodSig::new(vec![Type::Int, Type::Int], None),
        )
        .unwrap();
    let mut b = MethodBuilder::new(3);
    b.load(0);
    b.load(1);
    b.compare(provenir_core::CompareOp::Lt);
    b.store(2);
    b.halt();
    p.define_method(main, b.finish().unwrap()).unwrap();

    let (src_a, dep_a) = external(1);
    let (src_b, dep_b) = external(2);
    let mut m = Machine::new(Arc::new(p.build().unwrap())).unwrap();
    m.call_entry(
        "Main.main",
        vec![arg(Value::Int(1), &dep_a), arg(Value::Int(5), &dep_b)],
    )
    .unwrap();
    m.run().unwrap();

    assert_eq!(
        m.value_of(QueryTarget::Local { frame: 0, slot: 2 }),
        Some(Value::Bool(true))
    );
    let got = leaves_of(&m, QueryTarget::Local { frame: 0, slot: 2 });
    assert_eq!(got.into_iter().collect::<Vec<_>>(), vec![src_a, src_b]);
}
