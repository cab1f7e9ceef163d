use super::*;
use crate::machine::Machine;
use crate::query::QueryTarget;
use crate::VmError;
use pretty_assertions::assert_eq;
use provenir_core::{CompareOp, MethodBuilder, MethodSig, ProgramBuilder, Type, Value};
use std::collections::BTreeSet;
use std::sync::Arc;

/// An object allocated inside a branch records its allocation site and the branch condition as
/// its type provenance.
#[test]
fn allocation_records_site_and_control_in_type_dep() {
    let mut p = ProgramBuilder::new();
    let foo = p.declare_class("Foo").unwrap();
    p.add_field(foo, "w", Type::Int).unwrap();
    let main_cls = p.declare_class("Main").unwrap();
    let main = p
        .declare_method(main_cls, "main", MethodSig::new(vec![Type::Int], None))
        .unwrap();
    let mut b = MethodBuilder::new(2);
    let skip = b.new_label();
    b.load(0);
    b.if_zero(CompareOp::Le, skip);
    b.new_object(foo);
    b.store(1);
    b.bind(skip);
    b.halt();
    p.define_method(main, b.finish().unwrap()).unwrap();

    let (src_x, dep_x) = external(1);
    let program = Arc::new(p.build().unwrap());
    let alloc_site = site(&program, "Main.main", 2);
    let mut m = Machine::new(program).unwrap();
    m.call_entry("Main.main", vec![arg(Value::Int(1), &dep_x)])
        .unwrap();
    m.run().unwrap();

    let obj = m
        .value_of(QueryTarget::Local { frame: 0, slot: 1 })
        .and_then(|v| v.as_ref())
        .expect("Foo was allocated");
    let got = leaves(m.type_dep(obj).as_ref());
    assert_eq!(got, BTreeSet::from([alloc_site, src_x]));
    let got = leaves(m.allocation_dep(obj).as_ref());
    assert_eq!(got, BTreeSet::from([alloc_site, src_x]));
}

/// Indexing past the end faults with a dependency naming both the index's provenance and the
/// provenance of the computation that sized the array.
#[test]
fn out_of_bounds_fault_includes_index_and_length_provenance() {
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
    b.new_array(Type::Int);
    b.store(2);
    b.load(2);
    b.load(1);
    b.array_load();
    b.store(0);
    b.halt();
    p.define_method(main, b.finish().unwrap()).unwrap();

    let (src_n, dep_n) = external(1);
    let (src_i, dep_i) = external(2);
    let program = Arc::new(p.build().unwrap());
    let alloc_site = site(&program, "Main.main", 1);
    let mut m = Machine::new(program).unwrap();
    m.call_entry(
        "Main.main",
        vec![arg(Value::Int(2), &dep_n), arg(Value::Int(5), &dep_i)],
    )
    .unwrap();

    let err = m.run().unwrap_err();
    let VmError::Uncaught(thrown) = err else {
        panic!("expected an uncaught fault, got {:?}", err);
    };
    assert_eq!(thrown.class_name, "IndexOutOfBoundsError");
    let got = leaves(thrown.dep.as_ref());
    assert_eq!(got, BTreeSet::from([alloc_site, src_n, src_i]));
}

#[test]
fn array_store_attaches_value_index_and_array_provenance() {
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
    b.load(0);
    b.new_array(Type::Int);
    b.store(3);
    b.load(3);
    b.load(1);
    b.load(2);
    b.array_store();
    b.halt();
    p.define_method(main, b.finish().unwrap()).unwrap();

    let (_, dep_n) = external(1);
    let (src_i, dep_i) = external(2);
    let (src_v, dep_v) = external(3);
    let program = Arc::new(p.build().unwrap());
    let alloc_site = site(&program, "Main.main", 1);
    let mut m = Machine::new(program).unwrap();
    m.call_entry(
        "Main.main",
        vec![
            arg(Value::Int(3), &dep_n),
            arg(Value::Int(1), &dep_i),
            arg(Value::Int(7), &dep_v),
        ],
    )
    .unwrap();
    m.run().unwrap();

    let array = m
        .value_of(QueryTarget::Local { frame: 0, slot: 3 })
        .and_then(|v| v.as_ref())
        .expect("array was allocated");
    assert_eq!(
        m.value_of(QueryTarget::Element { array, index: 1 }),
        Some(Value::Int(7))
    );
    let got = leaves_of(&m, QueryTarget::Element { array, index: 1 });
    assert_eq!(got, BTreeSet::from([alloc_site, src_i, src_v]));
}

/// Field reads forward what the write stored: the written value's provenance, not the receiver's.
#[test]
fn field_round_trip_preserves_value_provenance() {
    let mut p = ProgramBuilder::new();
    let point = p.declare_class("Point").unwrap();
    let x_field = p.add_field(point, "x", Type::Int).unwrap();
    let main_cls = p.declare_class("Main").unwrap();
    let main = p
        .declare_method(main_cls, "main", MethodSig::new(vec![Type::Int], None))
        .unwrap();
    let mut b = MethodBuilder::new(2);
    b.new_object(point);
    b.store(1);
    b.load(1);
    b.load(0);
    b.put_field(x_field);
    b.load(1);
    b.get_field(x_field);
    b.store(0);
    b.halt();
    p.define_method(main, b.finish().unwrap()).unwrap();

    let (src_v, dep_v) = external(5);
    let mut m = Machine::new(Arc::new(p.build().unwrap())).unwrap();
    m.call_entry("Main.main", vec![arg(Value::Int(41), &dep_v)])
        .unwrap();
    m.run().unwrap();

    assert_eq!(
        m.value_of(QueryTarget::Local { frame: 0, slot: 0 }),
        Some(Value::Int(41))
    );
    let got = leaves_of(&m, QueryTarget::Local { frame: 0, slot: 0 });
    assert_eq!(got, BTreeSet::from([src_v]));
}

#[test]
fn null_field_access_faults_with_reference_provenance() {
    let mut p = ProgramBuilder::new();
    let point = p.declare_class("Point").unwrap();
    let x_field = p.add_field(point, "x", Type::Int).unwrap();
    let main_cls = p.declare_class("Main").unwrap();
    let main = p
        .declare_method(
            main_cls,
            "main",
            MethodSig::new(vec![Type::Object(point)], None),
        )
        .unwrap();
    let mut b = MethodBuilder::new(1);
    b.load(0);
    b.get_field(x_field);
    b.store(0);
    b.halt();
    p.define_method(main, b.finish().unwrap()).unwrap();

    let (src_r, dep_r) = external(9);
    let mut m = Machine::new(Arc::new(p.build().unwrap())).unwrap();
    m.call_entry("Main.main", vec![arg(Value::Null, &dep_r)])
        .unwrap();

    let err = m.run().unwrap_err();
    let VmError::Uncaught(thrown) = err else {
        panic!("expected an uncaught fault, got {:?}", err);
    };
    assert_eq!(thrown.class_name, "NullReferenceError");
    assert_eq!(leaves(thrown.dep.as_ref()), BTreeSet::from([src_r]));
}

#[test]
fn negative_array_size_faults_with_length_provenance() {
    let mut p = ProgramBuilder::new();
    let main_cls = p.declare_class("Main").unwrap();
    let main = p
        .declare_method(main_cls, "main", MethodSig::new(vec![Type::Int], None))
        .unwrap();
    let mut b = MethodBuilder::new(1);
    b.load(0);
    b.new_array(Type::Int);
    b.store(0);
    b.halt();
    p.define_method(main, b.finish().unwrap()).unwrap();

    let (src_n, dep_n) = external(2);
    let mut m = Machine::new(Arc::new(p.build().unwrap())).unwrap();
    m.call_entry("Main.main", vec![arg(Value::Int(-2), &dep_n)])
        .unwrap();

    let err = m.run().unwrap_err();
    let VmError::Uncaught(thrown) = err else {
        panic!("expected an uncaught fault, got {:?}", err);
    };
    assert_eq!(thrown.class_name, "NegativeArraySizeError");
    assert_eq!(leaves(thrown.dep.as_ref()), BTreeSet::from([src_n]));
}

/// A failed cast is explained by the reference and the object's recorded type provenance.
#[test]
fn bad_cast_faults_with_recorded_type_provenance() {
    let mut p = ProgramBuilder::new();
    let a = p.declare_class("A").unwrap();
    let b_cls = p.declare_class("B").unwrap();
    let main_cls = p.declare_class("Main").unwrap();
    let main = p
        .declare_method(main_cls, "main", MethodSig::default())
        .unwrap();
    let mut b = MethodBuilder::new(1);
    b.new_object(a);
    b.check_cast(Type::Object(b_cls));
    b.store(0);
    b.halt();
    p.define_method(main, b.finish().unwrap()).unwrap();

    let program = Arc::new(p.build().unwrap());
    let alloc_site = site(&program, "Main.main", 0);
    let mut m = Machine::new(program).unwrap();
    m.call_entry("Main.main", Vec::new()).unwrap();

    let err = m.run().unwrap_err();
    let VmError::Uncaught(thrown) = err else {
        panic!("expected an uncaught fault, got {:?}", err);
    };
    assert_eq!(thrown.class_name, "CastError");
    assert_eq!(leaves(thrown.dep.as_ref()), BTreeSet::from([alloc_site]));
}

/// Every level of a multi-dimensional allocation shares the one allocating instruction identity,
/// and each level's length provenance names the operand that sized that dimension.
#[test]
fn multi_dimensional_allocation_shares_one_site() {
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
    b.multi_new_array(Type::Int, 2);
    b.store(2);
    b.halt();
    p.define_method(main, b.finish().unwrap()).unwrap();

    let (src_n, dep_n) = external(1);
    let (src_m, dep_m) = external(2);
    let program = Arc::new(p.build().unwrap());
    let alloc_site = site(&program, "Main.main", 2);
    let mut m = Machine::new(program).unwrap();
    m.call_entry(
        "Main.main",
        vec![arg(Value::Int(2), &dep_n), arg(Value::Int(3), &dep_m)],
    )
    .unwrap();
    m.run().unwrap();

    let outer = m
        .value_of(QueryTarget::Local { frame: 0, slot: 2 })
        .and_then(|v| v.as_ref())
        .expect("outer array");
    assert_eq!(
        leaves(m.length_dep(outer).as_ref()),
        BTreeSet::from([alloc_site, src_n])
    );

    let inner = m
        .value_of(QueryTarget::Element { array: outer, index: 0 })
        .and_then(|v| v.as_ref())
        .expect("inner array");
    assert_eq!(
        leaves(m.length_dep(inner).as_ref()),
        BTreeSet::from([alloc_site, src_m])
    );
}

#[test]
fn statics_carry_store_provenance() {
    let mut p = ProgramBuilder::new();
    let main_cls = p.declare_class("Main").unwrap();
    let counter = p.add_static(main_cls, "counter", Type::Int).unwrap();
    let main = p
        .declare_method(main_cls, "main", MethodSig::new(vec![Type::Int], None))
        .unwrap();
    let mut b = MethodBuilder::new(2);
    b.load(0);
    b.put_static(counter);
    b.get_static(counter);
    b.store(1);
    b.halt();
    p.define_method(main, b.finish().unwrap()).unwrap();

    let (src_v, dep_v) = external(6);
    let mut m = Machine::new(Arc::new(p.build().unwrap())).unwrap();
    m.call_entry("Main.main", vec![arg(Value::Int(3), &dep_v)])
        .unwrap();
    m.run().unwrap();

    assert_eq!(
        leaves_of(&m, QueryTarget::Static { field: counter }),
        BTreeSet::from([src_v])
    );
    assert_eq!(
        leaves_of(&m, QueryTarget::Local { frame: 0, slot: 1 }),
        BTreeSet::from([src_v])
    );
}
