//! End-to-end: build a program through the public API, execute it, and walk the provenance DAG
//! the way a fault-localization consumer would.

use provenir_core::{
    CompareOp, DependencySource, DynamicDependency, MethodBuilder, MethodId, MethodSig, Pc,
    ProgramBuilder, ThreadId, Type, Value,
};
use provenir_vm::{Machine, Outcome, QueryTarget, Slot};
use std::sync::Arc;

fn external(tag: u32) -> (DependencySource, provenir_core::Dep) {
    let source = DependencySource::new(MethodId(900), Pc(tag), 0, ThreadId(0));
    (source, DynamicDependency::atomic(source))
}

#[test]
fn absolute_value_provenance_end_to_end() {
    // y = (x > 0) ? x : -x, then z = y * 2
    let mut p = ProgramBuilder::new();
    let main_cls = p.declare_class("Main").unwrap();
    let main = p
        .declare_method(main_cls, "main", MethodSig::new(vec![Type::Int], None))
        .unwrap();
    let mut b = MethodBuilder::new(3);
    let positive = b.new_label();
    let merge = b.new_label();
    b.load(0);
    b.const_int(0);
    b.if_compare(CompareOp::Gt, positive);
    b.load(0);
    b.neg();
    b.store(1);
    b.goto(merge);
    b.bind(positive);
    b.load(0);
    b.store(1);
    b.bind(merge);
    b.load(1);
    b.const_int(2);
    b.mul();
    b.store(2);
    b.halt();
    p.define_method(main, b.finish().unwrap()).unwrap();
    let program = Arc::new(p.build().unwrap());

    let (src_x, dep_x) = external(1);
    let mut m = Machine::new(program).unwrap();
    m.call_entry("Main.main", vec![Slot::new(Value::Int(-7), Some(dep_x))])
        .unwrap();
    let outcome = m.run().unwrap();
    assert!(matches!(outcome, Outcome::Halted));

    assert_eq!(
        m.value_of(QueryTarget::Local { frame: 0, slot: 2 }),
        Some(Value::Int(14))
    );

    // The consumer walks the DAG: every path bottoms out at the injected source.
    let dep = m
        .dependency_of(QueryTarget::Local { frame: 0, slot: 2 })
        .expect("z has provenance");
    let mut atoms = 0;
    let mut composites = 0;
    DynamicDependency::walk(&dep, &mut |node| {
        if node.is_atomic() {
            atoms += 1;
        } else {
            composites += 1;
        }
    });
    assert!(atoms >= 1);
    let leaves = DynamicDependency::leaves(&dep);
    assert_eq!(leaves.into_iter().collect::<Vec<_>>(), vec![src_x]);
    // Flattening keeps the graph shallow even after the branch and the multiply.
    assert!(composites <= 1);

    // The executed-instruction trace is available to the ranking side.
    assert!(!m.trace().is_empty());
}
