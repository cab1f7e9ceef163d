mod arith_tests;
mod backtrack_tests;
mod heap_tests;

use crate::frame::Slot;
use crate::machine::Machine;
use crate::query::QueryTarget;
use provenir_core::{
    Dep, DependencySource, DynamicDependency, MethodId, Pc, Program, ThreadId, Value,
};
use std::collections::BTreeSet;

/// A synthetic dependency standing in for provenance the host attaches to entry arguments.
pub(crate) fn external(tag: u32) -> (DependencySource, Dep) {
    let source = DependencySource::new(MethodId(900), Pc(tag), 0, ThreadId(0));
    (source, DynamicDependency::atomic(source))
}

pub(crate) fn arg(value: Value, dep: &Dep) -> Slot {
    Slot::new(value, Some(dep.clone()))
}

/// The dependency source the machine assigns to `pc` of a method in the entry frame.
pub(crate) fn site(program: &Program, qualified: &str, pc: u32) -> DependencySource {
    site_at_depth(program, qualified, pc, 0)
}

pub(crate) fn site_at_depth(
    program: &Program,
    qualified: &str,
    pc: u32,
    depth: u32,
) -> DependencySource {
    let method = program
        .method_by_name(qualified)
        .unwrap_or_else(|| panic!("no method {}", qualified));
    DependencySource::new(method.id, Pc(pc), depth, ThreadId(0))
}

pub(crate) fn leaves_of(m: &Machine, target: QueryTarget) -> BTreeSet<DependencySource> {
    DynamicDependency::leaf_set(m.dependency_of(target).as_ref())
}

pub(crate) fn leaves(dep: Option<&Dep>) -> BTreeSet<DependencySource> {
    DynamicDependency::leaf_set(dep)
}
