use super::node::{Dep, DynamicDependency};
use super::source::DependencySource;
use std::collections::HashSet;

/// Composite children with at most this many entries are inlined into the node under
/// construction; larger composites are kept as a single shared child. Keeps node width linear in
/// the live operands of long instruction chains while preserving the flattened leaf set.
pub const FLATTEN_LIMIT: usize = 32;

/// Merges the data dependencies of an instruction's operands with the active control condition
/// into the dependency of its result.
///
/// Null inputs are dropped. If nothing remains the result has no dependency. If exactly one input
/// survives it is returned unwrapped, since wrapping a lone node changes no leaf set and only deepens
/// the graph. Otherwise the result is a fresh composite over the flattened, deduplicated union of
/// the surviving inputs.
///
/// Every instruction rule funnels through this function; it is the soundness crux of the whole
/// tracking layer.
pub fn compose(data: &[Option<&Dep>], control: Option<&Dep>) -> Option<Dep> {
    let mut survivors: Vec<&Dep> = data.iter().filter_map(|d| *d).collect();
    if let Some(c) = control {
        survivors.push(c);
    }

    match survivors.len() {
        0 => None,
        1 => Some(survivors[0].clone()),
        _ => {
            let mut children: Vec<Dep> = Vec::with_capacity(survivors.len());
            let mut seen_nodes: HashSet<*const DynamicDependency> = HashSet::new();
            let mut seen_atoms: HashSet<DependencySource> = HashSet::new();
            for dep in survivors {
                absorb(dep, &mut children, &mut seen_nodes, &mut seen_atoms);
            }
            match children.len() {
                0 | 1 => children.pop(),
                _ => Some(DynamicDependency::composite(children)),
            }
        }
    }
}

fn absorb(
    dep: &Dep,
    out: &mut Vec<Dep>,
    seen_nodes: &mut HashSet<*const DynamicDependency>,
    seen_atoms: &mut HashSet<DependencySource>,
) {
    if !seen_nodes.insert(std::sync::Arc::as_ptr(dep)) {
        return;
    }
    match &**dep {
        DynamicDependency::Atomic { source } => {
            if seen_atoms.insert(*source) {
                out.push(dep.clone());
            }
        }
        DynamicDependency::Composite { children } => {
            if children.len() <= FLATTEN_LIMIT {
                for child in children.iter() {
                    absorb(child, out, seen_nodes, seen_atoms);
                }
            } else {
                out.push(dep.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instructions::Pc;
    use crate::types::MethodId;
    use crate::ThreadId;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn src(pc: u32) -> DependencySource {
        DependencySource::new(MethodId(0), Pc(pc), 0, ThreadId(0))
    }

    fn atom(pc: u32) -> Dep {
        DynamicDependency::atomic(src(pc))
    }

    #[test]
    fn all_null_inputs_yield_no_dependency() {
        assert_eq!(compose(&[None, None], None), None);
        assert_eq!(compose(&[], None), None);
    }

    #[test]
    fn single_survivor_is_returned_unwrapped() {
        let a = atom(1);
        let out = compose(&[Some(&a), None], None).unwrap();
        assert!(Arc::ptr_eq(&out, &a));

        // A lone control condition is also returned as-is.
        let c = atom(2);
        let out = compose(&[None], Some(&c)).unwrap();
        assert!(Arc::ptr_eq(&out, &c));
    }

    #[test]
    fn result_leaf_set_is_union_of_input_leaves() {
        let a = atom(1);
        let b = atom(2);
        let c = atom(3);
        let ab = compose(&[Some(&a), Some(&b)], None).unwrap();
        let out = compose(&[Some(&ab), Some(&b)], Some(&c)).unwrap();

        let leaves = DynamicDependency::leaves(&out);
        assert_eq!(
            leaves.into_iter().collect::<Vec<_>>(),
            vec![src(1), src(2), src(3)]
        );
    }

    #[test]
    fn duplicate_atoms_are_deduplicated() {
        let a = atom(1);
        let a_again = atom(1);
        let b = atom(2);
        let out = compose(&[Some(&a), Some(&a_again), Some(&b)], None).unwrap();
        assert_eq!(out.children().len(), 2);
    }

    #[test]
    fn small_composites_flatten_into_the_new_node() {
        let a = atom(1);
        let b = atom(2);
        let c = atom(3);
        let inner = compose(&[Some(&a), Some(&b)], None).unwrap();
        let out = compose(&[Some(&inner), Some(&c)], None).unwrap();
        // Flattened: three atomic children, not {composite, atom}.
        assert_eq!(out.children().len(), 3);
        assert!(out.children().iter().all(|ch| ch.is_atomic()));
    }

    #[test]
    fn oversized_composites_are_kept_as_shared_children() {
        let atoms: Vec<Dep> = (0..FLATTEN_LIMIT as u32 + 1).map(atom).collect();
        let big = DynamicDependency::composite(atoms.clone());
        let extra = atom(1000);
        let out = compose(&[Some(&big), Some(&extra)], None).unwrap();

        assert_eq!(out.children().len(), 2);
        assert!(out.children().iter().any(|ch| Arc::ptr_eq(ch, &big)));
        // Leaf-set semantics are unchanged by the nesting regime.
        assert_eq!(
            DynamicDependency::leaves(&out).len(),
            FLATTEN_LIMIT + 2
        );
    }

    #[test]
    fn composition_does_not_mutate_inputs() {
        let a = atom(1);
        let b = atom(2);
        let ab = compose(&[Some(&a), Some(&b)], None).unwrap();
        let before = DynamicDependency::leaves(&ab);
        let _ = compose(&[Some(&ab)], Some(&atom(3)));
        assert_eq!(DynamicDependency::leaves(&ab), before);
    }
}
