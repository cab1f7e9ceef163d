use super::source::DependencySource;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

/// Shared handle to an immutable dependency node. "No dependency" is expressed as
/// `Option<Dep>::None` at the slot, never as an empty node.
pub type Dep = Arc<DynamicDependency>;

/// A provenance node. Atomic nodes name a single executed instruction; composite nodes hold the
/// deduplicated set of dependencies a value was merged from. Composition always allocates a new
/// node; existing nodes are aliased across many slots and are never mutated.
#[derive(Debug, PartialEq, Eq)]
pub enum DynamicDependency {
    Atomic { source: DependencySource },
    Composite { children: Box<[Dep]> },
}

impl DynamicDependency {
    pub fn atomic(source: DependencySource) -> Dep {
        Arc::new(DynamicDependency::Atomic { source })
    }

    pub fn composite(children: Vec<Dep>) -> Dep {
        debug_assert!(
            !children.is_empty(),
            "composite dependency must have children; use None for no dependency"
        );
        Arc::new(DynamicDependency::Composite {
            children: children.into_boxed_slice(),
        })
    }

    pub fn is_atomic(&self) -> bool {
        matches!(self, DynamicDependency::Atomic { .. })
    }

    pub fn as_source(&self) -> Option<DependencySource> {
        match self {
            DynamicDependency::Atomic { source } => Some(*source),
            DynamicDependency::Composite { .. } => None,
        }
    }

    pub fn children(&self) -> &[Dep] {
        match self {
            DynamicDependency::Atomic { .. } => &[],
            DynamicDependency::Composite { children } => children,
        }
    }

    /// Walks the DAG depth-first, visiting shared nodes once.
    pub fn walk<F: FnMut(&Dep)>(dep: &Dep, visit: &mut F) {
        let mut seen: HashSet<*const DynamicDependency> = HashSet::new();
        Self::walk_inner(dep, visit, &mut seen);
    }

    fn walk_inner<F: FnMut(&Dep)>(
        dep: &Dep,
        visit: &mut F,
        seen: &mut HashSet<*const DynamicDependency>,
    ) {
        if !seen.insert(Arc::as_ptr(dep)) {
            return;
        }
        visit(dep);
        for child in dep.children() {
            Self::walk_inner(child, visit, seen);
        }
    }

    /// The flattened leaf set: every atomic source reachable from this node.
    pub fn leaves(dep: &Dep) -> BTreeSet<DependencySource> {
        let mut out = BTreeSet::new();
        Self::walk(dep, &mut |node| {
            if let Some(source) = node.as_source() {
                out.insert(source);
            }
        });
        out
    }

    /// Leaf set of an optional dependency; `None` has no leaves.
    pub fn leaf_set(dep: Option<&Dep>) -> BTreeSet<DependencySource> {
        dep.map(Self::leaves).unwrap_or_default()
    }

    /// Number of distinct nodes in the DAG.
    pub fn node_count(dep: &Dep) -> usize {
        let mut n = 0;
        Self::walk(dep, &mut |_| n += 1);
        n
    }
}

impl std::fmt::Display for DynamicDependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DynamicDependency::Atomic { source } => write!(f, "{}", source),
            DynamicDependency::Composite { children } => {
                write!(f, "{{")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", child)?;
                }
                write!(f, "}}")
            }
        }
    }
}
