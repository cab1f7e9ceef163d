use provenir_core::{Dep, DependencySource, DynamicDependency};
use serde::Serialize;
use std::collections::HashMap;

/// A provenance DAG flattened to a node table. Sharing in the live graph (the same composite
/// aliased from many slots) becomes shared node ids, so the serialized form is faithful to what
/// the tracker actually built; a tree rendering would duplicate shared subgraphs.
#[derive(Debug, Clone, Serialize)]
pub struct DepGraphDoc {
    pub roots: Vec<Option<usize>>,
    pub nodes: Vec<DepNodeDoc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DepNodeDoc {
    pub id: usize,
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<DependencySource>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Atomic,
    Composite,
}

impl DepGraphDoc {
    pub fn build(roots: &[Option<&Dep>]) -> Self {
        let mut nodes = Vec::new();
        let mut ids: HashMap<*const DynamicDependency, usize> = HashMap::new();
        let root_ids = roots
            .iter()
            .map(|root| root.map(|dep| Self::intern(dep, &mut nodes, &mut ids)))
            .collect();
        Self {
            roots: root_ids,
            nodes,
        }
    }

    pub fn single(root: Option<&Dep>) -> Self {
        Self::build(&[root])
    }

    fn intern(
        dep: &Dep,
        nodes: &mut Vec<DepNodeDoc>,
        ids: &mut HashMap<*const DynamicDependency, usize>,
    ) -> usize {
        let ptr = std::sync::Arc::as_ptr(dep);
        if let Some(&id) = ids.get(&ptr) {
            return id;
        }
        // Reserve the slot before descending so ids stay stable in preorder.
        let id = nodes.len();
        ids.insert(ptr, id);
        nodes.push(DepNodeDoc {
            id,
            kind: NodeKind::Atomic,
            source: None,
            children: Vec::new(),
        });
        match &**dep {
            DynamicDependency::Atomic { source } => {
                nodes[id].source = Some(*source);
            }
            DynamicDependency::Composite { children } => {
                nodes[id].kind = NodeKind::Composite;
                let child_ids: Vec<usize> = children
                    .iter()
                    .map(|child| Self::intern(child, nodes, ids))
                    .collect();
                nodes[id].children = child_ids;
            }
        }
        id
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
