use crate::emitter::{EmitContext, EmitResult, Emitter};
use crate::graph::{DepGraphDoc, NodeKind};
use std::io::Write;

/// Graphviz rendering: atomic sources as boxes, composites as points, one edge per child link.
pub struct DotEmitter;

impl Emitter for DotEmitter {
    type Item = DepGraphDoc;

    fn emit<W: Write>(
        &self,
        item: &Self::Item,
        writer: &mut W,
        _context: &mut EmitContext,
    ) -> EmitResult {
        writeln!(writer, "digraph provenance {{")?;
        writeln!(writer, "    rankdir=BT;")?;
        for node in &item.nodes {
            match node.kind {
                NodeKind::Atomic => {
                    let label = node
                        .source
                        .map(|s| s.to_string())
                        .unwrap_or_default();
                    writeln!(
                        writer,
                        "    n{} [shape=box, label=\"{}\"];",
                        node.id, label
                    )?;
                }
                NodeKind::Composite => {
                    writeln!(writer, "    n{} [shape=point];", node.id)?;
                }
            }
        }
        for node in &item.nodes {
            for child in &node.children {
                writeln!(writer, "    n{} -> n{};", node.id, child)?;
            }
        }
        writeln!(writer, "}}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use provenir_core::{DependencySource, DynamicDependency, MethodId, Pc, ThreadId};

    #[test]
    fn dot_output_names_every_edge() {
        let a = DynamicDependency::atomic(DependencySource::new(
            MethodId(0),
            Pc(1),
            0,
            ThreadId(0),
        ));
        let b = DynamicDependency::atomic(DependencySource::new(
            MethodId(0),
            Pc(2),
            0,
            ThreadId(0),
        ));
        let top = DynamicDependency::composite(vec![a, b]);
        let doc = DepGraphDoc::single(Some(&top));

        let out = DotEmitter.emit_to_string(&doc).unwrap();
        assert!(out.starts_with("digraph provenance {"));
        assert!(out.contains("n0 -> n1;"));
        assert!(out.contains("n0 -> n2;"));
        assert!(out.contains("shape=box"));
    }
}
