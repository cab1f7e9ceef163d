use crate::emitter::{EmitContext, EmitResult, Emitter};
use crate::graph::{DepGraphDoc, NodeKind};
use colored::Colorize;
use provenir_core::Program;
use std::collections::HashSet;
use std::io::Write;

/// Indented tree rendering of a provenance DAG. Shared nodes are expanded once; later
/// occurrences print a back-reference to the node id.
pub struct TextEmitter {
    program: Option<Program>,
}

impl TextEmitter {
    pub fn new() -> Self {
        Self { program: None }
    }

    /// Resolves method ids to `Class.method` names in leaf labels.
    pub fn with_program(program: Program) -> Self {
        Self {
            program: Some(program),
        }
    }

    fn leaf_label(&self, doc: &DepGraphDoc, id: usize) -> String {
        let node = &doc.nodes[id];
        match node.source {
            Some(source) => match &self.program {
                Some(program) => format!(
                    "{}{}/d{}/{}",
                    program.qualified_method_name(source.method),
                    source.pc,
                    source.depth,
                    source.thread
                ),
                None => source.to_string(),
            },
            None => String::new(),
        }
    }

    fn emit_node<W: Write>(
        &self,
        doc: &DepGraphDoc,
        id: usize,
        writer: &mut W,
        context: &mut EmitContext,
        seen: &mut HashSet<usize>,
    ) -> EmitResult {
        let indent = context.get_indent();
        let node = &doc.nodes[id];

        if !seen.insert(id) {
            let back = format!("^{}", id);
            if context.use_colors {
                writeln!(writer, "{}{}", indent, back.yellow())?;
            } else {
                writeln!(writer, "{}{}", indent, back)?;
            }
            return Ok(());
        }

        match node.kind {
            NodeKind::Atomic => {
                let label = self.leaf_label(doc, id);
                if context.use_colors {
                    writeln!(writer, "{}{}", indent, label.cyan())?;
                } else {
                    writeln!(writer, "{}{}", indent, label)?;
                }
            }
            NodeKind::Composite => {
                let header = format!("all of (#{})", id);
                if context.use_colors {
                    writeln!(writer, "{}{}", indent, header.bold())?;
                } else {
                    writeln!(writer, "{}{}", indent, header)?;
                }
                context.indent();
                for &child in &node.children {
                    self.emit_node(doc, child, writer, context, seen)?;
                }
                context.dedent();
            }
        }
        Ok(())
    }
}

impl Default for TextEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Emitter for TextEmitter {
    type Item = DepGraphDoc;

    fn emit<W: Write>(
        &self,
        item: &Self::Item,
        writer: &mut W,
        context: &mut EmitContext,
    ) -> EmitResult {
        let mut seen = HashSet::new();
        for root in &item.roots {
            match root {
                Some(id) => self.emit_node(item, *id, writer, context, &mut seen)?,
                None => {
                    let indent = context.get_indent();
                    writeln!(writer, "{}(no dependency)", indent)?;
                }
            }
        }
        Ok(())
    }
}
