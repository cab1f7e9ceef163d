/*! Render provenance DAGs for human and tool consumption.
 *
 * The dependency graphs the tracker builds are in-process structures with sharing; these emitters
 * flatten them into a node-table document and render it as an indented text tree, a JSON
 * document, or Graphviz dot.
 */

pub mod dot;
pub mod emitter;
pub mod graph;
pub mod json;
pub mod text;

pub use dot::DotEmitter;
pub use emitter::{EmitContext, EmitResult, Emitter};
pub use graph::{DepGraphDoc, DepNodeDoc, NodeKind};
pub use json::JsonEmitter;
pub use text::TextEmitter;

use provenir_core::Dep;

/// Plain-text rendering of one dependency, colors off.
pub fn render_text(dep: Option<&Dep>) -> anyhow::Result<String> {
    TextEmitter::new().emit_to_string(&DepGraphDoc::single(dep))
}

/// Compact JSON rendering of one dependency.
pub fn render_json(dep: Option<&Dep>) -> anyhow::Result<String> {
    JsonEmitter::new().emit_to_string(&DepGraphDoc::single(dep))
}
