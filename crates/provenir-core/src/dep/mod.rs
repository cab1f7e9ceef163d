/*! The dependency model: what a runtime value derives from.
 *
 * Every value the interpreter produces gets a descriptor of its provenance: the instructions it
 * was computed from (data dependency) and the branch decisions that had to hold for it to exist
 * (control dependency). Nodes are immutable and shared by reference, so composing dependencies
 * never invalidates a descriptor already attached to another slot.
 */

pub mod compose;
pub mod node;
pub mod source;

pub use compose::{compose, FLATTEN_LIMIT};
pub use node::{Dep, DynamicDependency};
pub use source::{DependencySource, ThreadId};
