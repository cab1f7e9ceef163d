/*! Construct guest programs in memory.
 *
 * Tests and the assembler build programs through this API instead of hand-writing instruction
 * vectors: declare classes, fields, and methods up front to obtain ids, emit method bodies with
 * label-based branch targets, then `build()` to resolve and validate everything.
 */

mod method_builder;
mod program_builder;

pub use method_builder::{Label, MethodBuilder};
pub use program_builder::ProgramBuilder;
