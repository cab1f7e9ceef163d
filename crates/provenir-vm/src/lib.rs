/*! Bytecode interpreter with dynamic dependency (provenance) tracking.
 *
 * Every instruction the machine executes computes, next to its ordinary effect, a dependency
 * descriptor for each value it produces: which previously produced values it derives from and
 * which branch decisions had to hold for it to execute. The resulting graph is what a fault
 * localization tool queries to answer "why does this slot hold this value?".
 *
 * The machine cooperates with a backtracking host: `Machine::checkpoint`/`Machine::restore`
 * capture and reinstate the complete dependency-bearing state, and instruction identities are
 * derived from (method, pc, depth, thread) so re-execution after a restore reproduces them.
 */

pub mod control;
mod exec;
pub mod fault;
pub mod frame;
pub mod heap;
pub mod machine;
pub mod native;
pub mod query;

pub use fault::{BuiltinClasses, FaultKind, Thrown};
pub use frame::{Frame, Slot};
pub use heap::{Heap, HeapRecord, StaticTable};
pub use machine::{Checkpoint, Machine, MachineConfig, Outcome, StepResult};
pub use native::{can_handle, NativeOp, NativeRegistry};
pub use query::QueryTarget;

use provenir_core::{ObjectId, ProgramError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VmError {
    #[error("Stack underflow at {0}")]
    StackUnderflow(String),
    #[error("Invalid local slot: {0}")]
    InvalidLocal(String),
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),
    #[error("Unknown method: {0}")]
    UnknownMethod(String),
    #[error("Dangling reference: {0}")]
    DanglingRef(ObjectId),
    #[error("Missing builtin class: {0}")]
    MissingBuiltin(String),
    #[error("No active frame")]
    NoActiveFrame,
    #[error("Execution fell off the end of {0}")]
    PcOutOfRange(String),
    #[error("Step limit exceeded after {0} steps")]
    StepLimit(u64),
    #[error("Uncaught {0}")]
    Uncaught(Thrown),
    #[error(transparent)]
    Program(#[from] ProgramError),
}

pub type Result<T> = std::result::Result<T, VmError>;

#[cfg(test)]
mod tests;
