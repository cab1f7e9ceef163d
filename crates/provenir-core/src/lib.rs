/*! Core dependency model and guest program types for provenance tracking.
 *
 * Fault localization needs to answer "why does this value exist?" for every value a program
 * produces. This crate provides the building blocks: immutable dependency nodes describing where
 * a value came from, the composition rule that merges operand and control dependencies, and the
 * stack-machine program model the interpreter in `provenir-vm` executes.
 */

pub mod builder;
pub mod dep;
pub mod instructions;
pub mod program;
pub mod property;
pub mod types;
pub mod values;

pub use builder::{Label, MethodBuilder, ProgramBuilder};
pub use dep::{compose, Dep, DependencySource, DynamicDependency, ThreadId, FLATTEN_LIMIT};
pub use instructions::{BinaryOp, CompareOp, Constant, Instruction, Pc, UnaryOp};
pub use program::{builtin, Class, Code, ExceptionHandler, FieldDef, Method, MethodBody, Program};
pub use property::{ArrayProperty, ObjectProperty};
pub use types::{ClassId, FieldRef, MethodId, MethodSig, Type};
pub use values::{ObjectId, Value};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProgramError {
    #[error("Builder error: {0}")]
    BuilderError(String),
    #[error("Duplicate definition: {0}")]
    DuplicateDefinition(String),
    #[error("Unknown class: {0}")]
    UnknownClass(String),
    #[error("Unknown method: {0}")]
    UnknownMethod(String),
    #[error("Unknown field: {0}")]
    UnknownField(String),
    #[error("Unbound label L{0}")]
    UnboundLabel(u32),
    #[error("Invalid branch target {target} in {method}")]
    InvalidTarget { method: String, target: u32 },
    #[error("Method has no body: {0}")]
    MissingBody(String),
}

pub type Result<T> = std::result::Result<T, ProgramError>;
