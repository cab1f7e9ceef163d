use crate::{Result, VmError};
use provenir_core::{builtin, ClassId, Dep, DependencySource, ObjectId, Program};

/// Interpreter-level fault categories. The tracking layer never decides whether a fault occurs;
/// the interpreter raises them. Its duty is composing the dependency each one carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    NullReference,
    IndexOutOfBounds,
    BadCast,
    DivisionByZero,
    NegativeArraySize,
    ArrayStoreMismatch,
    MissingField,
}

impl FaultKind {
    pub fn class_name(self) -> &'static str {
        match self {
            FaultKind::NullReference => builtin::NULL_REFERENCE_ERROR,
            FaultKind::IndexOutOfBounds => builtin::INDEX_OUT_OF_BOUNDS_ERROR,
            FaultKind::BadCast => builtin::CAST_ERROR,
            FaultKind::DivisionByZero => builtin::ARITHMETIC_ERROR,
            FaultKind::NegativeArraySize => builtin::NEGATIVE_ARRAY_SIZE_ERROR,
            FaultKind::ArrayStoreMismatch => builtin::ARRAY_STORE_ERROR,
            FaultKind::MissingField => builtin::MISSING_FIELD_ERROR,
        }
    }
}

/// An in-flight guest exception: the thrown object, its class, where it was raised, and the
/// dependency explaining why. Surfaced as `VmError::Uncaught` when no handler matches.
#[derive(Debug, Clone)]
pub struct Thrown {
    pub exception: ObjectId,
    pub class: ClassId,
    pub class_name: String,
    pub at: DependencySource,
    pub dep: Option<Dep>,
}

impl std::fmt::Display for Thrown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}", self.class_name, self.at)
    }
}

/// Resolved ids of the builtin classes the interpreter allocates on its own: strings, boxes, and
/// the fault exception hierarchy.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinClasses {
    pub object: ClassId,
    pub string: ClassId,
    pub integer: ClassId,
    pub error: ClassId,
    pub null_reference: ClassId,
    pub index_out_of_bounds: ClassId,
    pub cast: ClassId,
    pub arithmetic: ClassId,
    pub negative_array_size: ClassId,
    pub array_store: ClassId,
    pub missing_field: ClassId,
}

impl BuiltinClasses {
    pub fn resolve(program: &Program) -> Result<Self> {
        let lookup = |name: &str| -> Result<ClassId> {
            program
                .class_by_name(name)
                .map(|c| c.id)
                .ok_or_else(|| VmError::MissingBuiltin(name.to_string()))
        };
        Ok(Self {
            object: lookup(builtin::OBJECT)?,
            string: lookup(builtin::STRING)?,
            integer: lookup(builtin::INTEGER)?,
            error: lookup(builtin::ERROR)?,
            null_reference: lookup(builtin::NULL_REFERENCE_ERROR)?,
            index_out_of_bounds: lookup(builtin::INDEX_OUT_OF_BOUNDS_ERROR)?,
            cast: lookup(builtin::CAST_ERROR)?,
            arithmetic: lookup(builtin::ARITHMETIC_ERROR)?,
            negative_array_size: lookup(builtin::NEGATIVE_ARRAY_SIZE_ERROR)?,
            array_store: lookup(builtin::ARRAY_STORE_ERROR)?,
            missing_field: lookup(builtin::MISSING_FIELD_ERROR)?,
        })
    }

    pub fn class_for(&self, kind: FaultKind) -> ClassId {
        match kind {
            FaultKind::NullReference => self.null_reference,
            FaultKind::IndexOutOfBounds => self.index_out_of_bounds,
            FaultKind::BadCast => self.cast,
            FaultKind::DivisionByZero => self.arithmetic,
            FaultKind::NegativeArraySize => self.negative_array_size,
            FaultKind::ArrayStoreMismatch => self.array_store,
            FaultKind::MissingField => self.missing_field,
        }
    }
}
