use crate::dep::Dep;

/// Provenance record attached to every heap object at allocation. Explains where the object came
/// from (the allocation site under its control condition) and why it has the type it has, so a
/// failure on the object can be traced to the object's own history rather than only the faulting
/// instruction.
#[derive(Debug, Clone, Default)]
pub struct ObjectProperty {
    pub allocation: Option<Dep>,
    pub type_dep: Option<Dep>,
}

/// Provenance record attached to every array at allocation. `length` additionally folds in the
/// dependency of the requested-length operand, so an out-of-bounds fault can name the computation
/// that sized the array.
#[derive(Debug, Clone, Default)]
pub struct ArrayProperty {
    pub allocation: Option<Dep>,
    pub type_dep: Option<Dep>,
    pub length: Option<Dep>,
}
