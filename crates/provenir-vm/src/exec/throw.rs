use crate::fault::FaultKind;
use crate::machine::Machine;
use crate::Result;
use provenir_core::{compose, DependencySource};

pub(crate) fn throw_top(m: &mut Machine, at: DependencySource) -> Result<()> {
    let slot = m.pop(at)?;
    let dep = compose(&[slot.dep.as_ref()], m.control().as_ref());
    match slot.value.as_ref() {
        Some(id) => m.throw_object(id, dep, at),
        None => m.raise(FaultKind::NullReference, dep, at),
    }
}
