use crate::fault::FaultKind;
use crate::heap::HeapRecord;
use crate::machine::Machine;
use crate::{Result, VmError};
use provenir_core::{compose, Dep, DependencySource, Type, Value};

fn recorded_type_dep(record: &HeapRecord) -> Option<&Dep> {
    match record {
        HeapRecord::Object { props, .. } => props.type_dep.as_ref(),
        HeapRecord::Array { props, .. } => props.type_dep.as_ref(),
    }
}

pub(crate) fn check_cast(m: &mut Machine, to: Type, at: DependencySource) -> Result<()> {
    // The reference stays on the stack; a successful cast attaches nothing new.
    let slot = m
        .frame()?
        .peek()
        .cloned()
        .ok_or_else(|| VmError::StackUnderflow(at.to_string()))?;
    let Some(id) = slot.value.as_ref() else {
        // null casts to anything
        if slot.value.is_null() {
            return Ok(());
        }
        return Err(VmError::TypeMismatch(format!(
            "checkcast on {} at {}",
            slot.value.kind_name(),
            at
        )));
    };

    let record = m.record(id)?;
    if m.program.is_assignable(&record.runtime_type(), &to) {
        return Ok(());
    }
    let dep = compose(
        &[slot.dep.as_ref(), recorded_type_dep(record)],
        m.control().as_ref(),
    );
    m.pop(at)?;
    m.raise(FaultKind::BadCast, dep, at)
}

pub(crate) fn instance_of(m: &mut Machine, of: Type, at: DependencySource) -> Result<()> {
    let slot = m.pop(at)?;
    if !slot.value.is_reference() {
        return Err(VmError::TypeMismatch(format!(
            "instanceof on {} at {}",
            slot.value.kind_name(),
            at
        )));
    }
    match slot.value.as_ref() {
        None => {
            // null is an instance of nothing; the answer derives from the reference alone.
            let dep = compose(&[slot.dep.as_ref()], m.control().as_ref());
            m.push(Value::Bool(false), dep)
        }
        Some(id) => {
            let record = m.record(id)?;
            let result = m.program.is_assignable(&record.runtime_type(), &of);
            let dep = compose(
                &[slot.dep.as_ref(), recorded_type_dep(record)],
                m.control().as_ref(),
            );
            m.push(Value::Bool(result), dep)
        }
    }
}
