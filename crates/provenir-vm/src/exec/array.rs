use crate::fault::FaultKind;
use crate::frame::Slot;
use crate::heap::HeapRecord;
use crate::machine::Machine;
use crate::{Result, VmError};
use provenir_core::{compose, ArrayProperty, DependencySource, Type, Value};

fn array_parts(m: &Machine, id: provenir_core::ObjectId) -> Result<(Type, usize, ArrayProperty)> {
    match m.record(id)? {
        HeapRecord::Array { elem, elems, props } => {
            Ok((elem.clone(), elems.len(), props.clone()))
        }
        HeapRecord::Object { .. } => Err(VmError::TypeMismatch(format!(
            "{} is not an array",
            id
        ))),
    }
}

pub(crate) fn load(m: &mut Machine, at: DependencySource) -> Result<()> {
    let index = m.pop(at)?;
    let arrayref = m.pop(at)?;
    let Some(id) = arrayref.value.as_ref() else {
        let dep = compose(
            &[index.dep.as_ref(), arrayref.dep.as_ref()],
            m.control().as_ref(),
        );
        return m.raise(FaultKind::NullReference, dep, at);
    };
    let (_, len, props) = array_parts(m, id)?;
    let idx = index.value.as_int().ok_or_else(|| {
        VmError::TypeMismatch(format!("array index must be int at {}", at))
    })?;

    if idx < 0 || idx as usize >= len {
        // The recorded length provenance explains how the array came to be this size.
        let dep = compose(
            &[
                index.dep.as_ref(),
                arrayref.dep.as_ref(),
                props.length.as_ref(),
            ],
            m.control().as_ref(),
        );
        return m.raise(FaultKind::IndexOutOfBounds, dep, at);
    }

    let stored = match m.record(id)? {
        HeapRecord::Array { elems, .. } => elems[idx as usize].clone(),
        HeapRecord::Object { .. } => return Err(VmError::DanglingRef(id)),
    };
    // The loaded value also depends on which element was selected.
    let dep = compose(
        &[stored.dep.as_ref(), index.dep.as_ref()],
        m.control().as_ref(),
    );
    m.push(stored.value, dep)
}

pub(crate) fn store(m: &mut Machine, at: DependencySource) -> Result<()> {
    let value = m.pop(at)?;
    let index = m.pop(at)?;
    let arrayref = m.pop(at)?;
    let Some(id) = arrayref.value.as_ref() else {
        let dep = compose(
            &[index.dep.as_ref(), arrayref.dep.as_ref()],
            m.control().as_ref(),
        );
        return m.raise(FaultKind::NullReference, dep, at);
    };
    let (elem_ty, len, props) = array_parts(m, id)?;
    let idx = index.value.as_int().ok_or_else(|| {
        VmError::TypeMismatch(format!("array index must be int at {}", at))
    })?;

    if idx < 0 || idx as usize >= len {
        let dep = compose(
            &[
                index.dep.as_ref(),
                arrayref.dep.as_ref(),
                props.length.as_ref(),
            ],
            m.control().as_ref(),
        );
        return m.raise(FaultKind::IndexOutOfBounds, dep, at);
    }

    if elem_ty.is_reference() {
        if let Some(stored_id) = value.value.as_ref() {
            let stored_ty = m.record(stored_id)?.runtime_type();
            if !m.program.is_assignable(&stored_ty, &elem_ty) {
                let dep = compose(
                    &[
                        value.dep.as_ref(),
                        index.dep.as_ref(),
                        arrayref.dep.as_ref(),
                        props.type_dep.as_ref(),
                    ],
                    m.control().as_ref(),
                );
                return m.raise(FaultKind::ArrayStoreMismatch, dep, at);
            }
        }
    }

    let dep = compose(
        &[
            value.dep.as_ref(),
            index.dep.as_ref(),
            arrayref.dep.as_ref(),
        ],
        m.control().as_ref(),
    );
    match m.heap.get_mut(id) {
        Some(HeapRecord::Array { elems, .. }) => {
            elems[idx as usize] = Slot::new(value.value, dep);
            Ok(())
        }
        _ => Err(VmError::DanglingRef(id)),
    }
}

pub(crate) fn length(m: &mut Machine, at: DependencySource) -> Result<()> {
    let arrayref = m.pop(at)?;
    let Some(id) = arrayref.value.as_ref() else {
        let dep = compose(&[arrayref.dep.as_ref()], m.control().as_ref());
        return m.raise(FaultKind::NullReference, dep, at);
    };
    let (_, len, props) = array_parts(m, id)?;
    let dep = compose(&[props.length.as_ref()], m.control().as_ref());
    m.push(Value::Int(len as i64), dep)
}
