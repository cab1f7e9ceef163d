use crate::fault::FaultKind;
use crate::frame::Slot;
use crate::heap::HeapRecord;
use crate::machine::Machine;
use crate::{Result, VmError};
use provenir_core::{compose, DependencySource, FieldRef, Value};

pub(crate) fn get_field(m: &mut Machine, field: FieldRef, at: DependencySource) -> Result<()> {
    let objref = m.pop(at)?;
    let Some(id) = objref.value.as_ref() else {
        // Reading through null: the failure is explained by where the reference came from.
        let dep = compose(&[objref.dep.as_ref()], m.control().as_ref());
        return m.raise(FaultKind::NullReference, dep, at);
    };

    let record = m.record(id)?;
    match record {
        HeapRecord::Object { class, fields, props } => {
            if !m.program.is_subclass(*class, field.class) {
                // The object's own recorded type provenance explains why the field is missing.
                let dep = compose(
                    &[objref.dep.as_ref(), props.type_dep.as_ref()],
                    m.control().as_ref(),
                );
                return m.raise(FaultKind::MissingField, dep, at);
            }
            let stored = fields.get(field.index as usize).cloned().ok_or_else(|| {
                VmError::TypeMismatch(format!("field {} out of range at {}", field, at))
            })?;
            let dep = compose(&[stored.dep.as_ref()], m.control().as_ref());
            m.push(stored.value, dep)
        }
        HeapRecord::Array { props, .. } => {
            let dep = compose(
                &[objref.dep.as_ref(), props.type_dep.as_ref()],
                m.control().as_ref(),
            );
            m.raise(FaultKind::MissingField, dep, at)
        }
    }
}

pub(crate) fn put_field(m: &mut Machine, field: FieldRef, at: DependencySource) -> Result<()> {
    let value = m.pop(at)?;
    let objref = m.pop(at)?;
    let Some(id) = objref.value.as_ref() else {
        let dep = compose(&[objref.dep.as_ref()], m.control().as_ref());
        return m.raise(FaultKind::NullReference, dep, at);
    };

    let dep = compose(&[value.dep.as_ref()], m.control().as_ref());
    let mismatch = match m.record(id)? {
        HeapRecord::Object { class, props, .. } => {
            if m.program.is_subclass(*class, field.class) {
                None
            } else {
                Some(compose(
                    &[objref.dep.as_ref(), props.type_dep.as_ref()],
                    m.control().as_ref(),
                ))
            }
        }
        HeapRecord::Array { props, .. } => Some(compose(
            &[objref.dep.as_ref(), props.type_dep.as_ref()],
            m.control().as_ref(),
        )),
    };
    if let Some(fault_dep) = mismatch {
        return m.raise(FaultKind::MissingField, fault_dep, at);
    }

    match m.heap.get_mut(id) {
        Some(HeapRecord::Object { fields, .. }) => {
            let entry = fields.get_mut(field.index as usize).ok_or_else(|| {
                VmError::TypeMismatch(format!("field {} out of range at {}", field, at))
            })?;
            *entry = Slot::new(value.value, dep);
            Ok(())
        }
        _ => Err(VmError::DanglingRef(id)),
    }
}

pub(crate) fn get_static(m: &mut Machine, field: FieldRef, at: DependencySource) -> Result<()> {
    let stored = m.statics.get(field).cloned();
    let (value, stored_dep) = match stored {
        Some(slot) => (slot.value, slot.dep),
        None => {
            let ty = m
                .program
                .class(field.class)
                .and_then(|c| c.statics.get(field.index as usize))
                .map(|f| f.ty.clone())
                .ok_or_else(|| {
                    VmError::TypeMismatch(format!("static {} out of range at {}", field, at))
                })?;
            (Value::default_for(&ty), None)
        }
    };
    let dep = compose(&[stored_dep.as_ref()], m.control().as_ref());
    m.push(value, dep)
}

pub(crate) fn put_static(m: &mut Machine, field: FieldRef, at: DependencySource) -> Result<()> {
    let value = m.pop(at)?;
    let dep = compose(&[value.dep.as_ref()], m.control().as_ref());
    m.statics.set(field, Slot::new(value.value, dep));
    Ok(())
}
