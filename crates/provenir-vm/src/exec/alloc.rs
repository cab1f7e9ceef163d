use crate::fault::FaultKind;
use crate::frame::Slot;
use crate::heap::HeapRecord;
use crate::machine::Machine;
use crate::{Result, VmError};
use provenir_core::{
    compose, ArrayProperty, ClassId, Dep, DependencySource, ObjectId, ObjectProperty, Type, Value,
};

pub(crate) fn new_object(m: &mut Machine, class: ClassId, at: DependencySource) -> Result<()> {
    let site = m.site_dep(at);
    let field_types: Vec<Type> = m
        .program
        .class(class)
        .ok_or_else(|| VmError::TypeMismatch(format!("unknown class {} at {}", class, at)))?
        .fields
        .iter()
        .map(|f| f.ty.clone())
        .collect();
    let props = ObjectProperty {
        allocation: site.clone(),
        type_dep: site.clone(),
    };
    let id = m.heap.alloc_object(class, &field_types, props);
    m.push(Value::Ref(id), site)
}

pub(crate) fn new_array(m: &mut Machine, elem: Type, at: DependencySource) -> Result<()> {
    let length = m.pop(at)?;
    let len = length.value.as_int().ok_or_else(|| {
        VmError::TypeMismatch(format!("array length must be int at {}", at))
    })?;
    if len < 0 {
        let dep = compose(&[length.dep.as_ref()], m.control().as_ref());
        return m.raise(FaultKind::NegativeArraySize, dep, at);
    }

    let site = m.site_dep(at);
    let id = alloc_with_props(m, elem, len as usize, &site, length.dep.as_ref());
    m.push(Value::Ref(id), site)
}

/// Multi-dimensional allocation recurses per dimension; every level shares the one instruction
/// identity of the allocating site, and each level's length dependency folds in the operand that
/// requested that dimension's size.
pub(crate) fn multi_new_array(
    m: &mut Machine,
    elem: Type,
    dims: u8,
    at: DependencySource,
) -> Result<()> {
    if dims == 0 {
        return Err(VmError::TypeMismatch(format!(
            "multianewarray needs at least one dimension at {}",
            at
        )));
    }
    let mut counts = Vec::with_capacity(dims as usize);
    for _ in 0..dims {
        counts.push(m.pop(at)?);
    }
    counts.reverse(); // first pushed count is the outermost dimension

    let site = m.site_dep(at);
    for count in &counts {
        let len = count.value.as_int().ok_or_else(|| {
            VmError::TypeMismatch(format!("array length must be int at {}", at))
        })?;
        if len < 0 {
            let dep = compose(&[count.dep.as_ref()], m.control().as_ref());
            return m.raise(FaultKind::NegativeArraySize, dep, at);
        }
    }

    let id = alloc_nested(m, &elem, &counts, &site);
    m.push(Value::Ref(id), site)
}

fn alloc_nested(m: &mut Machine, elem: &Type, counts: &[Slot], site: &Option<Dep>) -> ObjectId {
    let this_ty = elem.clone().nested_array((counts.len() - 1) as u8);
    let len = counts[0].value.as_int().unwrap_or(0) as usize;
    let id = alloc_with_props(m, this_ty, len, site, counts[0].dep.as_ref());

    if counts.len() > 1 {
        let children: Vec<ObjectId> = (0..len)
            .map(|_| alloc_nested(m, elem, &counts[1..], site))
            .collect();
        if let Some(HeapRecord::Array { elems, .. }) = m.heap.get_mut(id) {
            for (slot, child) in elems.iter_mut().zip(children) {
                *slot = Slot::new(Value::Ref(child), site.clone());
            }
        }
    }
    id
}

fn alloc_with_props(
    m: &mut Machine,
    elem: Type,
    len: usize,
    site: &Option<Dep>,
    length_dep: Option<&Dep>,
) -> ObjectId {
    let props = ArrayProperty {
        allocation: site.clone(),
        type_dep: site.clone(),
        length: compose(&[site.as_ref(), length_dep], None),
    };
    m.heap.alloc_array(elem, len, props)
}
