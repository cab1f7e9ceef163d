/*! Downstream query surface.
 *
 * A fault-localization consumer asks "why does this slot hold this value?" and walks the answer
 * as a DAG of leaf sources. Everything here is in-process object-graph access; there is no wire
 * format and no state beyond what the machine already holds.
 */

use crate::heap::HeapRecord;
use crate::machine::Machine;
use provenir_core::{Dep, FieldRef, ObjectId, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryTarget {
    /// Local variable slot of a live frame (0 = entry frame).
    Local { frame: usize, slot: u16 },
    /// Operand stack slot of a live frame, counted from the bottom.
    Stack { frame: usize, index: usize },
    Field { object: ObjectId, index: u16 },
    Element { array: ObjectId, index: usize },
    Static { field: FieldRef },
    LastReturn,
}

impl Machine {
    /// The current dependency of the targeted slot; `None` means the value is path-independent
    /// and unconditionally known, or that provenance for it was intentionally omitted. Both
    /// read the same to a consumer, which must treat `None` as a valid answer.
    pub fn dependency_of(&self, target: QueryTarget) -> Option<Dep> {
        self.slot_of(target).and_then(|(_, dep)| dep)
    }

    pub fn value_of(&self, target: QueryTarget) -> Option<Value> {
        self.slot_of(target).map(|(value, _)| value)
    }

    fn slot_of(&self, target: QueryTarget) -> Option<(Value, Option<Dep>)> {
        match target {
            QueryTarget::Local { frame, slot } => {
                let slot = self.frames.get(frame)?.local(slot)?;
                Some((slot.value, slot.dep.clone()))
            }
            QueryTarget::Stack { frame, index } => {
                let slot = self.frames.get(frame)?.stack.get(index)?;
                Some((slot.value, slot.dep.clone()))
            }
            QueryTarget::Field { object, index } => match self.heap.get(object)? {
                HeapRecord::Object { fields, .. } => {
                    let slot = fields.get(index as usize)?;
                    Some((slot.value, slot.dep.clone()))
                }
                HeapRecord::Array { .. } => None,
            },
            QueryTarget::Element { array, index } => match self.heap.get(array)? {
                HeapRecord::Array { elems, .. } => {
                    let slot = elems.get(index)?;
                    Some((slot.value, slot.dep.clone()))
                }
                HeapRecord::Object { .. } => None,
            },
            QueryTarget::Static { field } => {
                let slot = self.statics.get(field)?;
                Some((slot.value, slot.dep.clone()))
            }
            QueryTarget::LastReturn => {
                let slot = self.last_return.as_ref()?;
                Some((slot.value, slot.dep.clone()))
            }
        }
    }

    /// The allocation provenance recorded for a heap object at its `new`.
    pub fn allocation_dep(&self, id: ObjectId) -> Option<Dep> {
        match self.heap.get(id)? {
            HeapRecord::Object { props, .. } => props.allocation.clone(),
            HeapRecord::Array { props, .. } => props.allocation.clone(),
        }
    }

    /// The type provenance recorded for a heap object at its allocation.
    pub fn type_dep(&self, id: ObjectId) -> Option<Dep> {
        match self.heap.get(id)? {
            HeapRecord::Object { props, .. } => props.type_dep.clone(),
            HeapRecord::Array { props, .. } => props.type_dep.clone(),
        }
    }

    /// The length provenance recorded for an array at its allocation.
    pub fn length_dep(&self, id: ObjectId) -> Option<Dep> {
        match self.heap.get(id)? {
            HeapRecord::Array { props, .. } => props.length.clone(),
            HeapRecord::Object { .. } => None,
        }
    }
}
