use crate::frame::Slot;
use provenir_core::{ArrayProperty, ClassId, FieldRef, ObjectId, ObjectProperty, Type, Value};
use std::collections::HashMap;

/// One heap-resident object or array. Field and element slots pair each stored value with its
/// dependency; the property record is written once at allocation and read-only afterwards.
#[derive(Debug, Clone)]
pub enum HeapRecord {
    Object {
        class: ClassId,
        fields: Vec<Slot>,
        props: ObjectProperty,
    },
    Array {
        elem: Type,
        elems: Vec<Slot>,
        props: ArrayProperty,
    },
}

impl HeapRecord {
    pub fn class(&self) -> Option<ClassId> {
        match self {
            HeapRecord::Object { class, .. } => Some(*class),
            HeapRecord::Array { .. } => None,
        }
    }

    pub fn runtime_type(&self) -> Type {
        match self {
            HeapRecord::Object { class, .. } => Type::Object(*class),
            HeapRecord::Array { elem, .. } => Type::array_of(elem.clone()),
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, HeapRecord::Array { .. })
    }
}

/// Arena of heap records indexed by `ObjectId`. The side tables and property records live inside
/// the record that owns them, so their lifetime is exactly the object's.
#[derive(Debug, Clone, Default)]
pub struct Heap {
    records: Vec<HeapRecord>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc_object(
        &mut self,
        class: ClassId,
        field_types: &[Type],
        props: ObjectProperty,
    ) -> ObjectId {
        let fields = field_types
            .iter()
            .map(|ty| Slot::bare(Value::default_for(ty)))
            .collect();
        self.push(HeapRecord::Object {
            class,
            fields,
            props,
        })
    }

    pub fn alloc_array(&mut self, elem: Type, len: usize, props: ArrayProperty) -> ObjectId {
        let elems = vec![Slot::bare(Value::default_for(&elem)); len];
        self.push(HeapRecord::Array { elem, elems, props })
    }

    fn push(&mut self, record: HeapRecord) -> ObjectId {
        let id = ObjectId(self.records.len() as u32);
        self.records.push(record);
        id
    }

    pub fn get(&self, id: ObjectId) -> Option<&HeapRecord> {
        self.records.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut HeapRecord> {
        self.records.get_mut(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Static field storage, keyed by (class, index). Slots absent from the table read as the
/// field's default value with no dependency.
#[derive(Debug, Clone, Default)]
pub struct StaticTable {
    entries: HashMap<(ClassId, u16), Slot>,
}

impl StaticTable {
    pub fn get(&self, field: FieldRef) -> Option<&Slot> {
        self.entries.get(&(field.class, field.index))
    }

    pub fn set(&mut self, field: FieldRef, slot: Slot) {
        self.entries.insert((field.class, field.index), slot);
    }
}
