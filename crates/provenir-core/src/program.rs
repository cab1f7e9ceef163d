use crate::instructions::{Instruction, Pc};
use crate::types::{ClassId, MethodId, MethodSig, Type};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Names of the classes every program carries. The program builder seeds them so the interpreter
/// can allocate strings, boxes, and fault exceptions without the guest declaring anything.
pub mod builtin {
    pub const OBJECT: &str = "Object";
    pub const STRING: &str = "String";
    pub const INTEGER: &str = "Integer";
    pub const ERROR: &str = "Error";
    pub const NULL_REFERENCE_ERROR: &str = "NullReferenceError";
    pub const INDEX_OUT_OF_BOUNDS_ERROR: &str = "IndexOutOfBoundsError";
    pub const CAST_ERROR: &str = "CastError";
    pub const ARITHMETIC_ERROR: &str = "ArithmeticError";
    pub const NEGATIVE_ARRAY_SIZE_ERROR: &str = "NegativeArraySizeError";
    pub const ARRAY_STORE_ERROR: &str = "ArrayStoreError";
    pub const MISSING_FIELD_ERROR: &str = "MissingFieldError";

    /// Index of `String.chars`, the backing character array the native boundary unwraps.
    pub const STRING_CHARS_FIELD: u16 = 0;
    /// Index of `Integer.value`.
    pub const INTEGER_VALUE_FIELD: u16 = 0;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Class {
    pub id: ClassId,
    pub name: String,
    pub extends: Option<ClassId>,
    pub fields: Vec<FieldDef>,
    pub statics: Vec<FieldDef>,
}

impl Class {
    pub fn field_index(&self, name: &str) -> Option<u16> {
        self.fields.iter().position(|fd| fd.name == name).map(|i| i as u16)
    }

    pub fn static_index(&self, name: &str) -> Option<u16> {
        self.statics.iter().position(|fd| fd.name == name).map(|i| i as u16)
    }
}

/// Guarded region of a method body. `class: None` catches everything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExceptionHandler {
    pub start: Pc,
    pub end: Pc,
    pub target: Pc,
    pub class: Option<ClassId>,
}

impl ExceptionHandler {
    pub fn covers(&self, pc: Pc) -> bool {
        self.start <= pc && pc < self.end
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Code {
    pub max_locals: u16,
    pub code: Vec<Instruction>,
    pub handlers: Vec<ExceptionHandler>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MethodBody {
    Bytecode(Code),
    Native,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Method {
    pub id: MethodId,
    pub owner: ClassId,
    pub name: String,
    pub sig: MethodSig,
    pub body: MethodBody,
}

impl Method {
    pub fn is_native(&self) -> bool {
        matches!(self.body, MethodBody::Native)
    }

    pub fn code(&self) -> Option<&Code> {
        match &self.body {
            MethodBody::Bytecode(code) => Some(code),
            MethodBody::Native => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    pub classes: IndexMap<ClassId, Class>,
    pub methods: IndexMap<MethodId, Method>,
}

impl Program {
    pub fn class(&self, id: ClassId) -> Option<&Class> {
        self.classes.get(&id)
    }

    pub fn method(&self, id: MethodId) -> Option<&Method> {
        self.methods.get(&id)
    }

    pub fn class_by_name(&self, name: &str) -> Option<&Class> {
        self.classes.values().find(|c| c.name == name)
    }

    /// Looks up `Class.method`.
    pub fn method_by_name(&self, qualified: &str) -> Option<&Method> {
        let (class_name, method_name) = qualified.split_once('.')?;
        let class = self.class_by_name(class_name)?;
        self.methods
            .values()
            .find(|m| m.owner == class.id && m.name == method_name)
    }

    pub fn class_name(&self, id: ClassId) -> &str {
        self.class(id).map(|c| c.name.as_str()).unwrap_or("<unknown>")
    }

    pub fn qualified_method_name(&self, id: MethodId) -> String {
        match self.method(id) {
            Some(m) => format!("{}.{}", self.class_name(m.owner), m.name),
            None => format!("<unknown {}>", id),
        }
    }

    pub fn is_subclass(&self, sub: ClassId, sup: ClassId) -> bool {
        let mut current = Some(sub);
        while let Some(id) = current {
            if id == sup {
                return true;
            }
            current = self.class(id).and_then(|c| c.extends);
        }
        false
    }

    /// Assignability for casts, type tests, and array store checks. Primitives are invariant,
    /// object types follow the subclass chain, arrays are covariant in their element type.
    pub fn is_assignable(&self, from: &Type, to: &Type) -> bool {
        match (from, to) {
            (Type::Object(sub), Type::Object(sup)) => self.is_subclass(*sub, *sup),
            (Type::Array(from_elem), Type::Array(to_elem)) => {
                self.is_assignable(from_elem, to_elem)
            }
            _ => from == to,
        }
    }

    /// Display form of a type with class names resolved.
    pub fn type_name(&self, ty: &Type) -> String {
        match ty {
            Type::Object(id) => self.class_name(*id).to_string(),
            Type::Array(elem) => format!("{}[]", self.type_name(elem)),
            other => other.to_string(),
        }
    }
}
