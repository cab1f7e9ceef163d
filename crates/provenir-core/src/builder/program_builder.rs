use crate::program::{builtin, Class, Code, FieldDef, Method, MethodBody, Program};
use crate::types::{ClassId, FieldRef, MethodId, MethodSig, Type};
use crate::{ProgramError, Result};
use indexmap::IndexMap;

pub struct ProgramBuilder {
    classes: IndexMap<ClassId, Class>,
    methods: IndexMap<MethodId, Method>,
    defined: Vec<MethodId>,
    next_class_id: u32,
    next_method_id: u32,
}

impl ProgramBuilder {
    /// A builder pre-seeded with the builtin classes (`Object`, `String`, `Integer`, and the
    /// fault error hierarchy).
    pub fn new() -> Self {
        let mut builder = Self {
            classes: IndexMap::new(),
            methods: IndexMap::new(),
            defined: Vec::new(),
            next_class_id: 0,
            next_method_id: 0,
        };
        builder.seed_builtins();
        builder
    }

    fn seed_builtins(&mut self) {
        // Seeding cannot collide, the builder starts empty.
        let object = self.declare_class_unchecked(builtin::OBJECT, None);
        let string = self.declare_class_unchecked(builtin::STRING, Some(object));
        self.push_field(string, "chars", Type::array_of(Type::Int));
        let integer = self.declare_class_unchecked(builtin::INTEGER, Some(object));
        self.push_field(integer, "value", Type::Int);
        let error = self.declare_class_unchecked(builtin::ERROR, Some(object));
        for name in [
            builtin::NULL_REFERENCE_ERROR,
            builtin::INDEX_OUT_OF_BOUNDS_ERROR,
            builtin::CAST_ERROR,
            builtin::ARITHMETIC_ERROR,
            builtin::NEGATIVE_ARRAY_SIZE_ERROR,
            builtin::ARRAY_STORE_ERROR,
            builtin::MISSING_FIELD_ERROR,
        ] {
            self.declare_class_unchecked(name, Some(error));
        }
    }

    fn declare_class_unchecked(&mut self, name: &str, extends: Option<ClassId>) -> ClassId {
        let id = ClassId(self.next_class_id);
        self.next_class_id += 1;
        self.classes.insert(
            id,
            Class {
                id,
                name: name.to_string(),
                extends,
                fields: Vec::new(),
                statics: Vec::new(),
            },
        );
        id
    }

    fn push_field(&mut self, class: ClassId, name: &str, ty: Type) {
        if let Some(c) = self.classes.get_mut(&class) {
            c.fields.push(FieldDef {
                name: name.to_string(),
                ty,
            });
        }
    }

    pub fn declare_class(&mut self, name: &str) -> Result<ClassId> {
        if self.classes.values().any(|c| c.name == name) {
            return Err(ProgramError::DuplicateDefinition(name.to_string()));
        }
        Ok(self.declare_class_unchecked(name, self.class_id(builtin::OBJECT).ok()))
    }

    pub fn set_extends(&mut self, class: ClassId, superclass: ClassId) -> Result<()> {
        let c = self
            .classes
            .get_mut(&class)
            .ok_or_else(|| ProgramError::UnknownClass(class.to_string()))?;
        c.extends = Some(superclass);
        Ok(())
    }

    pub fn add_field(&mut self, class: ClassId, name: &str, ty: Type) -> Result<FieldRef> {
        let c = self
            .classes
            .get_mut(&class)
            .ok_or_else(|| ProgramError::UnknownClass(class.to_string()))?;
        if c.field_index(name).is_some() {
            return Err(ProgramError::DuplicateDefinition(format!(
                "{}.{}",
                c.name, name
            )));
        }
        c.fields.push(FieldDef {
            name: name.to_string(),
            ty,
        });
        Ok(FieldRef {
            class,
            index: (c.fields.len() - 1) as u16,
        })
    }

    pub fn add_static(&mut self, class: ClassId, name: &str, ty: Type) -> Result<FieldRef> {
        let c = self
            .classes
            .get_mut(&class)
            .ok_or_else(|| ProgramError::UnknownClass(class.to_string()))?;
        if c.static_index(name).is_some() {
            return Err(ProgramError::DuplicateDefinition(format!(
                "{}.{}",
                c.name, name
            )));
        }
        c.statics.push(FieldDef {
            name: name.to_string(),
            ty,
        });
        Ok(FieldRef {
            class,
            index: (c.statics.len() - 1) as u16,
        })
    }

    pub fn declare_method(&mut self, class: ClassId, name: &str, sig: MethodSig) -> Result<MethodId> {
        self.declare_method_with_body(class, name, sig, None)
    }

    pub fn declare_native(&mut self, class: ClassId, name: &str, sig: MethodSig) -> Result<MethodId> {
        self.declare_method_with_body(class, name, sig, Some(MethodBody::Native))
    }

    fn declare_method_with_body(
        &mut self,
        class: ClassId,
        name: &str,
        sig: MethodSig,
        body: Option<MethodBody>,
    ) -> Result<MethodId> {
        if !self.classes.contains_key(&class) {
            return Err(ProgramError::UnknownClass(class.to_string()));
        }
        if self
            .methods
            .values()
            .any(|m| m.owner == class && m.name == name)
        {
            return Err(ProgramError::DuplicateDefinition(name.to_string()));
        }
        let id = MethodId(self.next_method_id);
        self.next_method_id += 1;
        let is_native = body.is_some();
        self.methods.insert(
            id,
            Method {
                id,
                owner: class,
                name: name.to_string(),
                sig,
                body: body.unwrap_or(MethodBody::Bytecode(Code {
                    max_locals: 0,
                    code: Vec::new(),
                    handlers: Vec::new(),
                })),
            },
        );
        if is_native {
            self.defined.push(id);
        }
        Ok(id)
    }

    pub fn define_method(&mut self, id: MethodId, code: Code) -> Result<()> {
        let m = self
            .methods
            .get_mut(&id)
            .ok_or_else(|| ProgramError::UnknownMethod(id.to_string()))?;
        m.body = MethodBody::Bytecode(code);
        self.defined.push(id);
        Ok(())
    }

    pub fn class_id(&self, name: &str) -> Result<ClassId> {
        self.classes
            .values()
            .find(|c| c.name == name)
            .map(|c| c.id)
            .ok_or_else(|| ProgramError::UnknownClass(name.to_string()))
    }

    pub fn method_id(&self, class: ClassId, name: &str) -> Result<MethodId> {
        self.methods
            .values()
            .find(|m| m.owner == class && m.name == name)
            .map(|m| m.id)
            .ok_or_else(|| ProgramError::UnknownMethod(name.to_string()))
    }

    pub fn field_ref(&self, class: ClassId, name: &str) -> Result<FieldRef> {
        let c = self
            .classes
            .get(&class)
            .ok_or_else(|| ProgramError::UnknownClass(class.to_string()))?;
        c.field_index(name)
            .map(|index| FieldRef { class, index })
            .ok_or_else(|| ProgramError::UnknownField(format!("{}.{}", c.name, name)))
    }

    pub fn static_ref(&self, class: ClassId, name: &str) -> Result<FieldRef> {
        let c = self
            .classes
            .get(&class)
            .ok_or_else(|| ProgramError::UnknownClass(class.to_string()))?;
        c.static_index(name)
            .map(|index| FieldRef { class, index })
            .ok_or_else(|| ProgramError::UnknownField(format!("{}.{}", c.name, name)))
    }

    pub fn build(self) -> Result<Program> {
        for method in self.methods.values() {
            if !self.defined.contains(&method.id) {
                return Err(ProgramError::MissingBody(method.name.clone()));
            }
            if let MethodBody::Bytecode(code) = &method.body {
                let len = code.code.len() as u32;
                for inst in &code.code {
                    for target in inst.branch_targets() {
                        if target.0 >= len {
                            return Err(ProgramError::InvalidTarget {
                                method: method.name.clone(),
                                target: target.0,
                            });
                        }
                    }
                }
            }
        }
        Ok(Program {
            classes: self.classes,
            methods: self.methods,
        })
    }
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}
