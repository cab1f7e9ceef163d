use crate::instructions::{BinaryOp, CompareOp, Constant, Instruction, Pc, UnaryOp};
use crate::program::{Code, ExceptionHandler};
use crate::types::{ClassId, FieldRef, MethodId, Type};
use crate::{ProgramError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(u32);

/// Emits one method body. Branch targets are labels; `finish()` resolves them to instruction
/// indices and validates every label was bound.
pub struct MethodBuilder {
    code: Vec<Instruction>,
    labels: Vec<Option<Pc>>,
    handlers: Vec<(Label, Label, Label, Option<ClassId>)>,
    max_locals: u16,
}

impl MethodBuilder {
    pub fn new(max_locals: u16) -> Self {
        Self {
            code: Vec::new(),
            labels: Vec::new(),
            handlers: Vec::new(),
            max_locals,
        }
    }

    pub fn new_label(&mut self) -> Label {
        let label = Label(self.labels.len() as u32);
        self.labels.push(None);
        label
    }

    pub fn bind(&mut self, label: Label) {
        self.labels[label.0 as usize] = Some(Pc(self.code.len() as u32));
    }

    pub fn here(&self) -> Pc {
        Pc(self.code.len() as u32)
    }

    pub fn emit(&mut self, inst: Instruction) -> &mut Self {
        self.code.push(inst);
        self
    }

    pub fn const_int(&mut self, v: i64) -> &mut Self {
        self.emit(Instruction::Const {
            value: Constant::Int(v),
        })
    }

    pub fn const_float(&mut self, v: f64) -> &mut Self {
        self.emit(Instruction::Const {
            value: Constant::Float(v),
        })
    }

    pub fn const_bool(&mut self, v: bool) -> &mut Self {
        self.emit(Instruction::Const {
            value: Constant::Bool(v),
        })
    }

    pub fn const_str(&mut self, v: impl Into<String>) -> &mut Self {
        self.emit(Instruction::Const {
            value: Constant::Str(v.into()),
        })
    }

    pub fn const_null(&mut self) -> &mut Self {
        self.emit(Instruction::Const {
            value: Constant::Null,
        })
    }

    pub fn unary(&mut self, op: UnaryOp) -> &mut Self {
        self.emit(Instruction::Unary { op })
    }

    pub fn binary(&mut self, op: BinaryOp) -> &mut Self {
        self.emit(Instruction::Binary { op })
    }

    pub fn add(&mut self) -> &mut Self {
        self.binary(BinaryOp::Add)
    }

    pub fn sub(&mut self) -> &mut Self {
        self.binary(BinaryOp::Sub)
    }

    pub fn mul(&mut self) -> &mut Self {
        self.binary(BinaryOp::Mul)
    }

    pub fn div(&mut self) -> &mut Self {
        self.binary(BinaryOp::Div)
    }

    pub fn neg(&mut self) -> &mut Self {
        self.unary(UnaryOp::Neg)
    }

    pub fn compare(&mut self, op: CompareOp) -> &mut Self {
        self.emit(Instruction::Compare { op })
    }

    pub fn dup(&mut self) -> &mut Self {
        self.emit(Instruction::Dup)
    }

    pub fn pop(&mut self) -> &mut Self {
        self.emit(Instruction::Pop)
    }

    pub fn swap(&mut self) -> &mut Self {
        self.emit(Instruction::Swap)
    }

    pub fn load(&mut self, slot: u16) -> &mut Self {
        self.emit(Instruction::Load { slot })
    }

    pub fn store(&mut self, slot: u16) -> &mut Self {
        self.emit(Instruction::Store { slot })
    }

    pub fn get_field(&mut self, field: FieldRef) -> &mut Self {
        self.emit(Instruction::GetField { field })
    }

    pub fn put_field(&mut self, field: FieldRef) -> &mut Self {
        self.emit(Instruction::PutField { field })
    }

    pub fn get_static(&mut self, field: FieldRef) -> &mut Self {
        self.emit(Instruction::GetStatic { field })
    }

    pub fn put_static(&mut self, field: FieldRef) -> &mut Self {
        self.emit(Instruction::PutStatic { field })
    }

    pub fn new_object(&mut self, class: ClassId) -> &mut Self {
        self.emit(Instruction::New { class })
    }

    pub fn new_array(&mut self, elem: Type) -> &mut Self {
        self.emit(Instruction::NewArray { elem })
    }

    pub fn multi_new_array(&mut self, elem: Type, dims: u8) -> &mut Self {
        self.emit(Instruction::MultiNewArray { elem, dims })
    }

    pub fn array_load(&mut self) -> &mut Self {
        self.emit(Instruction::ArrayLoad)
    }

    pub fn array_store(&mut self) -> &mut Self {
        self.emit(Instruction::ArrayStore)
    }

    pub fn array_length(&mut self) -> &mut Self {
        self.emit(Instruction::ArrayLength)
    }

    pub fn check_cast(&mut self, to: Type) -> &mut Self {
        self.emit(Instruction::CheckCast { to })
    }

    pub fn instance_of(&mut self, of: Type) -> &mut Self {
        self.emit(Instruction::InstanceOf { of })
    }

    pub fn if_zero(&mut self, cond: CompareOp, target: Label) -> &mut Self {
        self.emit(Instruction::IfZero {
            cond,
            target: Pc(target.0),
        })
    }

    pub fn if_compare(&mut self, cond: CompareOp, target: Label) -> &mut Self {
        self.emit(Instruction::IfCompare {
            cond,
            target: Pc(target.0),
        })
    }

    pub fn goto(&mut self, target: Label) -> &mut Self {
        self.emit(Instruction::Goto {
            target: Pc(target.0),
        })
    }

    pub fn switch(&mut self, cases: Vec<(i64, Label)>, default: Label) -> &mut Self {
        self.emit(Instruction::Switch {
            cases: cases.into_iter().map(|(v, l)| (v, Pc(l.0))).collect(),
            default: Pc(default.0),
        })
    }

    pub fn invoke(&mut self, method: MethodId) -> &mut Self {
        self.emit(Instruction::Invoke { method })
    }

    pub fn ret(&mut self) -> &mut Self {
        self.emit(Instruction::Return { with_value: false })
    }

    pub fn ret_value(&mut self) -> &mut Self {
        self.emit(Instruction::Return { with_value: true })
    }

    pub fn throw(&mut self) -> &mut Self {
        self.emit(Instruction::Throw)
    }

    pub fn halt(&mut self) -> &mut Self {
        self.emit(Instruction::Halt)
    }

    /// Protects `[start, end)` with a handler at `target`; `class: None` catches every fault.
    pub fn add_handler(
        &mut self,
        start: Label,
        end: Label,
        target: Label,
        class: Option<ClassId>,
    ) -> &mut Self {
        self.handlers.push((start, end, target, class));
        self
    }

    fn resolve(&self, label_pc: Pc) -> Result<Pc> {
        self.labels
            .get(label_pc.0 as usize)
            .copied()
            .flatten()
            .ok_or(ProgramError::UnboundLabel(label_pc.0))
    }

    pub fn finish(mut self) -> Result<Code> {
        let mut code = std::mem::take(&mut self.code);
        for inst in &mut code {
            match inst {
                Instruction::IfZero { target, .. }
                | Instruction::IfCompare { target, .. }
                | Instruction::Goto { target } => *target = self.resolve(*target)?,
                Instruction::Switch { cases, default } => {
                    for (_, pc) in cases.iter_mut() {
                        *pc = self.resolve(*pc)?;
                    }
                    *default = self.resolve(*default)?;
                }
                _ => {}
            }
        }
        let mut handlers = Vec::with_capacity(self.handlers.len());
        for (start, end, target, class) in &self.handlers {
            handlers.push(ExceptionHandler {
                start: self.resolve(Pc(start.0))?,
                end: self.resolve(Pc(end.0))?,
                target: self.resolve(Pc(target.0))?,
                class: *class,
            });
        }
        Ok(Code {
            max_locals: self.max_locals,
            code,
            handlers,
        })
    }
}
