use crate::types::{ClassId, FieldRef, MethodId, Type};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pc(pub u32);

impl Pc {
    pub fn next(self) -> Pc {
        Pc(self.0 + 1)
    }
}

impl fmt::Display for Pc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Null,
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int(v) => write!(f, "{}", v),
            Constant::Float(v) => write!(f, "{}", v),
            Constant::Bool(b) => write!(f, "{}", b),
            Constant::Str(s) => write!(f, "{:?}", s),
            Constant::Null => write!(f, "null"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn holds_int(self, left: i64, right: i64) -> bool {
        match self {
            CompareOp::Eq => left == right,
            CompareOp::Ne => left != right,
            CompareOp::Lt => left < right,
            CompareOp::Le => left <= right,
            CompareOp::Gt => left > right,
            CompareOp::Ge => left >= right,
        }
    }

    pub fn holds_float(self, left: f64, right: f64) -> bool {
        match self {
            CompareOp::Eq => left == right,
            CompareOp::Ne => left != right,
            CompareOp::Lt => left < right,
            CompareOp::Le => left <= right,
            CompareOp::Gt => left > right,
            CompareOp::Ge => left >= right,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    Const {
        value: Constant,
    },
    Unary {
        op: UnaryOp,
    },
    Binary {
        op: BinaryOp,
    },
    Compare {
        op: CompareOp,
    },

    Dup,
    Pop,
    Swap,

    Load {
        slot: u16,
    },
    Store {
        slot: u16,
    },

    GetField {
        field: FieldRef,
    },
    PutField {
        field: FieldRef,
    },
    GetStatic {
        field: FieldRef,
    },
    PutStatic {
        field: FieldRef,
    },

    New {
        class: ClassId,
    },
    NewArray {
        elem: Type,
    },
    MultiNewArray {
        elem: Type,
        dims: u8,
    },
    ArrayLoad,
    ArrayStore,
    ArrayLength,

    CheckCast {
        to: Type,
    },
    InstanceOf {
        of: Type,
    },

    IfZero {
        cond: CompareOp,
        target: Pc,
    },
    IfCompare {
        cond: CompareOp,
        target: Pc,
    },
    Goto {
        target: Pc,
    },
    Switch {
        cases: Vec<(i64, Pc)>,
        default: Pc,
    },

    Invoke {
        method: MethodId,
    },
    Return {
        with_value: bool,
    },
    Throw,

    Halt,
}

impl Instruction {
    pub fn is_branch(&self) -> bool {
        matches!(
            self,
            Instruction::IfZero { .. }
                | Instruction::IfCompare { .. }
                | Instruction::Goto { .. }
                | Instruction::Switch { .. }
        )
    }

    pub fn can_fault(&self) -> bool {
        matches!(
            self,
            Instruction::Binary {
                op: BinaryOp::Div | BinaryOp::Rem
            } | Instruction::GetField { .. }
                | Instruction::PutField { .. }
                | Instruction::NewArray { .. }
                | Instruction::MultiNewArray { .. }
                | Instruction::ArrayLoad
                | Instruction::ArrayStore
                | Instruction::ArrayLength
                | Instruction::CheckCast { .. }
                | Instruction::Invoke { .. }
                | Instruction::Throw
        )
    }

    pub fn branch_targets(&self) -> Vec<Pc> {
        match self {
            Instruction::IfZero { target, .. }
            | Instruction::IfCompare { target, .. }
            | Instruction::Goto { target } => vec![*target],
            Instruction::Switch { cases, default } => {
                let mut targets = vec![*default];
                targets.extend(cases.iter().map(|(_, pc)| *pc));
                targets
            }
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Const { value } => write!(f, "const {}", value),
            Instruction::Unary { op } => match op {
                UnaryOp::Neg => write!(f, "neg"),
                UnaryOp::Not => write!(f, "not"),
            },
            Instruction::Binary { op } => {
                let name = match op {
                    BinaryOp::Add => "add",
                    BinaryOp::Sub => "sub",
                    BinaryOp::Mul => "mul",
                    BinaryOp::Div => "div",
                    BinaryOp::Rem => "rem",
                    BinaryOp::And => "and",
                    BinaryOp::Or => "or",
                    BinaryOp::Xor => "xor",
                    BinaryOp::Shl => "shl",
                    BinaryOp::Shr => "shr",
                };
                write!(f, "{}", name)
            }
            Instruction::Compare { op } => write!(f, "cmp {}", cmp_name(*op)),
            Instruction::Dup => write!(f, "dup"),
            Instruction::Pop => write!(f, "pop"),
            Instruction::Swap => write!(f, "swap"),
            Instruction::Load { slot } => write!(f, "load {}", slot),
            Instruction::Store { slot } => write!(f, "store {}", slot),
            Instruction::GetField { field } => write!(f, "getfield {}", field),
            Instruction::PutField { field } => write!(f, "putfield {}", field),
            Instruction::GetStatic { field } => write!(f, "getstatic {}", field),
            Instruction::PutStatic { field } => write!(f, "putstatic {}", field),
            Instruction::New { class } => write!(f, "new {}", class),
            Instruction::NewArray { elem } => write!(f, "newarray {}", elem),
            Instruction::MultiNewArray { elem, dims } => {
                write!(f, "multianewarray {} dims {}", elem, dims)
            }
            Instruction::ArrayLoad => write!(f, "aload"),
            Instruction::ArrayStore => write!(f, "astore"),
            Instruction::ArrayLength => write!(f, "alength"),
            Instruction::CheckCast { to } => write!(f, "checkcast {}", to),
            Instruction::InstanceOf { of } => write!(f, "instanceof {}", of),
            Instruction::IfZero { cond, target } => write!(f, "ifz {} {}", cmp_name(*cond), target),
            Instruction::IfCompare { cond, target } => {
                write!(f, "ifcmp {} {}", cmp_name(*cond), target)
            }
            Instruction::Goto { target } => write!(f, "goto {}", target),
            Instruction::Switch { cases, default } => {
                write!(f, "switch")?;
                for (val, pc) in cases {
                    write!(f, " {}:{}", val, pc)?;
                }
                write!(f, " default:{}", default)
            }
            Instruction::Invoke { method } => write!(f, "invoke {}", method),
            Instruction::Return { with_value: true } => write!(f, "retv"),
            Instruction::Return { with_value: false } => write!(f, "ret"),
            Instruction::Throw => write!(f, "throw"),
            Instruction::Halt => write!(f, "halt"),
        }
    }
}

fn cmp_name(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => "eq",
        CompareOp::Ne => "ne",
        CompareOp::Lt => "lt",
        CompareOp::Le => "le",
        CompareOp::Gt => "gt",
        CompareOp::Ge => "ge",
    }
}
