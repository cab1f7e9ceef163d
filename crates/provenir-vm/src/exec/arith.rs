use crate::fault::FaultKind;
use crate::machine::Machine;
use crate::{Result, VmError};
use provenir_core::{compose, BinaryOp, CompareOp, Constant, DependencySource, UnaryOp, Value};

pub(crate) fn constant(m: &mut Machine, value: Constant, at: DependencySource) -> Result<()> {
    // A constant has no operands: its dependency is exactly the active control condition, and
    // null when execution is unconditional.
    let dep = compose(&[], m.control().as_ref());
    let value = match value {
        Constant::Int(v) => Value::Int(v),
        Constant::Float(v) => Value::Float(v),
        Constant::Bool(b) => Value::Bool(b),
        Constant::Null => Value::Null,
        Constant::Str(text) => {
            let site = m.site_dep(at);
            let obj = m.alloc_string(&text, site)?;
            Value::Ref(obj)
        }
    };
    m.push(value, dep)
}

pub(crate) fn unary(m: &mut Machine, op: UnaryOp, at: DependencySource) -> Result<()> {
    let operand = m.pop(at)?;
    let dep = compose(&[operand.dep.as_ref()], m.control().as_ref());
    let value = match (op, operand.value) {
        (UnaryOp::Neg, Value::Int(v)) => Value::Int(v.wrapping_neg()),
        (UnaryOp::Neg, Value::Float(v)) => Value::Float(-v),
        (UnaryOp::Not, Value::Bool(b)) => Value::Bool(!b),
        (UnaryOp::Not, Value::Int(v)) => Value::Int(!v),
        (_, other) => {
            return Err(VmError::TypeMismatch(format!(
                "{:?} cannot apply to {} at {}",
                op,
                other.kind_name(),
                at
            )))
        }
    };
    m.push(value, dep)
}

pub(crate) fn binary(m: &mut Machine, op: BinaryOp, at: DependencySource) -> Result<()> {
    let right = m.pop(at)?;
    let left = m.pop(at)?;
    let dep = compose(&[left.dep.as_ref(), right.dep.as_ref()], m.control().as_ref());

    // Integer division and remainder are the only arithmetic that can fault.
    if matches!(op, BinaryOp::Div | BinaryOp::Rem) {
        if let (Value::Int(_), Value::Int(0)) = (&left.value, &right.value) {
            return m.raise(FaultKind::DivisionByZero, dep, at);
        }
    }

    let value = eval_binary(op, &left.value, &right.value).ok_or_else(|| {
        VmError::TypeMismatch(format!(
            "{:?} cannot apply to {} and {} at {}",
            op,
            left.value.kind_name(),
            right.value.kind_name(),
            at
        ))
    })?;
    m.push(value, dep)
}

fn eval_binary(op: BinaryOp, left: &Value, right: &Value) -> Option<Value> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => {
            let (a, b) = (*a, *b);
            Some(match op {
                BinaryOp::Add => Value::Int(a.wrapping_add(b)),
                BinaryOp::Sub => Value::Int(a.wrapping_sub(b)),
                BinaryOp::Mul => Value::Int(a.wrapping_mul(b)),
                BinaryOp::Div => Value::Int(a.wrapping_div(b)),
                BinaryOp::Rem => Value::Int(a.wrapping_rem(b)),
                BinaryOp::And => Value::Int(a & b),
                BinaryOp::Or => Value::Int(a | b),
                BinaryOp::Xor => Value::Int(a ^ b),
                BinaryOp::Shl => Value::Int(a.wrapping_shl(b as u32)),
                BinaryOp::Shr => Value::Int(a.wrapping_shr(b as u32)),
            })
        }
        (Value::Bool(a), Value::Bool(b)) => match op {
            BinaryOp::And => Some(Value::Bool(*a && *b)),
            BinaryOp::Or => Some(Value::Bool(*a || *b)),
            BinaryOp::Xor => Some(Value::Bool(a != b)),
            _ => None,
        },
        _ => {
            let a = left.as_float()?;
            let b = right.as_float()?;
            match op {
                BinaryOp::Add => Some(Value::Float(a + b)),
                BinaryOp::Sub => Some(Value::Float(a - b)),
                BinaryOp::Mul => Some(Value::Float(a * b)),
                BinaryOp::Div => Some(Value::Float(a / b)),
                BinaryOp::Rem => Some(Value::Float(a % b)),
                _ => None,
            }
        }
    }
}

pub(crate) fn compare(m: &mut Machine, op: CompareOp, at: DependencySource) -> Result<()> {
    let right = m.pop(at)?;
    let left = m.pop(at)?;
    let dep = compose(&[left.dep.as_ref(), right.dep.as_ref()], m.control().as_ref());
    let holds = compare_values(op, &left.value, &right.value).ok_or_else(|| {
        VmError::TypeMismatch(format!(
            "cannot compare {} and {} at {}",
            left.value.kind_name(),
            right.value.kind_name(),
            at
        ))
    })?;
    m.push(Value::Bool(holds), dep)
}

pub(crate) fn compare_values(op: CompareOp, left: &Value, right: &Value) -> Option<bool> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(op.holds_int(*a, *b)),
        (Value::Bool(a), Value::Bool(b)) => Some(op.holds_int(i64::from(*a), i64::from(*b))),
        // Reference comparison is identity; only equality is meaningful.
        (Value::Ref(a), Value::Ref(b)) => match op {
            CompareOp::Eq => Some(a == b),
            CompareOp::Ne => Some(a != b),
            _ => None,
        },
        (Value::Null, Value::Null) => match op {
            CompareOp::Eq => Some(true),
            CompareOp::Ne => Some(false),
            _ => None,
        },
        (Value::Ref(_), Value::Null) | (Value::Null, Value::Ref(_)) => match op {
            CompareOp::Eq => Some(false),
            CompareOp::Ne => Some(true),
            _ => None,
        },
        _ => {
            let a = left.as_float()?;
            let b = right.as_float()?;
            Some(op.holds_float(a, b))
        }
    }
}
