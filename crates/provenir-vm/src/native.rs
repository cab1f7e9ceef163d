/*! The native-method boundary.
 *
 * Calls into methods not modeled in bytecode cannot be tracked instruction by instruction, so the
 * boundary marshals dependencies across them wholesale: argument dependencies are extracted (with
 * one level of unwrapping for strings, boxes, and arrays), the native's behavior is executed, and
 * the composed dependency is written onto the return value, fanned out to every element for
 * object and array returns, an over-approximation chosen over risking silent omission.
 *
 * A call whose owner, argument, and return types do not match one of the supported shapes still
 * executes, but its outputs carry no dependency. That gap is intentional: correctness of the
 * interpreter never depends on provenance completeness.
 */

use crate::fault::FaultKind;
use crate::frame::Slot;
use crate::heap::HeapRecord;
use crate::machine::Machine;
use crate::{Result, VmError};
use indexmap::IndexMap;
use provenir_core::{
    builtin, compose, Dep, DependencySource, Method, MethodId, ObjectId, ObjectProperty, Program,
    Type, Value,
};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeOp {
    MathAbs,
    MathMin,
    MathMax,
    MathSqrt,
    StringLength,
    StringCharAt,
    ArrayCopy,
    IntegerValueOf,
    IntegerValue,
}

/// Maps `Class.method` names of native stubs to their modeled behavior.
#[derive(Debug, Clone)]
pub struct NativeRegistry {
    ops: IndexMap<String, NativeOp>,
}

impl NativeRegistry {
    pub fn standard() -> Self {
        let mut ops = IndexMap::new();
        ops.insert("Math.abs".to_string(), NativeOp::MathAbs);
        ops.insert("Math.min".to_string(), NativeOp::MathMin);
        ops.insert("Math.max".to_string(), NativeOp::MathMax);
        ops.insert("Math.sqrt".to_string(), NativeOp::MathSqrt);
        ops.insert("String.length".to_string(), NativeOp::StringLength);
        ops.insert("String.charAt".to_string(), NativeOp::StringCharAt);
        ops.insert("System.arraycopy".to_string(), NativeOp::ArrayCopy);
        ops.insert("Integer.valueOf".to_string(), NativeOp::IntegerValueOf);
        ops.insert("Integer.intValue".to_string(), NativeOp::IntegerValue);
        Self { ops }
    }

    pub fn lookup(&self, qualified: &str) -> Option<NativeOp> {
        self.ops.get(qualified).copied()
    }

    pub fn register(&mut self, qualified: impl Into<String>, op: NativeOp) {
        self.ops.insert(qualified.into(), op);
    }
}

/// Whether the callee's static shape (owner, argument types, return type) matches a supported
/// native. Decided per call site; a mismatch means the call runs untracked.
pub fn can_handle(program: &Program, natives: &NativeRegistry, method: &Method) -> bool {
    let qualified = program.qualified_method_name(method.id);
    natives
        .lookup(&qualified)
        .map_or(false, |op| shape_matches(program, method, op))
}

fn shape_matches(program: &Program, method: &Method, op: NativeOp) -> bool {
    let string_ty = program
        .class_by_name(builtin::STRING)
        .map(|c| Type::Object(c.id));
    let integer_ty = program
        .class_by_name(builtin::INTEGER)
        .map(|c| Type::Object(c.id));
    let params = &method.sig.params;
    let ret = &method.sig.ret;

    match op {
        NativeOp::MathAbs => params == &[Type::Int] && ret == &Some(Type::Int),
        NativeOp::MathMin | NativeOp::MathMax => {
            params == &[Type::Int, Type::Int] && ret == &Some(Type::Int)
        }
        NativeOp::MathSqrt => params == &[Type::Float] && ret == &Some(Type::Float),
        NativeOp::StringLength => {
            string_ty.as_ref().map_or(false, |s| params == std::slice::from_ref(s))
                && ret == &Some(Type::Int)
        }
        NativeOp::StringCharAt => {
            string_ty.map_or(false, |s| params == &[s, Type::Int]) && ret == &Some(Type::Int)
        }
        NativeOp::ArrayCopy => {
            params.len() == 5
                && matches!(params[0], Type::Array(_))
                && params[1] == Type::Int
                && matches!(params[2], Type::Array(_))
                && params[3] == Type::Int
                && params[4] == Type::Int
                && ret.is_none()
        }
        NativeOp::IntegerValueOf => {
            params == &[Type::Int] && integer_ty.map_or(false, |i| ret == &Some(i))
        }
        NativeOp::IntegerValue => {
            integer_ty.map_or(false, |i| params == std::slice::from_ref(&i))
                && ret == &Some(Type::Int)
        }
    }
}

/// One composed dependency per argument slot. Reference arguments of known shapes are unwrapped
/// one level (a string contributes its backing character array's element and length provenance,
/// a box its value field, an array its elements) so that length- and content-style queries on
/// the other side of the boundary remain explainable.
fn extract_arg_deps(m: &Machine, args: &[Slot]) -> Vec<Option<Dep>> {
    args.iter()
        .map(|arg| {
            let mut parts: Vec<Option<&Dep>> = vec![arg.dep.as_ref()];
            let mut unwrapped: Vec<Option<Dep>> = Vec::new();
            if let Some(id) = arg.value.as_ref() {
                if let Some(record) = m.heap.get(id) {
                    collect_record_deps(m, record, &mut unwrapped);
                }
            }
            parts.extend(unwrapped.iter().map(|d| d.as_ref()));
            compose(&parts, None)
        })
        .collect()
}

fn collect_record_deps(m: &Machine, record: &HeapRecord, out: &mut Vec<Option<Dep>>) {
    match record {
        HeapRecord::Array { elems, props, .. } => {
            out.push(props.length.clone());
            for slot in elems {
                out.push(slot.dep.clone());
            }
        }
        HeapRecord::Object { class, fields, .. } => {
            if *class == m.builtins.string {
                // One level down: the backing character array.
                if let Some(chars) = fields.get(builtin::STRING_CHARS_FIELD as usize) {
                    out.push(chars.dep.clone());
                    if let Some(array) = chars.value.as_ref().and_then(|id| m.heap.get(id)) {
                        collect_record_deps(m, array, out);
                    }
                }
            } else if *class == m.builtins.integer {
                if let Some(value) = fields.get(builtin::INTEGER_VALUE_FIELD as usize) {
                    out.push(value.dep.clone());
                }
            } else {
                for slot in fields {
                    out.push(slot.dep.clone());
                }
            }
        }
    }
}

/// Writes the composed dependency onto the return slot. Object- and array-typed returns fan it
/// out to every field and element of the returned record.
fn set_return_dep(m: &mut Machine, value: Value, dep: Option<Dep>) -> Result<()> {
    if let Some(id) = value.as_ref() {
        if let Some(record) = m.heap.get_mut(id) {
            match record {
                HeapRecord::Object { fields, .. } => {
                    for slot in fields.iter_mut() {
                        slot.dep = dep.clone();
                    }
                }
                HeapRecord::Array { elems, .. } => {
                    for slot in elems.iter_mut() {
                        slot.dep = dep.clone();
                    }
                }
            }
        }
    }
    m.push(value, dep)
}

pub(crate) fn call(
    m: &mut Machine,
    method_id: MethodId,
    args: Vec<Slot>,
    invocation: Option<Dep>,
    at: DependencySource,
) -> Result<()> {
    let method = m
        .program
        .method(method_id)
        .ok_or_else(|| VmError::UnknownMethod(method_id.to_string()))?;
    let qualified = m.program.qualified_method_name(method_id);
    let ret_ty = method.sig.ret.clone();

    let op = m
        .natives
        .lookup(&qualified)
        .filter(|op| shape_matches(&m.program, method, *op));

    let Some(op) = op else {
        // Unsupported shape: execute with a default result and no attached dependency.
        debug!(method = %qualified, "unmodeled native call, omitting dependency");
        if let Some(ret) = ret_ty {
            m.push(Value::default_for(&ret), None)?;
        }
        return Ok(());
    };

    let arg_deps = extract_arg_deps(m, &args);
    let all_deps: Vec<Option<&Dep>> = arg_deps.iter().map(|d| d.as_ref()).collect();
    let ret_dep = compose(&all_deps, invocation.as_ref());

    match op {
        NativeOp::MathAbs => {
            let v = int_arg(&args, 0, &qualified)?;
            set_return_dep(m, Value::Int(v.wrapping_abs()), ret_dep)
        }
        NativeOp::MathMin => {
            let a = int_arg(&args, 0, &qualified)?;
            let b = int_arg(&args, 1, &qualified)?;
            set_return_dep(m, Value::Int(a.min(b)), ret_dep)
        }
        NativeOp::MathMax => {
            let a = int_arg(&args, 0, &qualified)?;
            let b = int_arg(&args, 1, &qualified)?;
            set_return_dep(m, Value::Int(a.max(b)), ret_dep)
        }
        NativeOp::MathSqrt => {
            let v = float_arg(&args, 0, &qualified)?;
            set_return_dep(m, Value::Float(v.sqrt()), ret_dep)
        }
        NativeOp::StringLength => {
            let Some(chars) = string_chars(m, &args, 0)? else {
                return m.raise(FaultKind::NullReference, ret_dep, at);
            };
            let len = array_len(m, chars)?;
            set_return_dep(m, Value::Int(len as i64), ret_dep)
        }
        NativeOp::StringCharAt => {
            let Some(chars) = string_chars(m, &args, 0)? else {
                return m.raise(FaultKind::NullReference, ret_dep, at);
            };
            let idx = int_arg(&args, 1, &qualified)?;
            let len = array_len(m, chars)?;
            if idx < 0 || idx as usize >= len {
                return m.raise(FaultKind::IndexOutOfBounds, ret_dep, at);
            }
            let ch = match m.record(chars)? {
                HeapRecord::Array { elems, .. } => elems[idx as usize].value,
                HeapRecord::Object { .. } => return Err(VmError::DanglingRef(chars)),
            };
            set_return_dep(m, ch, ret_dep)
        }
        NativeOp::ArrayCopy => {
            array_copy(m, &args, &arg_deps, invocation.as_ref(), ret_dep, at)
        }
        NativeOp::IntegerValueOf => {
            let v = int_arg(&args, 0, &qualified)?;
            let class = m.builtins.integer;
            let props = ObjectProperty {
                allocation: ret_dep.clone(),
                type_dep: ret_dep.clone(),
            };
            let id = m.heap.alloc_object(class, &[Type::Int], props);
            if let Some(HeapRecord::Object { fields, .. }) = m.heap.get_mut(id) {
                fields[builtin::INTEGER_VALUE_FIELD as usize] =
                    Slot::new(Value::Int(v), ret_dep.clone());
            }
            // Fan-out over the box is a no-op beyond the value field it just set.
            m.push(Value::Ref(id), ret_dep)
        }
        NativeOp::IntegerValue => {
            let Some(id) = args[0].value.as_ref() else {
                return m.raise(FaultKind::NullReference, ret_dep, at);
            };
            let v = match m.record(id)? {
                HeapRecord::Object { fields, .. } => fields
                    .get(builtin::INTEGER_VALUE_FIELD as usize)
                    .map(|s| s.value)
                    .unwrap_or(Value::Int(0)),
                HeapRecord::Array { .. } => return Err(VmError::DanglingRef(id)),
            };
            set_return_dep(m, v, ret_dep)
        }
    }
}

fn int_arg(args: &[Slot], index: usize, qualified: &str) -> Result<i64> {
    args.get(index)
        .and_then(|s| s.value.as_int())
        .ok_or_else(|| VmError::TypeMismatch(format!("{} argument {}", qualified, index)))
}

fn float_arg(args: &[Slot], index: usize, qualified: &str) -> Result<f64> {
    args.get(index)
        .and_then(|s| s.value.as_float())
        .ok_or_else(|| VmError::TypeMismatch(format!("{} argument {}", qualified, index)))
}

/// The backing char array of a string argument, or `None` when the reference is null.
fn string_chars(m: &Machine, args: &[Slot], index: usize) -> Result<Option<ObjectId>> {
    let Some(id) = args.get(index).and_then(|s| s.value.as_ref()) else {
        return Ok(None);
    };
    match m.record(id)? {
        HeapRecord::Object { fields, .. } => Ok(fields
            .get(builtin::STRING_CHARS_FIELD as usize)
            .and_then(|s| s.value.as_ref())),
        HeapRecord::Array { .. } => Err(VmError::DanglingRef(id)),
    }
}

fn array_len(m: &Machine, id: ObjectId) -> Result<usize> {
    match m.record(id)? {
        HeapRecord::Array { elems, .. } => Ok(elems.len()),
        HeapRecord::Object { .. } => Err(VmError::DanglingRef(id)),
    }
}

fn array_copy(
    m: &mut Machine,
    args: &[Slot],
    arg_deps: &[Option<Dep>],
    invocation: Option<&Dep>,
    fault_dep: Option<Dep>,
    at: DependencySource,
) -> Result<()> {
    let (Some(src), Some(dest)) = (args[0].value.as_ref(), args[2].value.as_ref()) else {
        return m.raise(FaultKind::NullReference, fault_dep, at);
    };
    let src_pos = args[1].value.as_int().unwrap_or(-1);
    let dest_pos = args[3].value.as_int().unwrap_or(-1);
    let count = args[4].value.as_int().unwrap_or(-1);

    let src_len = array_len(m, src)?;
    let dest_len = array_len(m, dest)?;
    if src_pos < 0
        || dest_pos < 0
        || count < 0
        || src_pos as usize + count as usize > src_len
        || dest_pos as usize + count as usize > dest_len
    {
        return m.raise(FaultKind::IndexOutOfBounds, fault_dep, at);
    }

    let copied: Vec<Slot> = match m.record(src)? {
        HeapRecord::Array { elems, .. } => elems
            [src_pos as usize..(src_pos + count) as usize]
            .iter()
            .map(|slot| {
                // Each copied element keeps its own provenance, extended with the positions the
                // copy was steered by.
                let dep = compose(
                    &[slot.dep.as_ref(), arg_deps[1].as_ref(), arg_deps[3].as_ref()],
                    invocation,
                );
                Slot::new(slot.value, dep)
            })
            .collect(),
        HeapRecord::Object { .. } => return Err(VmError::DanglingRef(src)),
    };

    match m.heap.get_mut(dest) {
        Some(HeapRecord::Array { elems, .. }) => {
            for (offset, slot) in copied.into_iter().enumerate() {
                elems[dest_pos as usize + offset] = slot;
            }
            Ok(())
        }
        _ => Err(VmError::DanglingRef(dest)),
    }
}
