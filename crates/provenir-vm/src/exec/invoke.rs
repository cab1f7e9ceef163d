use crate::control;
use crate::frame::Frame;
use crate::machine::Machine;
use crate::native;
use crate::{Result, VmError};
use provenir_core::{compose, DependencySource, MethodId};

pub(crate) fn invoke(m: &mut Machine, method_id: MethodId, at: DependencySource) -> Result<()> {
    let method = m
        .program
        .method(method_id)
        .ok_or_else(|| VmError::UnknownMethod(method_id.to_string()))?;
    let argc = method.sig.params.len();
    let is_native = method.is_native();
    let max_locals = method.code().map(|c| c.max_locals).unwrap_or(0);

    let mut args = Vec::with_capacity(argc);
    for _ in 0..argc {
        args.push(m.pop(at)?);
    }
    args.reverse();

    // The callee executes because this call site ran: its baseline control dependency is the
    // invocation condition, so everything the callee does is explained as conditioned on the
    // call.
    let invocation = control::invocation(at, m.control().as_ref());

    if is_native {
        return native::call(m, method_id, args, invocation, at);
    }

    let depth = m.frame()?.depth + 1;
    let max_locals = max_locals.max(argc as u16);
    let mut frame = Frame::new(method_id, max_locals, depth, invocation);
    for (i, arg) in args.into_iter().enumerate() {
        frame.locals[i] = arg;
    }
    m.frames.push(frame);
    Ok(())
}

pub(crate) fn ret(m: &mut Machine, with_value: bool, at: DependencySource) -> Result<()> {
    let result = if with_value { Some(m.pop(at)?) } else { None };
    let callee = m.frames.pop().ok_or(VmError::NoActiveFrame)?;

    let result = result.map(|slot| {
        // The caller sees the value conditioned on the call having happened, not on the callee's
        // internal branching; those decisions already ride on the value's own dependency.
        let dep = compose(&[slot.dep.as_ref()], callee.entry_control.as_ref());
        crate::frame::Slot::new(slot.value, dep)
    });

    match m.frames.last_mut() {
        Some(caller) => {
            if let Some(slot) = result {
                caller.push_slot(slot);
            }
            Ok(())
        }
        None => {
            // The entry frame returned; the outcome is observable through `last_return`.
            m.last_return = result;
            Ok(())
        }
    }
}
