use crate::control;
use crate::exec::arith::compare_values;
use crate::frame::Slot;
use crate::machine::Machine;
use crate::{Result, VmError};
use provenir_core::{CompareOp, DependencySource, Pc, Value};

/// Every conditional funnels through here: the decision's operand dependencies extend the
/// frame's control condition on *both* outgoing edges, then the supplied comparison decides
/// which edge is taken. Branch instructions only contribute their comparison semantics.
fn decide(m: &mut Machine, operands: &[Slot], taken: bool, target: Pc) -> Result<()> {
    let frame = m.frame_mut()?;
    let deps: Vec<_> = operands.iter().map(|s| s.dep.as_ref()).collect();
    frame.control = control::extend(frame.control.as_ref(), &deps);
    if taken {
        frame.pc = target;
    }
    Ok(())
}

pub(crate) fn if_zero(
    m: &mut Machine,
    cond: CompareOp,
    target: Pc,
    at: DependencySource,
) -> Result<()> {
    let operand = m.pop(at)?;
    let v = operand.value.as_condition_int().ok_or_else(|| {
        VmError::TypeMismatch(format!(
            "cannot branch on {} at {}",
            operand.value.kind_name(),
            at
        ))
    })?;
    let taken = cond.holds_int(v, 0);
    decide(m, &[operand], taken, target)
}

pub(crate) fn if_compare(
    m: &mut Machine,
    cond: CompareOp,
    target: Pc,
    at: DependencySource,
) -> Result<()> {
    let right = m.pop(at)?;
    let left = m.pop(at)?;
    let taken = compare_values(cond, &left.value, &right.value).ok_or_else(|| {
        VmError::TypeMismatch(format!(
            "cannot compare {} and {} at {}",
            left.value.kind_name(),
            right.value.kind_name(),
            at
        ))
    })?;
    decide(m, &[left, right], taken, target)
}

pub(crate) fn goto(m: &mut Machine, target: Pc) -> Result<()> {
    // Unconditional: no decision is made, the control condition is untouched.
    m.frame_mut()?.pc = target;
    Ok(())
}

pub(crate) fn switch(
    m: &mut Machine,
    cases: &[(i64, Pc)],
    default: Pc,
    at: DependencySource,
) -> Result<()> {
    let selector = m.pop(at)?;
    let v = match selector.value {
        Value::Int(v) => v,
        ref other => {
            return Err(VmError::TypeMismatch(format!(
                "switch selector must be int, got {} at {}",
                other.kind_name(),
                at
            )))
        }
    };
    let target = cases
        .iter()
        .find(|(case, _)| *case == v)
        .map(|(_, pc)| *pc)
        .unwrap_or(default);
    decide(m, &[selector], true, target)
}
