/*! Per-instruction propagation rules.
 *
 * One module per instruction category. Every rule has the same shape: pop operand slots (value +
 * attached dependency), compose the operand dependencies with the frame's active control
 * condition through `provenir_core::compose`, and attach the result to whatever the instruction
 * produces: a pushed slot, a field, an array element, or the dependency of a raised fault.
 *
 * None of these rules ever originates a failure: the interpreter decides what faults, the rules
 * only decide what dependency the fault carries. A missing dependency degrades to "unknown
 * provenance" (`None`), never to an error.
 */

mod alloc;
mod arith;
mod array;
mod branch;
mod cast;
mod field;
mod invoke;
mod locals;
mod stack_ops;
mod throw;

use crate::machine::Machine;
use crate::Result;
use provenir_core::{DependencySource, Instruction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Halt,
}

pub(crate) fn dispatch(m: &mut Machine, inst: Instruction, at: DependencySource) -> Result<Flow> {
    match inst {
        Instruction::Const { value } => arith::constant(m, value, at)?,
        Instruction::Unary { op } => arith::unary(m, op, at)?,
        Instruction::Binary { op } => arith::binary(m, op, at)?,
        Instruction::Compare { op } => arith::compare(m, op, at)?,

        Instruction::Dup => stack_ops::dup(m, at)?,
        Instruction::Pop => stack_ops::pop(m, at)?,
        Instruction::Swap => stack_ops::swap(m, at)?,

        Instruction::Load { slot } => locals::load(m, slot, at)?,
        Instruction::Store { slot } => locals::store(m, slot, at)?,

        Instruction::GetField { field } => field::get_field(m, field, at)?,
        Instruction::PutField { field } => field::put_field(m, field, at)?,
        Instruction::GetStatic { field } => field::get_static(m, field, at)?,
        Instruction::PutStatic { field } => field::put_static(m, field, at)?,

        Instruction::New { class } => alloc::new_object(m, class, at)?,
        Instruction::NewArray { elem } => alloc::new_array(m, elem, at)?,
        Instruction::MultiNewArray { elem, dims } => alloc::multi_new_array(m, elem, dims, at)?,
        Instruction::ArrayLoad => array::load(m, at)?,
        Instruction::ArrayStore => array::store(m, at)?,
        Instruction::ArrayLength => array::length(m, at)?,

        Instruction::CheckCast { to } => cast::check_cast(m, to, at)?,
        Instruction::InstanceOf { of } => cast::instance_of(m, of, at)?,

        Instruction::IfZero { cond, target } => branch::if_zero(m, cond, target, at)?,
        Instruction::IfCompare { cond, target } => branch::if_compare(m, cond, target, at)?,
        Instruction::Goto { target } => branch::goto(m, target)?,
        Instruction::Switch { cases, default } => branch::switch(m, &cases, default, at)?,

        Instruction::Invoke { method } => invoke::invoke(m, method, at)?,
        Instruction::Return { with_value } => invoke::ret(m, with_value, at)?,
        Instruction::Throw => throw::throw_top(m, at)?,

        Instruction::Halt => return Ok(Flow::Halt),
    }
    Ok(Flow::Continue)
}
