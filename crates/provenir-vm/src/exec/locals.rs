use crate::frame::Slot;
use crate::machine::Machine;
use crate::{Result, VmError};
use provenir_core::{compose, DependencySource};

pub(crate) fn load(m: &mut Machine, slot: u16, at: DependencySource) -> Result<()> {
    let frame = m.frame_mut()?;
    let local = frame
        .local(slot)
        .cloned()
        .ok_or_else(|| VmError::InvalidLocal(format!("slot {} at {}", slot, at)))?;
    // Loading forwards the value's dependency unchanged; the branch conditions of the reading
    // context attach at the next store point, not here.
    frame.push_slot(local);
    Ok(())
}

pub(crate) fn store(m: &mut Machine, slot: u16, at: DependencySource) -> Result<()> {
    let value = m.pop(at)?;
    let dep = compose(&[value.dep.as_ref()], m.control().as_ref());
    let frame = m.frame_mut()?;
    if !frame.set_local(slot, Slot::new(value.value, dep)) {
        return Err(VmError::InvalidLocal(format!("slot {} at {}", slot, at)));
    }
    Ok(())
}
