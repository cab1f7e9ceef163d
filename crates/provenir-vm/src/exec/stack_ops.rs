use crate::machine::Machine;
use crate::Result;
use provenir_core::DependencySource;

pub(crate) fn dup(m: &mut Machine, at: DependencySource) -> Result<()> {
    let top = m.pop(at)?;
    let frame = m.frame_mut()?;
    frame.push_slot(top.clone());
    frame.push_slot(top);
    Ok(())
}

pub(crate) fn pop(m: &mut Machine, at: DependencySource) -> Result<()> {
    m.pop(at)?;
    Ok(())
}

pub(crate) fn swap(m: &mut Machine, at: DependencySource) -> Result<()> {
    let a = m.pop(at)?;
    let b = m.pop(at)?;
    let frame = m.frame_mut()?;
    frame.push_slot(a);
    frame.push_slot(b);
    Ok(())
}
