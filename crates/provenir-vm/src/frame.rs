use provenir_core::{Dep, MethodId, Pc, Value};

/// One operand-stack or local-variable slot: the value paired with its current dependency.
/// The pairing is 1:1 by construction: a slot is overwritten as a whole, so value and
/// provenance can never drift apart.
#[derive(Debug, Clone)]
pub struct Slot {
    pub value: Value,
    pub dep: Option<Dep>,
}

impl Slot {
    pub fn new(value: Value, dep: Option<Dep>) -> Self {
        Self { value, dep }
    }

    /// A slot with no provenance attached.
    pub fn bare(value: Value) -> Self {
        Self { value, dep: None }
    }
}

#[derive(Debug, Clone)]
pub struct Frame {
    pub method: MethodId,
    pub pc: Pc,
    pub depth: u32,
    pub locals: Vec<Slot>,
    pub stack: Vec<Slot>,
    /// Conjunction of branch decisions dominating the current point in this frame. Starts as the
    /// invocation condition and grows at every conditional branch.
    pub control: Option<Dep>,
    /// The invocation condition this frame was entered under; immutable for the frame's life.
    pub entry_control: Option<Dep>,
}

impl Frame {
    pub fn new(method: MethodId, max_locals: u16, depth: u32, control: Option<Dep>) -> Self {
        Self {
            method,
            pc: Pc(0),
            depth,
            locals: vec![Slot::bare(Value::Null); max_locals as usize],
            stack: Vec::new(),
            entry_control: control.clone(),
            control,
        }
    }

    pub fn push(&mut self, value: Value, dep: Option<Dep>) {
        self.stack.push(Slot::new(value, dep));
    }

    pub fn push_slot(&mut self, slot: Slot) {
        self.stack.push(slot);
    }

    pub fn pop(&mut self) -> Option<Slot> {
        self.stack.pop()
    }

    pub fn peek(&self) -> Option<&Slot> {
        self.stack.last()
    }

    pub fn local(&self, slot: u16) -> Option<&Slot> {
        self.locals.get(slot as usize)
    }

    pub fn set_local(&mut self, slot: u16, value: Slot) -> bool {
        match self.locals.get_mut(slot as usize) {
            Some(entry) => {
                *entry = value;
                true
            }
            None => false,
        }
    }
}
