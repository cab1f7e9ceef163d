use crate::control;
use crate::exec::{self, Flow};
use crate::fault::{BuiltinClasses, FaultKind, Thrown};
use crate::frame::{Frame, Slot};
use crate::heap::{Heap, StaticTable};
use crate::native::NativeRegistry;
use crate::{Result, VmError};
use provenir_core::{
    compose, Dep, DependencySource, DynamicDependency, ObjectId, ObjectProperty, Pc, Program,
    ThreadId, Value,
};
use std::sync::Arc;
use tracing::{debug, trace};

#[derive(Debug, Clone)]
pub struct MachineConfig {
    /// Hard bound on executed instructions per `run()`.
    pub max_steps: u64,
    /// Identity of the logical execution stream; folded into every dependency source.
    pub thread: ThreadId,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            max_steps: 1_000_000,
            thread: ThreadId(0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    Continue,
    /// A `Halt` executed; frames are left in place so state can be queried.
    Halted,
    /// The entry frame returned.
    Finished,
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Halted,
    Finished(Option<Slot>),
}

/// Immutable snapshot of all dependency-bearing machine state. Dependencies are shared by
/// reference, so capturing one is a shallow structural clone. The host's backtracking engine
/// takes one at every choice point and may restore it any number of times.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    frames: Vec<Frame>,
    heap: Heap,
    statics: StaticTable,
    trace: Vec<DependencySource>,
    last_return: Option<Slot>,
    steps: u64,
}

pub struct Machine {
    pub(crate) program: Arc<Program>,
    pub(crate) config: MachineConfig,
    pub(crate) frames: Vec<Frame>,
    pub(crate) heap: Heap,
    pub(crate) statics: StaticTable,
    pub(crate) natives: NativeRegistry,
    pub(crate) builtins: BuiltinClasses,
    pub(crate) trace: Vec<DependencySource>,
    pub(crate) last_return: Option<Slot>,
    steps: u64,
}

impl Machine {
    pub fn new(program: Arc<Program>) -> Result<Self> {
        Self::with_config(program, MachineConfig::default())
    }

    pub fn with_config(program: Arc<Program>, config: MachineConfig) -> Result<Self> {
        let builtins = BuiltinClasses::resolve(&program)?;
        Ok(Self {
            program,
            config,
            frames: Vec::new(),
            heap: Heap::new(),
            statics: StaticTable::default(),
            natives: NativeRegistry::standard(),
            builtins,
            trace: Vec::new(),
            last_return: None,
            steps: 0,
        })
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Identities of every instruction executed so far, in order.
    pub fn trace(&self) -> &[DependencySource] {
        &self.trace
    }

    pub fn last_return(&self) -> Option<&Slot> {
        self.last_return.as_ref()
    }

    /// Pushes the entry frame for `Class.method` with the given arguments. The entry runs under
    /// no control condition: nothing had to be decided for it to execute.
    pub fn call_entry(&mut self, qualified: &str, args: Vec<Slot>) -> Result<()> {
        let method = self
            .program
            .method_by_name(qualified)
            .ok_or_else(|| VmError::UnknownMethod(qualified.to_string()))?;
        let code = method
            .code()
            .ok_or_else(|| VmError::UnknownMethod(format!("{} is native", qualified)))?;
        let max_locals = code.max_locals.max(args.len() as u16);
        let mut frame = Frame::new(method.id, max_locals, 0, None);
        for (i, arg) in args.into_iter().enumerate() {
            frame.locals[i] = arg;
        }
        self.frames.push(frame);
        Ok(())
    }

    /// Runs `Class.method` with no arguments to completion.
    pub fn run_entry(&mut self, qualified: &str) -> Result<Outcome> {
        self.call_entry(qualified, Vec::new())?;
        self.run()
    }

    pub fn run(&mut self) -> Result<Outcome> {
        loop {
            match self.step()? {
                StepResult::Continue => {}
                StepResult::Halted => return Ok(Outcome::Halted),
                StepResult::Finished => return Ok(Outcome::Finished(self.last_return.clone())),
            }
        }
    }

    pub fn step(&mut self) -> Result<StepResult> {
        let frame = self.frames.last_mut().ok_or(VmError::NoActiveFrame)?;
        let method = self
            .program
            .method(frame.method)
            .ok_or_else(|| VmError::UnknownMethod(frame.method.to_string()))?;
        let code = method
            .code()
            .ok_or_else(|| VmError::UnknownMethod(format!("{} is native", method.name)))?;
        let inst = code
            .code
            .get(frame.pc.0 as usize)
            .cloned()
            .ok_or_else(|| VmError::PcOutOfRange(self.program.qualified_method_name(frame.method)))?;

        let at = DependencySource::new(frame.method, frame.pc, frame.depth, self.config.thread);
        trace!(at = %at, inst = %inst, "step");
        frame.pc = frame.pc.next();
        self.trace.push(at);

        self.steps += 1;
        if self.steps > self.config.max_steps {
            return Err(VmError::StepLimit(self.config.max_steps));
        }

        match exec::dispatch(self, inst, at)? {
            Flow::Halt => Ok(StepResult::Halted),
            Flow::Continue => {
                if self.frames.is_empty() {
                    Ok(StepResult::Finished)
                } else {
                    Ok(StepResult::Continue)
                }
            }
        }
    }

    pub fn checkpoint(&self) -> Checkpoint {
        debug!(frames = self.frames.len(), heap = self.heap.len(), "checkpoint");
        Checkpoint {
            frames: self.frames.clone(),
            heap: self.heap.clone(),
            statics: self.statics.clone(),
            trace: self.trace.clone(),
            last_return: self.last_return.clone(),
            steps: self.steps,
        }
    }

    /// Reinstates a snapshot. The checkpoint can be restored again later; the host revisits
    /// choice points as often as its search strategy demands.
    pub fn restore(&mut self, checkpoint: &Checkpoint) {
        debug!(frames = checkpoint.frames.len(), "restore");
        self.frames = checkpoint.frames.clone();
        self.heap = checkpoint.heap.clone();
        self.statics = checkpoint.statics.clone();
        self.trace = checkpoint.trace.clone();
        self.last_return = checkpoint.last_return.clone();
        self.steps = checkpoint.steps;
    }

    /// Host-side write access to a frame's local slot. The surrounding search engine rewrites
    /// operand state (value and attached dependency together) when it explores a different
    /// nondeterministic choice after a restore.
    pub fn set_local(&mut self, frame: usize, slot: u16, value: Slot) -> Result<()> {
        let frame = self
            .frames
            .get_mut(frame)
            .ok_or(VmError::NoActiveFrame)?;
        if !frame.set_local(slot, value) {
            return Err(VmError::InvalidLocal(format!("slot {}", slot)));
        }
        Ok(())
    }

    pub(crate) fn frame(&self) -> Result<&Frame> {
        self.frames.last().ok_or(VmError::NoActiveFrame)
    }

    pub(crate) fn frame_mut(&mut self) -> Result<&mut Frame> {
        self.frames.last_mut().ok_or(VmError::NoActiveFrame)
    }

    /// The active control condition of the current frame.
    pub(crate) fn control(&self) -> Option<Dep> {
        self.frames.last().and_then(|f| f.control.clone())
    }

    pub(crate) fn pop(&mut self, at: DependencySource) -> Result<Slot> {
        let frame = self.frame_mut()?;
        frame
            .pop()
            .ok_or_else(|| VmError::StackUnderflow(at.to_string()))
    }

    pub(crate) fn push(&mut self, value: Value, dep: Option<Dep>) -> Result<()> {
        self.frame_mut()?.push(value, dep);
        Ok(())
    }

    pub(crate) fn record(&self, id: ObjectId) -> Result<&crate::heap::HeapRecord> {
        self.heap.get(id).ok_or(VmError::DanglingRef(id))
    }

    /// Raises an interpreter fault: allocates the builtin exception object, stamps it with the
    /// composed dependency, and unwinds to the nearest matching handler.
    pub(crate) fn raise(
        &mut self,
        kind: FaultKind,
        dep: Option<Dep>,
        at: DependencySource,
    ) -> Result<()> {
        let class = self.builtins.class_for(kind);
        let props = ObjectProperty {
            allocation: dep.clone(),
            type_dep: dep.clone(),
        };
        let exception = self.heap.alloc_object(class, &[], props);
        debug!(kind = ?kind, at = %at, "fault raised");
        self.throw_object(exception, dep, at)
    }

    /// Unwinds the frame stack towards the nearest handler covering the faulting instruction and
    /// matching the exception's class. The handler frame's control condition is extended with
    /// the exception's dependency: the handler executes because the fault occurred.
    pub(crate) fn throw_object(
        &mut self,
        exception: ObjectId,
        dep: Option<Dep>,
        at: DependencySource,
    ) -> Result<()> {
        let class = self
            .record(exception)?
            .class()
            .unwrap_or(self.builtins.object);

        while let Some(frame) = self.frames.last() {
            let method = self
                .program
                .method(frame.method)
                .ok_or_else(|| VmError::UnknownMethod(frame.method.to_string()))?;
            // pc already advanced past the faulting (or invoking) instruction
            let fault_pc = Pc(frame.pc.0.saturating_sub(1));
            let handler = method.code().and_then(|code| {
                code.handlers
                    .iter()
                    .find(|h| {
                        h.covers(fault_pc)
                            && h.class
                                .map_or(true, |c| self.program.is_subclass(class, c))
                    })
                    .cloned()
            });

            match handler {
                Some(h) => {
                    if let Some(frame) = self.frames.last_mut() {
                        frame.stack.clear();
                        frame.push(Value::Ref(exception), dep.clone());
                        frame.control = control::extend(frame.control.as_ref(), &[dep.as_ref()]);
                        frame.pc = h.target;
                    }
                    return Ok(());
                }
                None => {
                    self.frames.pop();
                }
            }
        }

        Err(VmError::Uncaught(Thrown {
            exception,
            class,
            class_name: self.program.class_name(class).to_string(),
            at,
            dep,
        }))
    }

    /// Allocates a guest string backed by an int array of character code points. Used by string
    /// constants and natives; both slots of provenance (object and backing array) carry `dep`.
    pub(crate) fn alloc_string(&mut self, text: &str, dep: Option<Dep>) -> Result<ObjectId> {
        let chars: Vec<Slot> = text
            .chars()
            .map(|ch| Slot::new(Value::Int(ch as i64), dep.clone()))
            .collect();
        let len = chars.len();
        let array = self.heap.alloc_array(
            provenir_core::Type::array_of(provenir_core::Type::Int),
            len,
            provenir_core::ArrayProperty {
                allocation: dep.clone(),
                type_dep: dep.clone(),
                length: dep.clone(),
            },
        );
        if let Some(crate::heap::HeapRecord::Array { elems, .. }) = self.heap.get_mut(array) {
            *elems = chars;
        }

        let string_class = self.builtins.string;
        let field_types = self
            .program
            .class(string_class)
            .map(|c| c.fields.iter().map(|f| f.ty.clone()).collect::<Vec<_>>())
            .unwrap_or_default();
        let obj = self.heap.alloc_object(
            string_class,
            &field_types,
            ObjectProperty {
                allocation: dep.clone(),
                type_dep: dep.clone(),
            },
        );
        if let Some(crate::heap::HeapRecord::Object { fields, .. }) = self.heap.get_mut(obj) {
            if let Some(slot) = fields.get_mut(provenir_core::builtin::STRING_CHARS_FIELD as usize) {
                *slot = Slot::new(Value::Ref(array), dep);
            }
        }
        Ok(obj)
    }

    /// The dependency of "this instruction executed here": its identity under the active control
    /// condition.
    pub(crate) fn site_dep(&self, at: DependencySource) -> Option<Dep> {
        let atom = DynamicDependency::atomic(at);
        compose(&[Some(&atom)], self.control().as_ref())
    }
}
