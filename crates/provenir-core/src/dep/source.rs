use crate::instructions::Pc;
use crate::types::MethodId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ThreadId(pub u32);

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Stable identity of one executed instruction: which instruction, at which call depth, on which
/// thread. Re-executing the same path after a backtrack reproduces the same source values, so
/// dependency graphs built before and after a restore agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DependencySource {
    pub method: MethodId,
    pub pc: Pc,
    pub depth: u32,
    pub thread: ThreadId,
}

impl DependencySource {
    pub fn new(method: MethodId, pc: Pc, depth: u32, thread: ThreadId) -> Self {
        Self {
            method,
            pc,
            depth,
            thread,
        }
    }
}

impl std::fmt::Display for DependencySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}/d{}/{}", self.method, self.pc, self.depth, self.thread)
    }
}
