/*! provenir: a dependency-tracking bytecode interpreter for fault localization.
 *
 * The workspace splits into four layers, re-exported here:
 * - [`core`](provenir_core): the dependency model, the composition rule, and the guest program
 *   model with its builder.
 * - [`vm`](provenir_vm): the interpreter with per-instruction propagation rules, the control
 *   tracker, the native boundary, and checkpoint/restore for backtracking hosts.
 * - [`asm`](provenir_asm): the textual assembly front end.
 * - [`emit`](provenir_emit): provenance DAG renderers.
 */

pub use provenir_asm as asm;
pub use provenir_core as core;
pub use provenir_emit as emit;
pub use provenir_vm as vm;

pub use provenir_core::{
    compose, Dep, DependencySource, DynamicDependency, Program, ProgramBuilder,
};
pub use provenir_vm::{Machine, MachineConfig, Outcome, QueryTarget};
