/*! Control-dependency tracking.
 *
 * Each frame carries the conjunction of branch decisions dominating its current program point as
 * an immutable `Option<Dep>`. Conditional branches extend it, returns discard the callee's copy,
 * and checkpoints capture it by reference, so restoring a checkpoint reinstates exactly that
 * point's condition with no residue from branches explored and abandoned in between.
 */

use provenir_core::{compose, Dep, DependencySource, DynamicDependency};

/// The condition dominating the taken edge of a conditional: the prior condition extended with
/// the dependencies of the operands the decision was made on. Both outgoing edges of a decision
/// are conditioned on it, so callers apply this to the fall-through path as well.
pub fn extend(prior: Option<&Dep>, operand_deps: &[Option<&Dep>]) -> Option<Dep> {
    compose(operand_deps, prior)
}

/// The invocation condition of a call site: the callee executes because this instruction ran
/// under the caller's condition. Used as the callee frame's baseline control dependency.
pub fn invocation(site: DependencySource, prior: Option<&Dep>) -> Option<Dep> {
    let atom = DynamicDependency::atomic(site);
    compose(&[Some(&atom)], prior)
}
