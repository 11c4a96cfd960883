//! Rewrite passes over a [`DatalogTask`], and the pipeline that composes
//! them. Each pass mutates the task in place; the pipeline checks that a
//! requested sequence of passes only ever runs a pass on a task that has
//! the capabilities it needs, normalizes the task before the first pass,
//! and validates it after every one.

mod binarize;
mod bounds;
mod equalize;
mod filter;
mod goal;
mod join;
mod normalize;
mod pipeline;
mod reintegrate;
mod relax;

use thiserror::Error;

use relaxer_syntax::*;

// Re-exports.
pub use binarize::{binarize_rules, superset_pars};
pub use bounds::{add_hacky_zero_if_not_unique, add_max_mutex, add_none_rules, print_grounded_mutexes};
pub use equalize::{equalize_add_guaranteed_atoms, equalize_guaranteed_atoms, integrate_add_del_rules};
pub use filter::{different_elements, mutex_filter, Distinctness};
pub use goal::{add_repair_actions, extend_goal_rule};
pub use join::{join_order, JoinStep};
pub use normalize::{fill_variables, generalize_unique_objects};
pub use pipeline::{Capability, Pass, Pipeline};
pub use reintegrate::reintegrate_mutex_rules;
pub use relax::{create_reducer, linearize_action_task, unary_relaxation, zero_ary_relaxation};

/// Things that may go wrong while rewriting a task.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum TransformError {
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error("the body of rule {rule} is not an acyclic hypergraph")]
    AcyclicJoinViolation { rule: usize },
    #[error("pass `{pass}` requires {missing}")]
    MissingCapability { pass: Pass, missing: String },
    #[error("rule graph is cyclic through `{predicate}`")]
    CyclicRuleGraph { predicate: String },
    #[error("unknown pass `{0}`")]
    UnknownPass(String),
}

/// One past the largest `n` for which some predicate is named `prefix`
/// followed by `n` (optionally followed by `_` and more text).
pub(crate) fn next_index(task: &DatalogTask, prefix: &str) -> usize {
    task.predicates()
        .filter_map(|(_, p)| {
            let rest = p.name.strip_prefix(prefix)?;
            rest.split('_').next()?.parse::<usize>().ok()
        })
        .map(|n| n + 1)
        .max()
        .unwrap_or(0)
}

/// Variables as terms.
pub(crate) fn variable_terms(vars: impl IntoIterator<Item = VarId>) -> Vec<Term> {
    vars.into_iter().map(Term::Variable).collect()
}
