//! Join planning for acyclic rule bodies.
//!
//! A rule body is a hypergraph whose hyperedges are the variable sets of
//! its atoms. Ear removal (GYO reduction) repeatedly picks an atom whose
//! shared variables all occur in a single other atom, folds it into that
//! atom, and forgets every variable nothing else needs. If the body is
//! acyclic this reduces it to nothing; the sequence of folds is a join
//! order in which every intermediate result carries only the variables
//! some later join or the head still needs.

use std::collections::{BTreeMap, BTreeSet};

use relaxer_syntax::*;

use crate::TransformError;

/// Fold body atom `from` into body atom `to`, or surface it as part of
/// the final body when `to` is `None`, keeping only `tracked`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct JoinStep {
    pub from: usize,
    pub to: Option<usize>,
    pub tracked: Vec<VarId>,
}

/// Plan the joins of a rule body. The result is one trace per connected
/// component, each a sequence of steps in execution order ending in a
/// terminal step. Every body atom is the `from` of exactly one step.
pub fn join_order(rule: &Rule, index: usize) -> Result<Vec<Vec<JoinStep>>, TransformError> {
    let n = rule.body.len();
    if n == 0 {
        return Ok(Vec::new());
    }
    let head = rule.head.variables().into_iter().collect::<BTreeSet<_>>();
    let mut vars = rule
        .body
        .iter()
        .map(|atom| atom.variables().into_iter().collect::<BTreeSet<_>>())
        .collect::<Vec<_>>();

    // Prefer atoms with the fewest head variables, then the fewest variables.
    let mut alive = (0..n).collect::<Vec<_>>();
    alive.sort_by_key(|&i| (vars[i].intersection(&head).count(), vars[i].len(), i));

    let mut steps = Vec::with_capacity(n);
    while alive.len() > 1 {
        let mut counts = BTreeMap::<VarId, usize>::new();
        for &i in &alive {
            for &v in &vars[i] {
                *counts.entry(v).or_default() += 1;
            }
        }
        let ear = alive.iter().enumerate().find_map(|(k, &i)| {
            let shared = vars[i]
                .iter()
                .filter(|v| counts[*v] > 1)
                .collect::<Vec<_>>();
            if shared.is_empty() {
                return Some((k, None));
            }
            alive
                .iter()
                .find(|&&j| j != i && shared.iter().all(|v| vars[j].contains(*v)))
                .map(|&j| (k, Some(j)))
        });
        let Some((k, to)) = ear else {
            return Err(TransformError::AcyclicJoinViolation { rule: index });
        };
        let from = alive.remove(k);

        let tracked = match to {
            None => vars[from].intersection(&head).copied().collect::<BTreeSet<_>>(),
            Some(to) => {
                let needed = alive
                    .iter()
                    .filter(|&&i| i != to)
                    .flat_map(|&i| vars[i].iter().copied())
                    .chain(head.iter().copied())
                    .collect::<BTreeSet<_>>();
                let tracked = vars[from]
                    .union(&vars[to])
                    .filter(|v| needed.contains(v))
                    .copied()
                    .collect::<BTreeSet<_>>();
                vars[to] = tracked.clone();
                tracked
            }
        };
        steps.push(JoinStep {
            from,
            to,
            tracked: tracked.into_iter().collect(),
        });
    }
    let last = alive[0];
    steps.push(JoinStep {
        from: last,
        to: None,
        tracked: vars[last].intersection(&head).copied().collect(),
    });

    // Walking backwards, a terminal step opens a trace and a fold joins
    // the trace of the atom it folds into.
    let mut traces = Vec::<Vec<JoinStep>>::new();
    let mut trace_of = BTreeMap::<usize, usize>::new();
    for step in steps.into_iter().rev() {
        let t = match step.to {
            None => {
                traces.push(Vec::new());
                traces.len() - 1
            }
            Some(to) => match trace_of.get(&to) {
                Some(&t) => t,
                None => return Err(TransformError::AcyclicJoinViolation { rule: index }),
            },
        };
        trace_of.insert(step.from, t);
        traces[t].push(step);
    }
    for trace in &mut traces {
        trace.reverse();
    }
    traces.reverse();
    Ok(traces)
}
