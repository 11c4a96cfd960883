//! Rewrite rules into chains of joins with at most two body atoms.

use std::collections::BTreeSet;

use relaxer_syntax::role::EXTENSION_PREFIX;
use relaxer_syntax::*;
use relaxer_tracer::{trace, Trace};

use crate::{join_order, next_index, variable_terms, TransformError};

const JOIN_PREFIX: &str = "tmp_join_pred_";

/// Replace every rule body by its join plan: each step becomes a rule
/// `tmp(tracked) :- from, to` (or `tmp(tracked) :- from` for a terminal
/// step), whose head stands in for `to` in later steps; the original rule
/// keeps only the atoms produced by terminal steps.
pub fn binarize_rules(task: &mut DatalogTask, trace: Trace) -> Result<(), TransformError> {
    let mut rule_id = next_index(task, JOIN_PREFIX);
    let mut joins = Vec::new();
    for r in 0..task.rules.len() {
        if task.rules[r].body.is_empty() {
            continue;
        }
        let traces = join_order(&task.rules[r], r)?;
        let mut current = task.rules[r].body.clone();
        let mut body = Vec::with_capacity(traces.len());
        for (order, steps) in traces.iter().enumerate() {
            for (join, step) in steps.iter().enumerate() {
                let name = format!("{JOIN_PREFIX}{rule_id}_{order}_{join}");
                let tmp = task.intern_predicate(&name, step.tracked.len())?;
                let tmp = Atom::new(tmp, variable_terms(step.tracked.iter().copied()));
                match step.to {
                    Some(to) => {
                        joins.push(Rule::new(
                            tmp.clone(),
                            [current[step.from].clone(), current[to].clone()],
                        ));
                        current[to] = tmp;
                    }
                    None => {
                        joins.push(Rule::new(tmp.clone(), [current[step.from].clone()]));
                        body.push(tmp);
                    }
                }
            }
        }
        let steps = traces.iter().map(Vec::len).sum::<usize>();
        trace!(trace, Join, "Rule {} binarized into {} joins over {} traces", r, steps, traces.len());
        task.rules[r].body = body;
        rule_id += 1;
    }
    task.rules.extend(joins);
    Ok(())
}

/// Give every rule with more than one body atom a head carrying all of
/// its body variables, deriving the original head from that.
pub fn superset_pars(task: &mut DatalogTask, trace: Trace) -> Result<(), TransformError> {
    let mut next = next_index(task, EXTENSION_PREFIX);
    let mut extensions = Vec::new();
    for r in 0..task.rules.len() {
        if task.rules[r].body.len() <= 1 {
            continue;
        }
        let vars = task.rules[r]
            .body
            .iter()
            .flat_map(Atom::variables)
            .collect::<BTreeSet<_>>();
        let name = format!("{EXTENSION_PREFIX}{next}");
        next += 1;
        let ext = task.intern_predicate(&name, vars.len())?;
        let ext = Atom::new(ext, variable_terms(vars));
        trace!(trace, Rewrite, "Rule {} extended by `{}`", r, task.named(&ext));
        let head = std::mem::replace(&mut task.rules[r].head, ext.clone());
        extensions.push(Rule::new(head, [ext]));
    }
    task.rules.extend(extensions);
    Ok(())
}
