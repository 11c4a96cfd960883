//! Rewrites of the goal rule.

use std::collections::{BTreeMap, BTreeSet};

use relaxer_ground::{FactIndex, Groundable as _, GuaranteedRegistry};
use relaxer_syntax::role::{shadow_name, ACTIVATION_PREFIX, FALSE, GOAL, RULE_HACK_PREFIX};
use relaxer_syntax::*;
use relaxer_tracer::{trace, Trace};

use crate::{next_index, TransformError};

/// For every max-bound fact, the init facts it is derived from through
/// single-body max-bound rules.
fn bound_sources(task: &DatalogTask, facts: &FactIndex) -> BTreeMap<usize, Vec<usize>> {
    let mut sources = BTreeMap::<usize, Vec<usize>>::new();
    for rule in &task.rules {
        if task.role(rule.head.predicate) != Role::MaxMutex || rule.body.len() != 1 {
            continue;
        }
        let body = &rule.body[0];
        for bindings in facts.matching(body) {
            let (Some(head), Some(source)) = (rule.head.ground_with(&bindings), body.ground_with(&bindings)) else {
                continue;
            };
            if let (Some(h), Some(s)) = (
                facts.position(head.predicate, &head.args),
                facts.position(source.predicate, &source.args),
            ) {
                sources.entry(h).or_default().push(s);
            }
        }
    }
    sources
}

/// Demand the final state explicitly in the goal rule: goal atoms are
/// read through their guaranteed shadows, max-bound facts that cover no
/// goal fact are required as they are, and every guaranteed fact not
/// covered yet is required through its delete-guaranteed atom plus a
/// fresh hack atom over its plain add shadow.
pub fn extend_goal_rule(task: &mut DatalogTask, trace: Trace) -> Result<(), TransformError> {
    let goal = task.require_predicate(GOAL)?;
    let g = task
        .rules
        .iter()
        .position(|r| r.head.predicate == goal)
        .ok_or_else(|| TaskError::UnresolvedPredicate {
            name: GOAL.to_owned(),
        })?;
    let facts = FactIndex::new(&task.init);
    let registry = GuaranteedRegistry::new(task);

    let mut goal_facts = BTreeSet::new();
    let mut body = Vec::new();
    for atom in task.rules[g].body.clone() {
        match registry.variant(atom.predicate) {
            Some(variant) => {
                goal_facts.extend(facts.position(variant, &atom.args));
                body.push(Atom::new(variant, atom.args));
            }
            None => {
                trace!(trace, Rewrite, "Goal atom `{}` has no guaranteed variant", task.named(&atom));
                body.push(atom);
            }
        }
    }

    let sources = bound_sources(task, &facts);
    let mut covered = BTreeSet::new();
    for (i, fact) in task.init.iter().enumerate() {
        if task.role(fact.predicate) != Role::MaxMutex {
            continue;
        }
        let from = sources.get(&i).map_or(&[][..], Vec::as_slice);
        covered.extend(from.iter().copied());
        if !from.iter().any(|s| goal_facts.contains(s)) {
            body.push(fact.clone());
        }
    }
    for atom in &body {
        covered.extend(facts.position(atom.predicate, &atom.args));
    }

    let false_atom = Atom::new(task.intern_predicate(FALSE, 0)?, []);
    let mut next_hack = next_index(task, RULE_HACK_PREFIX);
    let mut seeded = BTreeSet::new();
    let mut new_facts = Vec::new();
    let mut hack_rules = Vec::new();
    for i in 0..task.init.len() {
        let fact = task.init[i].clone();
        if covered.contains(&i) {
            continue;
        }
        let (Some((polarity, original)), Some(counterpart)) =
            (registry.original(fact.predicate), registry.counterpart(fact.predicate))
        else {
            continue;
        };
        if facts
            .position(counterpart, &fact.args)
            .map_or(false, |c| covered.contains(&c))
        {
            continue;
        }
        let delete = match polarity {
            Polarity::Add => counterpart,
            Polarity::Delete => fact.predicate,
        };

        let add_name = shadow_name(Polarity::Add, task.name(original));
        let created = task.lookup_predicate(&add_name).is_none();
        let add = task.intern_predicate(&add_name, task.arity(original))?;
        if created && seeded.insert(add) {
            for args in facts.args(delete) {
                new_facts.push(Atom::new(add, args.iter().copied()));
            }
        }

        let hack = task.intern_predicate(&format!("{RULE_HACK_PREFIX}{next_hack}"), 0)?;
        next_hack += 1;
        let hack = Atom::new(hack, []);
        trace!(trace, Rewrite, "Goal demands `{}` through `{}`", task.named(&fact), task.named(&hack));
        body.push(Atom::new(delete, fact.args.iter().copied()));
        body.push(hack.clone());
        hack_rules.push(Rule::new(
            hack.clone(),
            [Atom::new(add, fact.args), false_atom.clone()],
        ));
        new_facts.push(hack);
        covered.insert(i);
    }

    task.rules[g].body = body;
    task.rules.extend(hack_rules);
    task.init.extend(new_facts);
    Ok(())
}

/// Let every predicate except the goal and the types be made true at will:
/// `p(V..) :- activate_pred_p()` with `activate_pred_p() :-`.
pub fn add_repair_actions(task: &mut DatalogTask, trace: Trace) -> Result<(), TransformError> {
    let predicates = task
        .predicates()
        .filter(|(_, p)| !matches!(p.role, Role::Goal | Role::Type | Role::Activation))
        .map(|(id, p)| (id, p.name.clone(), p.arity))
        .collect::<Vec<_>>();
    trace!(trace, Rewrite, "Adding {} repair actions", predicates.len());
    for (id, name, arity) in predicates {
        let activate = task.intern_predicate(&format!("{ACTIVATION_PREFIX}{name}"), 0)?;
        let activate = Atom::new(activate, []);
        let args = task.canonical_args(arity);
        task.rules.push(Rule::new(Atom::new(id, args), [activate.clone()]));
        task.rules.push(Rule::new(activate, []));
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn extend() {
        let mut task = task! {
            "on(a,b)."
            "delpred_on__guaranteed(a,b)."
            "addpred_on__guaranteed(a,b)."
            "delpred_clear__guaranteed(c)."
            "addpred_clear__guaranteed(c)."
            "max_mutex_pred0(a)."
            "max_mutex_pred0(c)."
            "delpred_holding__guaranteed(d)."
            "addpred_holding__guaranteed(d)."
            "max_mutex_pred0(Var_X) :- delpred_on__guaranteed(Var_X,Var_Y)."
            "max_mutex_pred0(Var_X) :- delpred_clear__guaranteed(Var_X)."
            "goal__reachable :- on(a,b)."
        };
        extend_goal_rule(&mut task, Trace::none()).expect("extend");
        assert_eq!(
            rule_text!(task, 2),
            "goal__reachable():-delpred_on__guaranteed(a,b),max_mutex_pred0(c),\
             delpred_holding__guaranteed(d),handle_not_guaranteed_hack0()"
        );
        assert_eq!(
            rule_text!(task, 3),
            "handle_not_guaranteed_hack0():-addpred_holding(d),weird_false_pred()"
        );
        let add_holding = pred!(task, "addpred_holding");
        assert_eq!(task.facts_of(add_holding).count(), 1, "seeded from the delete shadow");
        assert!(task.lookup_predicate("addpred_clear").is_none(), "covered by max_mutex_pred0(c)");
        assert!(task.init.iter().any(|a| task.name(a.predicate) == "handle_not_guaranteed_hack0"));
    }

    #[test]
    fn missing_goal() {
        let mut task = task! {
            "p(a)."
        };
        assert!(matches!(
            extend_goal_rule(&mut task, Trace::none()),
            Err(TransformError::Task(TaskError::UnresolvedPredicate { .. }))
        ));
    }

    #[test]
    fn repair() {
        let mut task = task! {
            "pddl_type_block(a)."
            "on(a,a)."
            "goal__reachable :- on(a,a)."
        };
        add_repair_actions(&mut task, Trace::none()).expect("repair");
        assert_eq!(task.rules.len(), 3);
        let v0 = task.variable(VarId::new(0)).name.clone();
        let v1 = task.variable(VarId::new(1)).name.clone();
        assert_eq!(rule_text!(task, 1), format!("on({v0},{v1}):-activate_pred_on()"));
        assert_eq!(rule_text!(task, 2), "activate_pred_on():-");
        assert_eq!(task.role(pred!(task, "activate_pred_on")), Role::Activation);
    }
}
