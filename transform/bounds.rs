//! Mutex bound predicates: per mutex group, `max_mutex_pred<i>` and
//! `min_mutex_pred<i>` over the group's enumerated variables, derived
//! from the delete- and add-guaranteed instances of its elements.

use std::collections::BTreeSet;

use relaxer_ground::{FactIndex, Groundable as _, GuaranteedRegistry};
use relaxer_syntax::role::{guaranteed_name, MAX_MUTEX_PREFIX, MIN_MUTEX_PREFIX, NONE_PREFIX};
use relaxer_syntax::*;
use relaxer_tracer::{trace, Trace};

use crate::TransformError;

const ZERO: &str = "hack_zero_pred";

fn bound_names(group: usize) -> (String, String) {
    (
        format!("{MAX_MUTEX_PREFIX}{group}"),
        format!("{MIN_MUTEX_PREFIX}{group}"),
    )
}

/// Both bound predicates of a group, which must already exist.
fn bounds(task: &DatalogTask, group: usize) -> Result<(PredicateId, PredicateId), TransformError> {
    let (max, min) = bound_names(group);
    Ok((task.require_predicate(&max)?, task.require_predicate(&min)?))
}

fn non_unique_groups(task: &DatalogTask) -> Vec<usize> {
    task.mutex_groups
        .iter()
        .enumerate()
        .filter(|(_, g)| !g.unique)
        .map(|(i, _)| i)
        .collect()
}

/// Per group, `max(enumerated) :- delete-guaranteed(element)` and
/// `min(enumerated) :- add-guaranteed(element)` for every element whose
/// original predicate has both guaranteed shadows. Mutex variable number
/// `k` becomes canonical variable `k`.
pub fn add_max_mutex(task: &mut DatalogTask, trace: Trace) -> Result<(), TransformError> {
    let registry = GuaranteedRegistry::new(task);
    for (i, group) in task.mutex_groups.clone().into_iter().enumerate() {
        let mut numbers = BTreeSet::new();
        let mut widest = 0;
        for par in group.elements.iter().flat_map(|e| &e.pars) {
            if let MutexPar::Variable { number, counted, .. } = *par {
                widest = widest.max(number + 1);
                if !counted {
                    numbers.insert(number);
                }
            }
        }
        task.ensure_variables(widest);
        let var = |number: usize| Term::Variable(VarId::new(number));

        let (max_name, min_name) = bound_names(i);
        let max = task.intern_predicate(&max_name, numbers.len())?;
        let min = task.intern_predicate(&min_name, numbers.len())?;
        let head = numbers.iter().map(|&n| var(n)).collect::<Vec<_>>();
        for element in &group.elements {
            let (Some(delete), Some(add)) = (
                registry.of(element.predicate, Polarity::Delete),
                registry.of(element.predicate, Polarity::Add),
            ) else {
                trace!(trace, Rewrite, "Group {}: `{}` has no guaranteed shadows", i, task.name(element.predicate));
                continue;
            };
            let args = element
                .pars
                .iter()
                .map(|par| match *par {
                    MutexPar::Constant(c) => Term::Constant(c),
                    MutexPar::Variable { number, .. } => var(number),
                })
                .collect::<Vec<_>>();
            task.rules.push(Rule::new(
                Atom::new(max, head.iter().copied()),
                [Atom::new(delete, args.iter().copied())],
            ));
            task.rules.push(Rule::new(
                Atom::new(min, head.iter().copied()),
                [Atom::new(add, args)],
            ));
        }
    }
    Ok(())
}

/// Per non-unique group, guaranteed "none of the group" shadows that
/// feed its bounds, seeded with the max bound's facts.
pub fn add_none_rules(task: &mut DatalogTask, trace: Trace) -> Result<(), TransformError> {
    for i in non_unique_groups(task) {
        let (max, min) = bounds(task, i)?;
        let n = task.arity(max);
        let none = format!("{NONE_PREFIX}{i}");
        let add = task.intern_predicate(&guaranteed_name(Polarity::Add, &none), n)?;
        let delete = task.intern_predicate(&guaranteed_name(Polarity::Delete, &none), n)?;
        let args = task.canonical_args(n);
        task.rules.push(Rule::new(
            Atom::new(max, args.iter().copied()),
            [Atom::new(delete, args.iter().copied())],
        ));
        task.rules.push(Rule::new(
            Atom::new(min, args.iter().copied()),
            [Atom::new(add, args)],
        ));
        let seeds = task.facts_of(max).cloned().collect::<Vec<_>>();
        trace!(trace, Rewrite, "Group {}: none-of shadows seeded with {} facts", i, seeds.len());
        for fact in seeds {
            task.init.push(Atom::new(delete, fact.args.iter().copied()));
            task.init.push(Atom::new(add, fact.args));
        }
    }
    Ok(())
}

/// Per non-unique group, derive both bounds from a single zero-ary fact.
pub fn add_hacky_zero_if_not_unique(task: &mut DatalogTask, trace: Trace) -> Result<(), TransformError> {
    let zero = task.intern_predicate(ZERO, 0)?;
    let zero = Atom::new(zero, []);
    for i in non_unique_groups(task) {
        let (max, min) = bounds(task, i)?;
        let args = task.canonical_args(task.arity(max));
        trace!(trace, Rewrite, "Group {}: bounds from `{}`", i, ZERO);
        task.rules.push(Rule::new(Atom::new(min, args.iter().copied()), [zero.clone()]));
        task.rules.push(Rule::new(Atom::new(max, args), [zero.clone()]));
    }
    if !task.init.contains(&zero) {
        task.init.push(zero);
    }
    Ok(())
}

/// Replace the rules by every ground instance of the single-body
/// max-bound rules over their body predicate's facts, and drop the facts.
pub fn print_grounded_mutexes(task: &mut DatalogTask, trace: Trace) -> Result<(), TransformError> {
    let facts = FactIndex::new(&task.init);
    let mut grounded = Vec::new();
    for rule in &task.rules {
        if task.role(rule.head.predicate) != Role::MaxMutex || rule.body.len() != 1 {
            continue;
        }
        grounded.extend(
            facts
                .matching(&rule.body[0])
                .filter_map(|bindings| rule.ground_with(&bindings)),
        );
    }
    trace!(trace, Rewrite, "{} grounded mutex rules", grounded.len());
    task.rules = grounded;
    task.init.clear();
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn bounded() -> DatalogTask {
        let mut task = task! {
            "pddl_type_block(a)."
            "pddl_type_block(b)."
            "addpred_on__guaranteed(a,b)."
            "delpred_on__guaranteed(a,b)."
            "mutexpred :- on(Var_enumerated_0_block, Var_counted_1_block), holding(Var_enumerated_0_block)."
        };
        add_max_mutex(&mut task, Trace::none()).expect("bounds");
        task
    }

    #[test]
    fn max_mutex() {
        let task = bounded();
        assert_eq!(task.rules.len(), 2, "holding has no guaranteed shadows");
        assert_eq!(task.arity(pred!(task, "max_mutex_pred0")), 1);
        let v0 = task.variable(VarId::new(0)).name.clone();
        let v1 = task.variable(VarId::new(1)).name.clone();
        assert_eq!(
            rule_text!(task, 0),
            format!("max_mutex_pred0({v0}):-delpred_on__guaranteed({v0},{v1})")
        );
        assert_eq!(
            rule_text!(task, 1),
            format!("min_mutex_pred0({v0}):-addpred_on__guaranteed({v0},{v1})")
        );
    }

    #[test]
    fn none_rules() {
        let mut task = bounded();
        task.init.push(Atom::new(pred!(task, "max_mutex_pred0"), task.init[0].args.clone()));
        add_none_rules(&mut task, Trace::none()).expect("none");
        let add = pred!(task, "addpred_none_of_mutexgroup_0__guaranteed");
        let delete = pred!(task, "delpred_none_of_mutexgroup_0__guaranteed");
        assert_eq!(task.facts_of(add).count(), 1);
        assert_eq!(task.facts_of(delete).count(), 1);
        assert_eq!(task.rules.len(), 4);
        assert_eq!(task.role(add), Role::Guaranteed(Polarity::Add));
    }

    #[test]
    fn missing_bounds() {
        let mut task = task! {
            "pddl_type_block(a)."
            "mutexpred :- on(Var_enumerated_0_block, Var_counted_1_block)."
        };
        assert_eq!(
            add_none_rules(&mut task, Trace::none()),
            Err(TransformError::Task(TaskError::UnresolvedPredicate {
                name: String::from("max_mutex_pred0")
            }))
        );
    }

    #[test]
    fn hacky_zero() {
        let mut task = bounded();
        add_hacky_zero_if_not_unique(&mut task, Trace::none()).expect("zero");
        assert_eq!(task.rules.len(), 4);
        assert!(rule_text!(task, 2).ends_with(":-hack_zero_pred()"));
        assert_eq!(task.init.iter().filter(|a| task.name(a.predicate) == ZERO).count(), 1);
    }

    #[test]
    fn unique_groups_untouched() {
        let mut task = task! {
            "pddl_type_block(a)."
            "pddl_type_block(b)."
            "addpred_on__guaranteed(a,b)."
            "delpred_on__guaranteed(a,b)."
            "mutexpred_unique :- on(Var_enumerated_0_block, Var_counted_1_block)."
        };
        add_max_mutex(&mut task, Trace::none()).expect("bounds");
        task.init.push(Atom::new(pred!(task, "max_mutex_pred0"), task.init[0].args.clone()));
        let groups = task.mutex_groups.clone();
        let rules = task.rules.clone();
        let facts = task.init.len();

        add_none_rules(&mut task, Trace::none()).expect("none");
        add_hacky_zero_if_not_unique(&mut task, Trace::none()).expect("zero");
        assert_eq!(task.mutex_groups, groups);
        assert_eq!(task.rules, rules);
        assert!(task.predicates().all(|(_, p)| !p.name.contains("none_of_mutexgroup_0")));
        assert_eq!(task.init.len(), facts + 1, "only the zero fact");
        assert_eq!(task.name(task.init[facts].predicate), ZERO);
    }

    #[test]
    fn grounded() {
        let mut task = bounded();
        task.init.push(Atom::new(pred!(task, "delpred_on__guaranteed"), task.init[3].args.iter().rev().copied()));
        print_grounded_mutexes(&mut task, Trace::none()).expect("ground");
        assert!(task.init.is_empty());
        assert_eq!(task.rules.len(), 2);
        assert_eq!(rule_text!(task, 0), "max_mutex_pred0(a):-delpred_on__guaranteed(a,b)");
        assert_eq!(rule_text!(task, 1), "max_mutex_pred0(b):-delpred_on__guaranteed(b,a)");
    }
}
