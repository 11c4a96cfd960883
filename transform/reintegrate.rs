//! Turn the annotations left by mutex filtering back into rule bodies.
//!
//! Every hack rule `hack :- effect, false, match_g_p, ...` names an effect
//! that could not be shown to be guaranteed. Wherever `hack` occurs in a
//! body it is replaced by the guaranteed shadow of the effect, plus atoms
//! over mutex bound predicates that account for the effect possibly being
//! redundant. The hack rules are removed.

use std::collections::{BTreeMap, BTreeSet};

use relaxer_ground::{FactIndex, GuaranteedRegistry, MutexMatch};
use relaxer_syntax::role::{
    guaranteed_name, type_predicate_name, MAX_MUTEX_PREFIX, MIN_MUTEX_PREFIX, NONE_TYPE,
};
use relaxer_syntax::*;
use relaxer_tracer::{trace, Trace};

use crate::TransformError;

/// A hack rule, decoded.
struct Annotation {
    hack: PredicateId,
    effect: Atom,
    matches: Vec<MutexMatch>,
}

fn annotations(task: &DatalogTask) -> Result<Vec<Annotation>, TransformError> {
    let mut annotations = Vec::new();
    for rule in &task.rules {
        let hack = rule.head.predicate;
        if task.role(hack) != Role::RuleHack {
            continue;
        }
        let Some(effect) = rule.body.first() else {
            return Err(TaskError::UnresolvedPredicate {
                name: task.name(hack).to_owned(),
            }
            .into());
        };
        let matches = rule.body[1..]
            .iter()
            .filter_map(|atom| match task.role(atom.predicate) {
                Role::Match { group, position } => Some(MutexMatch::new(group, position)),
                _ => None,
            })
            .collect();
        annotations.push(Annotation {
            hack,
            effect: effect.clone(),
            matches,
        });
    }
    Ok(annotations)
}

/// Make sure both guaranteed shadows of `original` exist, seeding any
/// new one with the facts of `shadow`.
fn ensure_guaranteed(
    task: &mut DatalogTask,
    registry: &mut GuaranteedRegistry,
    facts: &FactIndex,
    shadow: PredicateId,
    original: PredicateId,
) -> Result<(), TransformError> {
    for polarity in [Polarity::Add, Polarity::Delete] {
        if registry.of(original, polarity).is_some() {
            continue;
        }
        let name = guaranteed_name(polarity, task.name(original));
        let guaranteed = task.intern_predicate(&name, task.arity(original))?;
        for args in facts.args(shadow) {
            task.init.push(Atom::new(guaranteed, args.iter().copied()));
        }
        registry.insert(task, guaranteed);
    }
    Ok(())
}

/// Bound predicates for an effect that matched no mutex element: a new
/// non-unique group over the original predicate, with its bounds derived
/// from the guaranteed shadows and seeded with the shadow's facts. The
/// bounds are numbered after the new group.
fn unmatched_bounds(
    task: &mut DatalogTask,
    registry: &GuaranteedRegistry,
    facts: &FactIndex,
    shadow: PredicateId,
    original: PredicateId,
) -> Result<(PredicateId, PredicateId), TransformError> {
    let n = task.arity(original);
    let index = task.mutex_groups.len();
    let object = task.intern_predicate(&type_predicate_name(NONE_TYPE), 1)?;
    task.mutex_groups.push(MutexGroup {
        elements: vec![MutexElement {
            predicate: original,
            pars: (0..n)
                .map(|number| MutexPar::Variable {
                    number,
                    counted: false,
                    domain: object,
                })
                .collect(),
        }],
        unique: false,
    });

    let max = task.intern_predicate(&format!("{MAX_MUTEX_PREFIX}{index}"), n)?;
    let min = task.intern_predicate(&format!("{MIN_MUTEX_PREFIX}{index}"), n)?;
    let args = task.canonical_args(n);
    for (bound, polarity) in [(max, Polarity::Delete), (min, Polarity::Add)] {
        if let Some(guaranteed) = registry.of(original, polarity) {
            task.rules.push(Rule::new(
                Atom::new(bound, args.iter().copied()),
                [Atom::new(guaranteed, args.iter().copied())],
            ));
        }
        for fact in facts.args(shadow) {
            task.init.push(Atom::new(bound, fact.iter().copied()));
        }
    }
    Ok((max, min))
}

/// The bound atom of a matched group, bound on the group's enumerated
/// variables through the effect's arguments.
fn matched_bound(task: &DatalogTask, effect: &Atom, m: MutexMatch, polarity: Polarity) -> Option<Atom> {
    let prefix = match polarity {
        Polarity::Add => MAX_MUTEX_PREFIX,
        Polarity::Delete => MIN_MUTEX_PREFIX,
    };
    let bound = task.lookup_predicate(&format!("{prefix}{}", m.group))?;
    let element = task.mutex_groups.get(m.group)?.elements.get(m.position)?;
    let numbers = task.mutex_groups[m.group]
        .elements
        .iter()
        .flat_map(|e| &e.pars)
        .filter_map(|par| match par {
            MutexPar::Variable {
                number,
                counted: false,
                ..
            } => Some(*number),
            _ => None,
        })
        .collect::<BTreeSet<_>>();
    if task.arity(bound) != numbers.len() {
        return None;
    }
    let args = numbers
        .iter()
        .map(|&n| {
            element
                .pars
                .iter()
                .position(|par| matches!(par, MutexPar::Variable { number, counted: false, .. } if *number == n))
                .and_then(|p| effect.args.get(p).copied())
        })
        .collect::<Option<Vec<_>>>()?;
    Some(Atom::new(bound, args))
}

pub fn reintegrate_mutex_rules(task: &mut DatalogTask, trace: Trace) -> Result<(), TransformError> {
    let annotations = annotations(task)?;
    let hacks = annotations.iter().map(|a| a.hack).collect::<BTreeSet<_>>();
    task.rules.retain(|rule| !hacks.contains(&rule.head.predicate));
    let facts = FactIndex::new(&task.init);
    let mut registry = GuaranteedRegistry::new(task);
    let mut bounds = BTreeMap::<PredicateId, (PredicateId, PredicateId)>::new();
    let mut replacements = BTreeMap::<PredicateId, Vec<Atom>>::new();

    for annotation in &annotations {
        let effect = &annotation.effect;
        let shadow = effect.predicate;
        let Some((polarity, original)) = task.shadowed(shadow) else {
            return Err(TaskError::UnresolvedPredicate {
                name: task.name(shadow).to_owned(),
            }
            .into());
        };
        ensure_guaranteed(task, &mut registry, &facts, shadow, original)?;
        let guaranteed = registry.of(original, polarity).ok_or_else(|| TaskError::UnresolvedPredicate {
            name: guaranteed_name(polarity, task.name(original)),
        })?;
        let mut atoms = vec![Atom::new(guaranteed, effect.args.iter().copied())];

        if annotation.matches.is_empty() {
            let (max, min) = match bounds.get(&shadow) {
                Some(&bounds) => bounds,
                None => {
                    let created = unmatched_bounds(task, &registry, &facts, shadow, original)?;
                    bounds.insert(shadow, created);
                    created
                }
            };
            let bound = match polarity {
                Polarity::Add => max,
                Polarity::Delete => min,
            };
            atoms.push(Atom::new(bound, effect.args.iter().copied()));
        } else {
            for &m in &annotation.matches {
                match matched_bound(task, effect, m, polarity) {
                    Some(atom) => atoms.push(atom),
                    None => trace!(trace, Rewrite, "No bound for group {} on `{}`", m.group, task.named(effect)),
                }
            }
        }
        trace!(trace, Rewrite, "Reintegrating `{}` as {} atoms", task.name(annotation.hack), atoms.len());
        replacements.insert(annotation.hack, atoms);
    }

    for rule in &mut task.rules {
        rule.body = std::mem::take(&mut rule.body)
            .into_iter()
            .flat_map(|atom| match replacements.get(&atom.predicate) {
                Some(atoms) => atoms.clone(),
                None => vec![atom],
            })
            .collect();
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mutex_filter;

    #[test]
    fn unmatched_effect() {
        let mut task = task! {
            "clear(a)."
            "addpred_clear(a)."
            "action(a) :- holding(a), addpred_clear(a)."
        };
        mutex_filter(&mut task, Trace::none()).expect("filter");
        reintegrate_mutex_rules(&mut task, Trace::none()).expect("reintegrate");

        assert!(task.rules.iter().all(|r| task.role(r.head.predicate) != Role::RuleHack));
        assert_eq!(
            rule_text!(task, 0),
            "action(a):-holding(a),addpred_clear__guaranteed(a),max_mutex_pred0(a)"
        );
        assert!(task.lookup_predicate("delpred_clear__guaranteed").is_some());
        assert_eq!(task.arity(pred!(task, "max_mutex_pred0")), 1);
        assert_eq!(task.arity(pred!(task, "min_mutex_pred0")), 1);
        let group = task.mutex_groups.last().expect("new group");
        assert!(!group.unique);
        assert_eq!(group.elements[0].predicate, pred!(task, "clear"));
        assert_eq!(
            rule_text!(task, 1),
            "max_mutex_pred0(Var_tmp_created_0):-delpred_clear__guaranteed(Var_tmp_created_0)"
        );
        assert_eq!(
            rule_text!(task, 2),
            "min_mutex_pred0(Var_tmp_created_0):-addpred_clear__guaranteed(Var_tmp_created_0)"
        );
        assert!(task.init.iter().any(|a| task.name(a.predicate) == "max_mutex_pred0"));
    }

    #[test]
    fn matched_effect() {
        let mut task = task! {
            "pddl_type_block(a)."
            "pddl_type_block(b)."
            "pddl_type_block(c)."
            "on(a,b)."
            "mutexpred :- on(Var_enumerated_0_block, Var_counted_1_block)."
            "action(a) :- clear(a), addpred_on(a,c)."
        };
        mutex_filter(&mut task, Trace::none()).expect("filter");
        crate::equalize_add_guaranteed_atoms(&mut task, Trace::none()).expect("equalize");
        crate::equalize_guaranteed_atoms(&mut task, Trace::none()).expect("equalize");
        crate::add_max_mutex(&mut task, Trace::none()).expect("bounds");
        reintegrate_mutex_rules(&mut task, Trace::none()).expect("reintegrate");

        assert!(task.rules.iter().all(|r| task.role(r.head.predicate) != Role::RuleHack));
        assert_eq!(
            rule_text!(task, 0),
            "action(a):-clear(a),addpred_on__guaranteed(a,c),max_mutex_pred0(a)"
        );
        assert_eq!(task.mutex_groups.len(), 1, "no new group");
    }
}
