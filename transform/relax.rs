//! Structural relaxations of the whole task.

use std::collections::{BTreeMap, BTreeSet};

use relaxer_syntax::*;
use relaxer_tracer::{trace, Trace};

use crate::TransformError;

/// Drop every argument of every predicate.
pub fn zero_ary_relaxation(task: &mut DatalogTask, trace: Trace) -> Result<(), TransformError> {
    let ids = task.predicates().map(|(id, _)| id).collect::<Vec<_>>();
    trace!(trace, Rewrite, "Dropping the arguments of {} predicates", ids.len());
    for id in ids {
        task.set_arity(id, 0);
    }
    for atom in task
        .init
        .iter_mut()
        .chain(task.rules.iter_mut().flat_map(|r| std::iter::once(&mut r.head).chain(&mut r.body)))
    {
        atom.args.clear();
    }
    for element in task.mutex_groups.iter_mut().flat_map(|g| &mut g.elements) {
        element.pars.clear();
    }
    Ok(())
}

/// Split an atom into its unary pieces, if it has them.
fn split(pieces: &BTreeMap<PredicateId, Vec<PredicateId>>, atom: Atom) -> Vec<Atom> {
    match pieces.get(&atom.predicate) {
        Some(unary) => unary
            .iter()
            .zip(atom.args)
            .map(|(&p, arg)| Atom::new(p, [arg]))
            .collect(),
        None => vec![atom],
    }
}

fn dedup(atoms: impl IntoIterator<Item = Atom>) -> Vec<Atom> {
    let mut seen = BTreeSet::new();
    atoms
        .into_iter()
        .filter(|atom| seen.insert(atom.clone()))
        .collect()
}

/// Split every predicate of arity above one into unary predicates
/// `p___ur<i>`, one per position. A rule whose head splits becomes one
/// rule per head piece.
pub fn unary_relaxation(task: &mut DatalogTask, trace: Trace) -> Result<(), TransformError> {
    let wide = task
        .predicates()
        .filter(|(_, p)| p.arity > 1)
        .map(|(id, p)| (id, p.name.clone(), p.arity))
        .collect::<Vec<_>>();
    let mut pieces = BTreeMap::new();
    for (id, name, arity) in wide {
        let unary = (0..arity)
            .map(|i| task.intern_predicate(&format!("{name}___ur{i}"), 1))
            .collect::<Result<Vec<_>, _>>()?;
        trace!(trace, Rewrite, "Splitting `{}` into {} unary predicates", name, arity);
        pieces.insert(id, unary);
    }

    task.init = dedup(std::mem::take(&mut task.init).into_iter().flat_map(|a| split(&pieces, a)));
    let rules = std::mem::take(&mut task.rules);
    for rule in rules {
        let body = dedup(rule.body.into_iter().flat_map(|a| split(&pieces, a)));
        for head in split(&pieces, rule.head) {
            task.rules.push(Rule::new(head, body.iter().cloned()));
        }
    }
    Ok(())
}

/// Replace the rules by a backward-chaining reduction: predicates used
/// in no body are roots; `reduced_b :- reduced_head, b` for every body
/// atom `b` of every rule.
pub fn create_reducer(task: &mut DatalogTask, trace: Trace) -> Result<(), TransformError> {
    let used = task
        .rules
        .iter()
        .flat_map(|r| r.body.iter().map(|a| a.predicate))
        .collect::<BTreeSet<_>>();
    let predicates = task
        .predicates()
        .map(|(id, p)| (id, p.name.clone(), p.arity))
        .collect::<Vec<_>>();
    let mut reduced = BTreeMap::new();
    for (id, name, arity) in &predicates {
        reduced.insert(*id, task.intern_predicate(&format!("reduced_{name}"), *arity)?);
    }

    let mut rules = Vec::new();
    for (id, _, arity) in predicates.iter().filter(|(id, ..)| !used.contains(id)) {
        let args = task.canonical_args(*arity);
        rules.push(Rule::new(
            Atom::new(reduced[id], args.iter().copied()),
            [Atom::new(*id, args)],
        ));
    }
    let roots = rules.len();
    for rule in &task.rules {
        let head = Atom::new(reduced[&rule.head.predicate], rule.head.args.iter().copied());
        for atom in &rule.body {
            rules.push(Rule::new(
                Atom::new(reduced[&atom.predicate], atom.args.iter().copied()),
                [head.clone(), atom.clone()],
            ));
        }
    }
    trace!(trace, Rewrite, "Reducer with {} roots and {} rules", roots, rules.len());
    task.rules = rules;
    Ok(())
}

/// Whether the rule graph (body predicate to head predicate) has a
/// cycle; yields some predicate on it.
fn find_cycle(task: &DatalogTask) -> Option<PredicateId> {
    #[derive(Clone, Copy, Eq, PartialEq)]
    enum Mark {
        Open,
        Done,
    }

    let mut edges = BTreeMap::<PredicateId, BTreeSet<PredicateId>>::new();
    for rule in &task.rules {
        for atom in &rule.body {
            edges.entry(atom.predicate).or_default().insert(rule.head.predicate);
        }
    }
    let mut marks = BTreeMap::<PredicateId, Mark>::new();
    for &start in edges.keys() {
        if marks.contains_key(&start) {
            continue;
        }
        let mut stack = vec![(start, edges[&start].iter().copied().collect::<Vec<_>>())];
        marks.insert(start, Mark::Open);
        while let Some((node, successors)) = stack.last_mut() {
            let node = *node;
            match successors.pop() {
                Some(next) => match marks.get(&next) {
                    Some(Mark::Open) => return Some(next),
                    Some(Mark::Done) => (),
                    None => {
                        marks.insert(next, Mark::Open);
                        let next_edges = edges
                            .get(&next)
                            .map(|e| e.iter().copied().collect())
                            .unwrap_or_default();
                        stack.push((next, next_edges));
                    }
                },
                None => {
                    marks.insert(node, Mark::Done);
                    stack.pop();
                }
            }
        }
    }
    None
}

/// Drop the effect rules `effect :- action_x(..)`, make every action
/// predicate zero-ary, and insist that what remains is acyclic.
pub fn linearize_action_task(task: &mut DatalogTask, trace: Trace) -> Result<(), TransformError> {
    let actions = task
        .predicates()
        .filter(|(_, p)| p.role == Role::Action)
        .map(|(id, _)| id)
        .collect::<BTreeSet<_>>();
    let before = task.rules.len();
    task.rules
        .retain(|r| !(r.body.len() == 1 && actions.contains(&r.body[0].predicate)));
    trace!(trace, Rewrite, "Dropped {} effect rules of {} actions", before - task.rules.len(), actions.len());

    for &action in &actions {
        task.set_arity(action, 0);
    }
    for atom in task
        .init
        .iter_mut()
        .chain(task.rules.iter_mut().flat_map(|r| std::iter::once(&mut r.head).chain(&mut r.body)))
    {
        if actions.contains(&atom.predicate) {
            atom.args.clear();
        }
    }

    match find_cycle(task) {
        Some(predicate) => Err(TransformError::CyclicRuleGraph {
            predicate: task.name(predicate).to_owned(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn zero_ary() {
        let mut task = task! {
            "pddl_type_block(a)."
            "on(a,a)."
            "q(Var_X) :- on(Var_X,a)."
            "mutexpred :- on(Var_enumerated_0_block, Var_counted_1_block)."
        };
        zero_ary_relaxation(&mut task, Trace::none()).expect("relax");
        assert!(task.predicates().all(|(_, p)| p.arity == 0));
        assert_eq!(rule_text!(task, 0), "q():-on()");
        assert!(task.mutex_groups[0].elements[0].pars.is_empty());
        assert_eq!(task.validate(), Ok(()));
    }

    #[test]
    fn unary() {
        let mut task = task! {
            "on(a,b)."
            "on(a,c)."
            "clear(a)."
            "q(Var_X,Var_Y) :- on(Var_X,Var_Y), clear(Var_X), on(Var_X,b)."
        };
        unary_relaxation(&mut task, Trace::none()).expect("relax");
        let facts = task.program().to_string();
        assert_eq!(
            facts,
            "on___ur0(a).\n\
             on___ur1(b).\n\
             on___ur1(c).\n\
             clear(a).\n\
             q___ur0(Var_X):-on___ur0(Var_X),on___ur1(Var_Y),clear(Var_X),on___ur1(b).\n\
             q___ur1(Var_Y):-on___ur0(Var_X),on___ur1(Var_Y),clear(Var_X),on___ur1(b).\n"
        );
        assert_eq!(task.validate(), Ok(()));
    }

    #[test]
    fn reducer() {
        let mut task = task! {
            "p(a)."
            "goal__reachable :- q(Var_X)."
            "q(Var_X) :- p(Var_X)."
        };
        create_reducer(&mut task, Trace::none()).expect("reduce");
        let texts = (0..task.rules.len()).map(|i| rule_text!(task, i)).collect::<Vec<_>>();
        assert_eq!(
            texts,
            [
                "reduced_goal__reachable():-goal__reachable()",
                "reduced_q(Var_X):-reduced_goal__reachable(),q(Var_X)",
                "reduced_p(Var_X):-reduced_q(Var_X),p(Var_X)",
            ]
        );
    }

    #[test]
    fn linearize() {
        let mut task = task! {
            "at(a)."
            "action_move(Var_X) :- at(Var_X)."
            "addpred_at(Var_X) :- action_move(Var_X)."
            "goal__reachable :- action_move(a)."
        };
        linearize_action_task(&mut task, Trace::none()).expect("acyclic");
        assert_eq!(task.rules.len(), 2);
        assert_eq!(rule_text!(task, 0), "action_move():-at(Var_X)");
        assert_eq!(rule_text!(task, 1), "goal__reachable():-action_move()");
        assert_eq!(task.validate(), Ok(()));
    }

    #[test]
    fn cyclic_rule_graph() {
        let mut task = task! {
            "p(Var_X) :- q(Var_X)."
            "q(Var_X) :- p(Var_X)."
        };
        assert!(matches!(
            linearize_action_task(&mut task, Trace::none()),
            Err(TransformError::CyclicRuleGraph { .. })
        ));
    }
}
