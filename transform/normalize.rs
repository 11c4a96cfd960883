//! Fix-ups run around every pipeline.

use std::collections::BTreeMap;

use relaxer_syntax::*;
use relaxer_tracer::{trace, Trace};

/// Replace every mutex-group constant that is the only object of some
/// type by a fresh enumerated variable over that type. Each group numbers
/// its fresh variables past its own largest variable number, and reuses
/// one variable per object.
pub fn generalize_unique_objects(task: &mut DatalogTask, trace: Trace) {
    if task.mutex_groups.is_empty() {
        return;
    }

    let mut counts = BTreeMap::<PredicateId, (usize, ObjectId)>::new();
    for atom in &task.init {
        if let (Role::Type, [Term::Constant(object)]) = (task.role(atom.predicate), &atom.args[..]) {
            counts.entry(atom.predicate).or_insert((0, *object)).0 += 1;
        }
    }
    let mut unique = BTreeMap::<ObjectId, PredicateId>::new();
    for (&domain, &(count, object)) in &counts {
        if count == 1 {
            unique.entry(object).or_insert(domain);
        }
    }
    if unique.is_empty() {
        return;
    }

    for (g, group) in task.mutex_groups.iter_mut().enumerate() {
        let mut next = group
            .elements
            .iter()
            .flat_map(|e| &e.pars)
            .filter_map(|par| match par {
                MutexPar::Variable { number, .. } => Some(number + 1),
                MutexPar::Constant(_) => None,
            })
            .max()
            .unwrap_or(0);
        let mut fresh = BTreeMap::<ObjectId, usize>::new();
        for par in group.elements.iter_mut().flat_map(|e| &mut e.pars) {
            let MutexPar::Constant(object) = *par else {
                continue;
            };
            let Some(&domain) = unique.get(&object) else {
                continue;
            };
            let number = *fresh.entry(object).or_insert_with(|| {
                next += 1;
                next - 1
            });
            trace!(trace, Rewrite, "Generalizing object #{} in mutex group {} to variable {}", object.index(), g, number);
            *par = MutexPar::Variable {
                number,
                counted: false,
                domain,
            };
        }
    }
}

/// Make sure there are at least as many variables as the widest
/// predicate has parameters.
pub fn fill_variables(task: &mut DatalogTask) {
    let n = task.max_arity();
    task.ensure_variables(n);
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn generalize() {
        let mut task = task! {
            "pddl_type_block(a)."
            "pddl_type_block(b)."
            "pddl_type_robot(r)."
            "mutexpred_unique :- at(Var_enumerated_0_block, r), holding(r, a)."
        };
        generalize_unique_objects(&mut task, Trace::none());
        let robot = pred!(task, "pddl_type_robot");
        let r = task.objects().find(|(_, o)| o.name == "r").map(|(id, _)| id);
        let a = task.objects().find(|(_, o)| o.name == "a").map(|(id, _)| id);
        let fresh = MutexPar::Variable {
            number: 1,
            counted: false,
            domain: robot,
        };
        let group = &task.mutex_groups[0];
        assert_eq!(group.elements[0].pars[1], fresh);
        assert_eq!(group.elements[1].pars[0], fresh, "one variable per object");
        assert_eq!(group.elements[1].pars[1], MutexPar::Constant(a.expect("a")));
        assert!(r.is_some());
    }

    #[test]
    fn fill() {
        let mut task = task! {
            "p(a,b,c)."
            "q(Var_X) :- p(Var_X,b,c)."
        };
        assert_eq!(task.variable_count(), 1);
        fill_variables(&mut task);
        assert_eq!(task.variable_count(), 3);
    }
}
