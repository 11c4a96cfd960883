//! Passes that tie shadows to each other with copy rules.

use relaxer_ground::GuaranteedRegistry;
use relaxer_syntax::role::{guaranteed_name, GUARANTEED_SUFFIX};
use relaxer_syntax::*;
use relaxer_tracer::{trace, Trace};

use crate::TransformError;

/// `to(V0..Vn) :- from(V0..Vn)`.
fn copy_rule(task: &mut DatalogTask, to: PredicateId, from: PredicateId) -> Rule {
    let args = task.canonical_args(task.arity(from));
    Rule::new(Atom::new(to, args.iter().copied()), [Atom::new(from, args)])
}

/// Every plain shadow implies its guaranteed shadow.
pub fn equalize_add_guaranteed_atoms(task: &mut DatalogTask, trace: Trace) -> Result<(), TransformError> {
    let shadows = task
        .delete_shadows()
        .chain(task.add_shadows())
        .map(|(shadow, _)| shadow)
        .filter(|&shadow| task.role(shadow).is_plain_shadow())
        .collect::<Vec<_>>();
    for shadow in shadows {
        let name = format!("{}{GUARANTEED_SUFFIX}", task.name(shadow));
        let guaranteed = task.intern_predicate(&name, task.arity(shadow))?;
        trace!(trace, Rewrite, "`{}` implies `{}`", task.name(shadow), name);
        let rule = copy_rule(task, guaranteed, shadow);
        task.rules.push(rule);
    }
    Ok(())
}

/// Every guaranteed shadow implies its opposite-polarity counterpart,
/// which is created if missing.
pub fn equalize_guaranteed_atoms(task: &mut DatalogTask, trace: Trace) -> Result<(), TransformError> {
    let registry = GuaranteedRegistry::new(task);
    for guaranteed in registry.guaranteed() {
        let Some((polarity, original)) = registry.original(guaranteed) else {
            continue;
        };
        let name = guaranteed_name(polarity.opposite(), task.name(original));
        let counterpart = task.intern_predicate(&name, task.arity(guaranteed))?;
        trace!(trace, Rewrite, "`{}` implies `{}`", task.name(guaranteed), name);
        let rule = copy_rule(task, counterpart, guaranteed);
        task.rules.push(rule);
    }
    Ok(())
}

/// Replace the rules by `shadow(V..) :- original(V..)` for every shadow.
pub fn integrate_add_del_rules(task: &mut DatalogTask, trace: Trace) -> Result<(), TransformError> {
    let shadows = task
        .add_shadows()
        .chain(task.delete_shadows())
        .collect::<Vec<_>>();
    trace!(trace, Rewrite, "Replacing {} rules by {} shadow rules", task.rules.len(), shadows.len());
    task.rules.clear();
    for (shadow, original) in shadows {
        let rule = copy_rule(task, shadow, original);
        task.rules.push(rule);
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn add_guaranteed() {
        let mut task = task! {
            "addpred_on(a,b)."
            "delpred_clear(a)."
            "addpred_clear__guaranteed(a)."
        };
        equalize_add_guaranteed_atoms(&mut task, Trace::none()).expect("equalize");
        assert_eq!(task.rules.len(), 2);
        let v0 = task.variable(VarId::new(0)).name.clone();
        assert_eq!(
            rule_text!(task, 0),
            format!("delpred_clear__guaranteed({v0}):-delpred_clear({v0})")
        );
        assert!(rule_text!(task, 1).starts_with("addpred_on__guaranteed("));
    }

    #[test]
    fn guaranteed_counterparts() {
        let mut task = task! {
            "addpred_on__guaranteed(a,b)."
            "delpred_clear__guaranteed(a)."
        };
        equalize_guaranteed_atoms(&mut task, Trace::none()).expect("equalize");
        assert_eq!(task.rules.len(), 2);
        assert!(task.lookup_predicate("delpred_on__guaranteed").is_some());
        assert!(task.lookup_predicate("addpred_clear__guaranteed").is_some());
        let v0 = task.variable(VarId::new(0)).name.clone();
        let v1 = task.variable(VarId::new(1)).name.clone();
        assert_eq!(
            rule_text!(task, 0),
            format!("delpred_on__guaranteed({v0},{v1}):-addpred_on__guaranteed({v0},{v1})")
        );
    }

    #[test]
    fn integrate() {
        let mut task = task! {
            "on(a,b)."
            "q(Var_X) :- on(Var_X,b), addpred_on(Var_X,b), delpred_clear(Var_X)."
        };
        integrate_add_del_rules(&mut task, Trace::none()).expect("integrate");
        assert_eq!(task.rules.len(), 2);
        assert_eq!(rule_text!(task, 0), "addpred_on(Var_X,Var_tmp_created_0):-on(Var_X,Var_tmp_created_0)");
        assert_eq!(rule_text!(task, 1), "delpred_clear(Var_X):-clear(Var_X)");
    }
}
