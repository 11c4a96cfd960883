//! A MiniZinc linear program over the ground facts of a task.
//!
//! Every init fact becomes a float variable named
//! `pred_endpred_obj1___obj2___`. A guaranteed fact whose opposite
//! counterpart (with the smaller ID) holds for the same arguments is
//! declared as its negation; facts of action predicates are capped by the
//! cost encoded in the action's name; facts of plain predicates are pinned
//! to zero. Every rule instance contributes `head >= body1 + body2`, the
//! goal is capped at zero, and the objective rule's body, read through the
//! guaranteed variants, is maximized.

use std::fmt::Write as _;

use relaxer_ground::{FactIndex, Groundable as _, GuaranteedRegistry};
use relaxer_syntax::role::{GOAL, OBJECTIVE};
use relaxer_syntax::*;
use relaxer_tracer::{trace, Trace};

use crate::{constants, EmitError};

const BOUNDS: &str = "-1000.0..1000.0";
const COST_MARKER: &str = "with__cost";

fn variable_name(task: &DatalogTask, atom: &Atom) -> Result<String, EmitError> {
    let mut name = format!("{}_endpred_", task.name(atom.predicate));
    for constant in constants(task, atom)? {
        name.push_str(constant);
        name.push_str("___");
    }
    Ok(name)
}

/// The cost after the last underscore of `…with__cost…_<n>`.
fn action_cost(name: &str) -> Result<u64, EmitError> {
    let missing = || EmitError::MissingCost {
        predicate: name.to_owned(),
    };
    if !name.contains(COST_MARKER) {
        return Err(missing());
    }
    let (_, cost) = name.rsplit_once('_').ok_or_else(missing)?;
    cost.parse().map_err(|_| missing())
}

/// Facts of these predicates may take any value.
fn unpinned(role: Role) -> bool {
    matches!(
        role,
        Role::Extension | Role::Goal | Role::Guaranteed(_) | Role::MaxMutex | Role::MinMutex
    )
}

/// Whether some body atom has a variable the head lacks.
fn head_vars_less(rule: &Rule) -> bool {
    let head = rule.head.variables();
    rule.body
        .iter()
        .any(|atom| atom.variables().iter().any(|v| !head.contains(v)))
}

fn sum(terms: &[String]) -> String {
    if terms.is_empty() {
        String::from("0")
    } else {
        terms.join(" + ")
    }
}

pub fn linear_program(task: &DatalogTask, trace: Trace) -> Result<String, EmitError> {
    let goal = task.require_predicate(GOAL)?;
    let objective = task.require_predicate(OBJECTIVE)?;
    let criterion = task
        .rules
        .iter()
        .find(|r| r.head.predicate == objective)
        .ok_or_else(|| TaskError::UnresolvedPredicate {
            name: OBJECTIVE.to_owned(),
        })?;
    let facts = FactIndex::new(&task.init);
    let registry = GuaranteedRegistry::new(task);
    let mut out = String::new();

    for (p, predicate) in task.predicates() {
        let counterpart = registry.counterpart(p).filter(|&c| c < p);
        let cost = match (counterpart, predicate.role) {
            (None, Role::Action) => Some(action_cost(&predicate.name)?),
            _ => None,
        };
        for args in facts.args(p) {
            let name = variable_name(task, &Atom::new(p, args.iter().copied()))?;
            match (counterpart, cost) {
                (Some(c), _) if facts.contains(c, args) => {
                    let negated = variable_name(task, &Atom::new(c, args.iter().copied()))?;
                    writeln!(out, "var float: {name} = -{negated};")?;
                }
                (Some(_), _) => writeln!(out, "var {BOUNDS}: {name};")?,
                (None, Some(cost)) => {
                    writeln!(out, "var {BOUNDS}: {name};")?;
                    writeln!(out, "constraint {name} <= {cost};")?;
                }
                (None, None) => {
                    writeln!(out, "var {BOUNDS}: {name};")?;
                    if !unpinned(predicate.role) {
                        writeln!(out, "constraint {name} = 0;")?;
                    }
                }
            }
        }
    }

    let mut instances = 0;
    for rule in task.rules.iter().filter(|r| r.head.predicate != objective) {
        let superset = if rule.body.len() == 1 && head_vars_less(rule) {
            &rule.body[0]
        } else {
            &rule.head
        };
        for bindings in facts.matching(superset) {
            let instance = rule.ground_with(&bindings).ok_or_else(|| EmitError::NotGround {
                predicate: task.name(rule.head.predicate).to_owned(),
            })?;
            let body = instance
                .body
                .iter()
                .map(|atom| variable_name(task, atom))
                .collect::<Result<Vec<_>, _>>()?;
            let head = variable_name(task, &instance.head)?;
            writeln!(out, "constraint {head} >= {};", sum(&body))?;
            instances += 1;
        }
    }
    trace!(trace, Emit, "{} ground rule constraints", instances);

    writeln!(out, "constraint {} <= 0;", variable_name(task, &Atom::new(goal, []))?)?;

    let mut maximized = Vec::new();
    for atom in &criterion.body {
        let Some(variant) = registry.variant(atom.predicate) else {
            continue;
        };
        let atom = Atom::new(variant, atom.args.iter().copied());
        constants(task, &atom)?;
        if facts.contains(variant, &atom.args) {
            maximized.push(variable_name(task, &atom)?);
        }
    }
    trace!(trace, Emit, "Maximizing {} of {} criterion atoms", maximized.len(), criterion.body.len());
    writeln!(out, "solve maximize {};", sum(&maximized))?;

    let shown = task
        .init
        .iter()
        .filter(|atom| registry.is_guaranteed(atom.predicate))
        .map(|atom| variable_name(task, atom).map(|name| format!("\"{name}=\\({name})\\n\"")))
        .collect::<Result<Vec<_>, _>>()?;
    writeln!(out, "output [")?;
    writeln!(out, "{}", shown.join(",\n"))?;
    writeln!(out, "];")?;
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn cost() {
        assert_eq!(action_cost("action_move_with__cost_7"), Ok(7));
        assert_eq!(
            action_cost("action_move"),
            Err(EmitError::MissingCost {
                predicate: String::from("action_move")
            })
        );
        assert!(action_cost("action_with__cost_x").is_err());
    }

    #[test]
    fn program() {
        let task = task! {
            "on(a,b)."
            "addpred_on__guaranteed(a,b)."
            "delpred_on__guaranteed(a,b)."
            "action_stack_with__cost_3()."
            "goal__reachable()."
            "goal__reachable :- delpred_on__guaranteed(a,b)."
            "addpred_on__guaranteed(Var_X,Var_Y) :- on(Var_X,Var_Y), action_stack_with__cost_3()."
            "optimization__criterion__fact :- on(a,b)."
        };
        let lp = linear_program(&task, Trace::none()).expect("emit");
        assert_eq!(
            lp,
            "var -1000.0..1000.0: on_endpred_a___b___;\n\
             constraint on_endpred_a___b___ = 0;\n\
             var -1000.0..1000.0: addpred_on__guaranteed_endpred_a___b___;\n\
             var float: delpred_on__guaranteed_endpred_a___b___ = -addpred_on__guaranteed_endpred_a___b___;\n\
             var -1000.0..1000.0: action_stack_with__cost_3_endpred_;\n\
             constraint action_stack_with__cost_3_endpred_ <= 3;\n\
             var -1000.0..1000.0: goal__reachable_endpred_;\n\
             constraint goal__reachable_endpred_ >= delpred_on__guaranteed_endpred_a___b___;\n\
             constraint addpred_on__guaranteed_endpred_a___b___ >= on_endpred_a___b___ + action_stack_with__cost_3_endpred_;\n\
             constraint goal__reachable_endpred_ <= 0;\n\
             solve maximize delpred_on__guaranteed_endpred_a___b___;\n\
             output [\n\
             \"addpred_on__guaranteed_endpred_a___b___=\\(addpred_on__guaranteed_endpred_a___b___)\\n\",\n\
             \"delpred_on__guaranteed_endpred_a___b___=\\(delpred_on__guaranteed_endpred_a___b___)\\n\"\n\
             ];\n"
        );
    }

    #[test]
    fn body_supersets_head() {
        let task = task! {
            "on(a,b)."
            "on(c,b)."
            "clear(a)."
            "clear(c)."
            "goal__reachable()."
            "clear(Var_X) :- on(Var_X,Var_Y)."
            "optimization__criterion__fact :- clear(a)."
        };
        let lp = linear_program(&task, Trace::none()).expect("emit");
        assert!(lp.contains("constraint clear_endpred_a___ >= on_endpred_a___b___;\n"));
        assert!(lp.contains("constraint clear_endpred_c___ >= on_endpred_c___b___;\n"));
        assert!(lp.contains("solve maximize 0;\n"), "clear has no guaranteed variant");
    }

    #[test]
    fn unbound_body_variable() {
        let task = task! {
            "p(a)."
            "goal__reachable()."
            "p(Var_X) :- q(Var_X,Var_Y), r(Var_Y)."
            "optimization__criterion__fact :- p(a)."
        };
        assert_eq!(
            linear_program(&task, Trace::none()),
            Err(EmitError::NotGround {
                predicate: String::from("p")
            })
        );
    }

    #[test]
    fn missing_objective() {
        let task = task! {
            "goal__reachable()."
        };
        assert!(matches!(
            linear_program(&task, Trace::none()),
            Err(EmitError::Task(TaskError::UnresolvedPredicate { .. }))
        ));
    }
}
