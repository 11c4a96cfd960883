//! A PDDL rendition of a task: the rules become a domain with one action
//! per rule, the facts become a problem whose goal is the goal predicate.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use relaxer_syntax::role::GOAL;
use relaxer_syntax::*;
use relaxer_tracer::{trace, Trace};

use crate::{constants, EmitError};

const INDENT: &str = "    ";

/// `(p a ?X)`: constants by name, variables prefixed with `?`.
fn lifted(task: &DatalogTask, atom: &Atom) -> String {
    let mut text = format!("({}", task.name(atom.predicate));
    for arg in &atom.args {
        text.push(' ');
        if arg.is_variable() {
            text.push('?');
        }
        text.push_str(task.term_name(arg));
    }
    text.push(')');
    text
}

fn ground(task: &DatalogTask, atom: &Atom) -> Result<String, EmitError> {
    let mut text = format!("({}", task.name(atom.predicate));
    for constant in constants(task, atom)? {
        write!(text, " {constant}")?;
    }
    text.push(')');
    Ok(text)
}

/// Objects that occur as constants in some rule.
fn rule_constants(task: &DatalogTask) -> BTreeSet<ObjectId> {
    task.rules
        .iter()
        .flat_map(|r| std::iter::once(&r.head).chain(&r.body))
        .flat_map(|atom| atom.args.iter().filter_map(Term::constant))
        .collect()
}

/// Head variables first, then body variables, each once.
fn rule_variables(rule: &Rule) -> Vec<VarId> {
    let mut vars = rule.head.variables();
    for v in rule.body.iter().flat_map(Atom::variables) {
        if !vars.contains(&v) {
            vars.push(v);
        }
    }
    vars
}

pub fn problem(task: &DatalogTask, trace: Trace) -> Result<String, EmitError> {
    let constants = rule_constants(task);
    trace!(trace, Emit, "{} objects are domain constants", constants.len());
    let mut out = String::new();
    writeln!(out, "(define (problem generated_problem)")?;
    writeln!(out, "  (:domain generated_domain)")?;
    writeln!(out)?;
    writeln!(out, "  (:objects")?;
    for (_, object) in task.objects().filter(|(id, _)| !constants.contains(id)) {
        writeln!(out, "{INDENT}{} - object", object.name)?;
    }
    writeln!(out, "  )")?;
    writeln!(out)?;
    writeln!(out, "  (:init")?;
    for fact in &task.init {
        writeln!(out, "{INDENT}{}", ground(task, fact)?)?;
    }
    writeln!(out, "  )")?;
    writeln!(out)?;
    writeln!(out, "  (:goal")?;
    writeln!(out, "{INDENT}({GOAL})")?;
    writeln!(out, "  )")?;
    writeln!(out, ")")?;
    Ok(out)
}

pub fn domain(task: &DatalogTask, trace: Trace) -> Result<String, EmitError> {
    let mut out = String::new();
    writeln!(out, "(define (domain generated_domain)")?;
    writeln!(out)?;
    writeln!(out, "  (:types object)")?;
    writeln!(out)?;

    let constants = rule_constants(task);
    if !constants.is_empty() {
        writeln!(out, "  (:constants")?;
        for &c in &constants {
            writeln!(out, "{INDENT}{} - object", task.object(c).name)?;
        }
        writeln!(out, "  )")?;
        writeln!(out)?;
    }

    writeln!(out, "  (:predicates")?;
    for (_, predicate) in task.predicates() {
        write!(out, "{INDENT}({}", predicate.name)?;
        for i in 0..predicate.arity {
            write!(out, " ?v{i} - object")?;
        }
        writeln!(out, ")")?;
    }
    writeln!(out, "  )")?;
    writeln!(out)?;

    for (i, rule) in task.rules.iter().enumerate() {
        let parameters = rule_variables(rule)
            .into_iter()
            .map(|v| format!("?{} - object", task.variable(v).name))
            .collect::<Vec<_>>();
        writeln!(out, "  (:action action_{i}")?;
        writeln!(out, "{INDENT}:parameters ({})", parameters.join(" "))?;
        writeln!(out, "{INDENT}:precondition (and")?;
        for atom in &rule.body {
            writeln!(out, "{INDENT}  {}", lifted(task, atom))?;
        }
        writeln!(out, "{INDENT})")?;
        writeln!(out, "{INDENT}:effect (and")?;
        writeln!(out, "{INDENT}  {}", lifted(task, &rule.head))?;
        writeln!(out, "{INDENT})")?;
        writeln!(out, "  )")?;
        writeln!(out)?;
    }
    writeln!(out, ")")?;
    trace!(trace, Emit, "{} actions over {} predicates", task.rules.len(), task.predicate_count());
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn problem_text() {
        let task = task! {
            "on(a,b)."
            "clear(c)."
            "goal__reachable :- on(a,Var_X)."
        };
        assert_eq!(
            problem(&task, Trace::none()).expect("problem"),
            "(define (problem generated_problem)\n\
             \x20 (:domain generated_domain)\n\
             \n\
             \x20 (:objects\n\
             \x20   b - object\n\
             \x20   c - object\n\
             \x20 )\n\
             \n\
             \x20 (:init\n\
             \x20   (on a b)\n\
             \x20   (clear c)\n\
             \x20 )\n\
             \n\
             \x20 (:goal\n\
             \x20   (goal__reachable)\n\
             \x20 )\n\
             )\n"
        );
    }

    #[test]
    fn lifted_fact() {
        let mut task = task! {
            "p(a)."
        };
        let x = task.intern_term("Var_X");
        task.init.push(Atom::new(pred!(task, "p"), [x]));
        assert_eq!(
            problem(&task, Trace::none()),
            Err(EmitError::NotGround {
                predicate: String::from("p")
            })
        );
    }

    #[test]
    fn domain_text() {
        let task = task! {
            "on(a,b)."
            "clear(Var_X) :- on(Var_Y,Var_X), handempty(), on(Var_X,a)."
        };
        assert_eq!(
            domain(&task, Trace::none()).expect("domain"),
            "(define (domain generated_domain)\n\
             \n\
             \x20 (:types object)\n\
             \n\
             \x20 (:constants\n\
             \x20   a - object\n\
             \x20 )\n\
             \n\
             \x20 (:predicates\n\
             \x20   (on ?v0 - object ?v1 - object)\n\
             \x20   (clear ?v0 - object)\n\
             \x20   (handempty)\n\
             \x20 )\n\
             \n\
             \x20 (:action action_0\n\
             \x20   :parameters (?Var_X - object ?Var_Y - object)\n\
             \x20   :precondition (and\n\
             \x20     (on ?Var_Y ?Var_X)\n\
             \x20     (handempty)\n\
             \x20     (on ?Var_X a)\n\
             \x20   )\n\
             \x20   :effect (and\n\
             \x20     (clear ?Var_X)\n\
             \x20   )\n\
             \x20 )\n\
             \n\
             )\n"
        );
    }
}
