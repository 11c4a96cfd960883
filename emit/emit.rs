//! Emitters: pure functions from a finished [`DatalogTask`] to an output
//! artifact. None of them modifies the task.

mod lp;
mod pddl;

use std::fmt;

use relaxer_syntax::*;
use thiserror::Error;

// Re-exports.
pub use lp::linear_program;
pub use pddl::{domain, problem};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EmitError {
    #[error(transparent)]
    Task(#[from] TaskError),

    #[error("a fact or rule instance of `{predicate}` is not ground")]
    NotGround { predicate: String },

    #[error("action `{predicate}` carries no `with__cost` suffix")]
    MissingCost { predicate: String },

    #[error("can't write output")]
    Format(#[from] fmt::Error),
}

/// The term names of a ground atom, or an error naming its predicate.
pub(crate) fn constants<'a>(task: &'a DatalogTask, atom: &Atom) -> Result<Vec<&'a str>, EmitError> {
    atom.args
        .iter()
        .map(|arg| match arg {
            Term::Constant(c) => Ok(task.object(*c).name.as_str()),
            Term::Variable(_) => Err(EmitError::NotGround {
                predicate: task.name(atom.predicate).to_owned(),
            }),
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ground_constants() {
        let task = task! {
            "p(a,b)."
            "q(Var_X) :- p(Var_X,b)."
        };
        assert_eq!(constants(&task, &task.init[0]), Ok(vec!["a", "b"]));
        assert_eq!(
            constants(&task, &task.rules[0].head),
            Err(EmitError::NotGround {
                predicate: String::from("q")
            })
        );
    }
}
