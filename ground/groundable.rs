//! A trait to describe elements that may be grounded.

use relaxer_syntax::*;

use super::Bindings;

/// Replace bound variables with their constants. Yields `None` if
/// some variable has no binding; constants pass through.
pub trait Groundable: Sized {
    fn ground_with(&self, bindings: &Bindings) -> Option<Self>;
}

impl Groundable for Term {
    fn ground_with(&self, bindings: &Bindings) -> Option<Self> {
        match self {
            Term::Variable(v) => bindings.get(v).copied().map(Term::Constant),
            Term::Constant(_) => Some(*self),
        }
    }
}

impl Groundable for Atom {
    fn ground_with(&self, bindings: &Bindings) -> Option<Self> {
        Some(Atom {
            predicate: self.predicate,
            args: self
                .args
                .iter()
                .map(|arg| arg.ground_with(bindings))
                .collect::<Option<Vec<_>>>()?,
        })
    }
}

impl Groundable for Rule {
    fn ground_with(&self, bindings: &Bindings) -> Option<Self> {
        Some(Rule {
            head: self.head.ground_with(bindings)?,
            body: self
                .body
                .iter()
                .map(|atom| atom.ground_with(bindings))
                .collect::<Option<Vec<_>>>()?,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Matcher as _;

    #[test]
    fn ground_rule() {
        let task = task! {
            "p(a,b)."
            "q(Var_X) :- p(Var_X,Var_Y), r(Var_Y)."
            "q(a) :- p(a,b), r(b)."
        };
        let mut bindings = Bindings::new();
        assert!(task.rules[0].body[0].matches(&task.init[0], &mut bindings));
        assert_eq!(task.rules[0].ground_with(&bindings).as_ref(), Some(&task.rules[1]));
        assert_eq!(task.rules[0].ground_with(&Bindings::new()), None);
    }
}
