//! One-sided unification, i.e., matching of lifted elements against
//! ground ones or against mutex patterns.

use relaxer_syntax::*;

use super::Bindings;

/// Match one element against another, binding variables
/// on the left to constants on the right. Adapted from the
/// `GroundMatch` trait in [mu-gringo](https://github.com/potassco/mu-gringo).
///
/// A failed match may leave partial bindings behind; start each
/// attempt from a fresh (or cloned) set.
pub trait Matcher<Other: ?Sized = Self> {
    fn matches(&self, other: &Other, bindings: &mut Bindings) -> bool;
}

fn bind(bindings: &mut Bindings, var: VarId, value: ObjectId) -> bool {
    *bindings.entry(var).or_insert(value) == value
}

/// A lifted term against a ground one.
impl Matcher for Term {
    fn matches(&self, other: &Self, bindings: &mut Bindings) -> bool {
        match (self, other) {
            (_, Term::Variable(_)) => false,
            (Term::Constant(a), Term::Constant(b)) => a == b,
            (Term::Variable(v), Term::Constant(c)) => bind(bindings, *v, *c),
        }
    }
}

impl Matcher for [Term] {
    fn matches(&self, other: &Self, bindings: &mut Bindings) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(l, r)| l.matches(r, bindings))
    }
}

impl Matcher for Atom {
    fn matches(&self, other: &Self, bindings: &mut Bindings) -> bool {
        self.predicate == other.predicate && self.args[..].matches(&other.args[..], bindings)
    }
}

/// A symbolic mutex parameter matches anything; a constant one matches
/// an equal constant or a variable consistently bound to it.
impl Matcher<MutexPar> for Term {
    fn matches(&self, other: &MutexPar, bindings: &mut Bindings) -> bool {
        match (self, other) {
            (_, MutexPar::Variable { .. }) => true,
            (Term::Constant(c), MutexPar::Constant(o)) => c == o,
            (Term::Variable(v), MutexPar::Constant(o)) => bind(bindings, *v, *o),
        }
    }
}

impl Matcher<MutexElement> for Atom {
    fn matches(&self, other: &MutexElement, bindings: &mut Bindings) -> bool {
        self.predicate == other.predicate
            && self.args.len() == other.pars.len()
            && self
                .args
                .iter()
                .zip(&other.pars)
                .all(|(arg, par)| arg.matches(par, bindings))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lifted_against_ground() {
        let mut task = task! {
            "on(a,b)."
            "on(a,a)."
            "q(Var_X) :- on(Var_X,Var_X)."
        };
        let lifted = task.rules[0].body[0].clone();
        let mut bindings = Bindings::new();
        assert!(!lifted.matches(&task.init[0], &mut bindings), "X=a, X=b");
        let mut bindings = Bindings::new();
        assert!(lifted.matches(&task.init[1], &mut bindings));
        let a = task.intern_object("a");
        assert_eq!(bindings.values().collect::<Vec<_>>(), [&a]);
        assert!(!task.init[1].matches(&lifted, &mut Bindings::new()), "right must be ground");
    }

    #[test]
    fn atom_against_mutex_element() {
        let task = task! {
            "pddl_type_block(a)."
            "mutexpred :- on(Var_counted_0_block, c), on(c, c)."
            "q :- on(Var_X,c), on(Var_Y,d), on(Var_Z,Var_Z)."
        };
        let [symbolic, constant] = &task.mutex_groups[0].elements[..] else {
            panic!("two elements expected");
        };
        let body = &task.rules[0].body;
        assert!(body[0].matches(symbolic, &mut Bindings::new()));
        assert!(!body[1].matches(symbolic, &mut Bindings::new()), "d vs c");
        assert!(body[2].matches(constant, &mut Bindings::new()), "Z=c twice");
        assert!(body[0].matches(constant, &mut Bindings::new()), "X=c");
    }
}
