//! Which mutex elements an atom can be an instance of.

use std::collections::BTreeMap;

use relaxer_syntax::*;

use super::{Bindings, Matcher as _};

/// A (group, position-within-group) pair.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct MutexMatch {
    pub group: usize,
    pub position: usize,
}

impl MutexMatch {
    pub fn new(group: usize, position: usize) -> Self {
        Self { group, position }
    }
}

/// An index from predicates to the mutex elements headed by them.
#[derive(Clone, Debug)]
pub struct MutexMatcher {
    groups: Vec<MutexGroup>,
    index: BTreeMap<PredicateId, Vec<MutexMatch>>,
}

impl MutexMatcher {
    pub fn new(groups: &[MutexGroup]) -> Self {
        let mut index = BTreeMap::<_, Vec<_>>::new();
        for (g, group) in groups.iter().enumerate() {
            for (p, element) in group.elements.iter().enumerate() {
                index
                    .entry(element.predicate)
                    .or_default()
                    .push(MutexMatch::new(g, p));
            }
        }
        Self {
            groups: groups.to_vec(),
            index,
        }
    }

    pub fn group(&self, group: usize) -> &MutexGroup {
        &self.groups[group]
    }

    pub fn element(&self, m: MutexMatch) -> &MutexElement {
        &self.groups[m.group].elements[m.position]
    }

    /// Elements headed by a predicate, whether or not they match.
    pub fn candidates(&self, predicate: PredicateId) -> &[MutexMatch] {
        self.index.get(&predicate).map_or(&[], Vec::as_slice)
    }

    pub fn can_match(&self, atom: &Atom, m: MutexMatch) -> bool {
        atom.matches(self.element(m), &mut Bindings::new())
    }

    /// Every element the atom can be an instance of, in (group, position) order.
    pub fn matches(&self, atom: &Atom) -> Vec<MutexMatch> {
        self.candidates(atom.predicate)
            .iter()
            .copied()
            .filter(|&m| self.can_match(atom, m))
            .collect()
    }

    /// Map the matched element's parameters to the atom's arguments:
    /// the enumerated (symbolic, non-counted) parameters, or else the
    /// counted and constant ones. The first occurrence of a parameter wins.
    pub fn parameter_bindings(
        &self,
        atom: &Atom,
        m: MutexMatch,
        enumerated: bool,
    ) -> BTreeMap<MutexPar, Term> {
        let mut bindings = BTreeMap::new();
        for (par, arg) in self.element(m).pars.iter().zip(&atom.args) {
            if par.is_enumerated() == enumerated {
                bindings.entry(*par).or_insert(*arg);
            }
        }
        bindings
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn matches() {
        let task = task! {
            "pddl_type_block(a)."
            "mutexpred_unique :- on(Var_enumerated_0_block, Var_counted_1_block), clear(Var_enumerated_0_block)."
            "mutexpred :- on(a, Var_counted_1_block)."
            "q :- on(a,Var_Y), on(b,Var_Y), clear(b), holding(a)."
        };
        let matcher = MutexMatcher::new(&task.mutex_groups);
        let body = &task.rules[0].body;
        assert_eq!(
            matcher.candidates(pred!(task, "on")),
            [MutexMatch::new(0, 0), MutexMatch::new(1, 0)]
        );
        assert_eq!(
            matcher.matches(&body[0]),
            [MutexMatch::new(0, 0), MutexMatch::new(1, 0)]
        );
        assert_eq!(matcher.matches(&body[1]), [MutexMatch::new(0, 0)], "b vs a");
        assert_eq!(matcher.matches(&body[2]), [MutexMatch::new(0, 1)]);
        assert!(matcher.matches(&body[3]).is_empty());
    }

    #[test]
    fn parameter_bindings() {
        let task = task! {
            "pddl_type_block(a)."
            "mutexpred :- on(Var_enumerated_0_block, Var_counted_1_block, c)."
            "q :- on(a,Var_Y,c)."
        };
        let matcher = MutexMatcher::new(&task.mutex_groups);
        let atom = &task.rules[0].body[0];
        let m = MutexMatch::new(0, 0);
        let enumerated = matcher.parameter_bindings(atom, m, true);
        assert_eq!(enumerated.values().collect::<Vec<_>>(), [&atom.args[0]]);
        let counted = matcher.parameter_bindings(atom, m, false);
        assert_eq!(counted.len(), 2);
        assert!(counted.values().any(|t| *t == atom.args[1]));
        assert!(counted.values().any(|t| *t == atom.args[2]));
    }
}
