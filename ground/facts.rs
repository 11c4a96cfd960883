//! Init facts indexed by predicate and argument list.

use std::collections::BTreeMap;

use relaxer_syntax::*;

use super::{Bindings, Matcher as _};

/// Where each init fact lives in `DatalogTask::init`. Duplicate facts
/// resolve to their first occurrence.
#[derive(Clone, Debug, Default)]
pub struct FactIndex {
    facts: BTreeMap<PredicateId, BTreeMap<Vec<Term>, usize>>,
}

impl FactIndex {
    pub fn new(init: &[Atom]) -> Self {
        let mut facts = BTreeMap::<_, BTreeMap<_, _>>::new();
        for (i, atom) in init.iter().enumerate() {
            facts
                .entry(atom.predicate)
                .or_default()
                .entry(atom.args.clone())
                .or_insert(i);
        }
        Self { facts }
    }

    pub fn position(&self, predicate: PredicateId, args: &[Term]) -> Option<usize> {
        self.facts.get(&predicate)?.get(args).copied()
    }

    pub fn contains(&self, predicate: PredicateId, args: &[Term]) -> bool {
        self.position(predicate, args).is_some()
    }

    /// The argument lists of a predicate's facts, in sorted order.
    pub fn args(&self, predicate: PredicateId) -> impl Iterator<Item = &[Term]> {
        self.facts
            .get(&predicate)
            .into_iter()
            .flat_map(|facts| facts.keys().map(Vec::as_slice))
    }

    pub fn count(&self, predicate: PredicateId) -> usize {
        self.facts.get(&predicate).map_or(0, BTreeMap::len)
    }

    /// Bindings for every fact the lifted `pattern` matches.
    pub fn matching<'a>(&'a self, pattern: &'a Atom) -> impl Iterator<Item = Bindings> + 'a {
        self.args(pattern.predicate).filter_map(|args| {
            let mut bindings = Bindings::new();
            pattern.args[..]
                .matches(args, &mut bindings)
                .then_some(bindings)
        })
    }
}
