//! Linkage between original predicates and their guaranteed shadows.

use std::collections::{BTreeMap, BTreeSet};

use relaxer_syntax::*;

/// Built on demand from the predicate table; passes that create
/// guaranteed predicates must rebuild it (or [`insert`](Self::insert)).
#[derive(Clone, Debug, Default)]
pub struct GuaranteedRegistry {
    names: BTreeMap<String, PredicateId>,
    guaranteed: BTreeSet<PredicateId>,
    by_original: BTreeMap<(PredicateId, Polarity), PredicateId>,
    originals: BTreeMap<PredicateId, (Polarity, PredicateId)>,
}

impl GuaranteedRegistry {
    pub fn new(task: &DatalogTask) -> Self {
        let mut registry = Self::default();
        for (id, predicate) in task.predicates() {
            if predicate.role.is_guaranteed() {
                registry.insert(task, id);
            }
        }
        registry
    }

    /// Register one guaranteed predicate.
    pub fn insert(&mut self, task: &DatalogTask, id: PredicateId) {
        self.names.insert(task.name(id).to_owned(), id);
        self.guaranteed.insert(id);
        if let Some((polarity, original)) = task.shadowed(id) {
            self.by_original.insert((original, polarity), id);
            self.originals.insert(id, (polarity, original));
        }
    }

    pub fn lookup(&self, name: &str) -> Option<PredicateId> {
        self.names.get(name).copied()
    }

    pub fn is_guaranteed(&self, id: PredicateId) -> bool {
        self.guaranteed.contains(&id)
    }

    pub fn guaranteed(&self) -> impl Iterator<Item = PredicateId> + '_ {
        self.guaranteed.iter().copied()
    }

    /// The guaranteed predicate over the same original, opposite polarity.
    pub fn counterpart(&self, id: PredicateId) -> Option<PredicateId> {
        let (polarity, original) = self.originals.get(&id)?;
        self.of(*original, polarity.opposite())
    }

    /// The guaranteed shadow of `original` with the given polarity.
    pub fn of(&self, original: PredicateId, polarity: Polarity) -> Option<PredicateId> {
        self.by_original.get(&(original, polarity)).copied()
    }

    /// Whichever guaranteed shadow of `original` exists, preferring
    /// the delete variant.
    pub fn variant(&self, original: PredicateId) -> Option<PredicateId> {
        self.of(original, Polarity::Delete)
            .or_else(|| self.of(original, Polarity::Add))
    }

    /// The polarity and original predicate of a guaranteed shadow.
    pub fn original(&self, id: PredicateId) -> Option<(Polarity, PredicateId)> {
        self.originals.get(&id).copied()
    }
}
