//! The intermediate representation shared by every pass: an arena of
//! interned predicates, objects, and variables, plus the facts, rules,
//! and mutex groups that refer to them by ID.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::id::{Id, IdVec};
use crate::role::{self, is_variable_name, shadowed_name, Polarity, Role};

/// An interned predicate. Its role is decoded from the name once.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Predicate {
    pub name: String,
    pub arity: usize,
    pub role: Role,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Object {
    pub name: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Variable {
    pub name: String,
}

pub type PredicateId = Id<Predicate>;
pub type ObjectId = Id<Object>;
pub type VarId = Id<Variable>;

/// An atom argument.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Term {
    Variable(VarId),
    Constant(ObjectId),
}

impl Term {
    pub fn is_variable(&self) -> bool {
        matches!(self, Self::Variable(_))
    }

    pub fn variable(&self) -> Option<VarId> {
        match self {
            Self::Variable(v) => Some(*v),
            Self::Constant(_) => None,
        }
    }

    pub fn constant(&self) -> Option<ObjectId> {
        match self {
            Self::Variable(_) => None,
            Self::Constant(c) => Some(*c),
        }
    }
}

/// A predicate applied to one term per parameter position.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Atom {
    pub predicate: PredicateId,
    pub args: Vec<Term>,
}

impl Atom {
    pub fn new(predicate: PredicateId, args: impl IntoIterator<Item = Term>) -> Self {
        Self {
            predicate,
            args: args.into_iter().collect(),
        }
    }

    /// The distinct variables of this atom in order of first occurrence.
    pub fn variables(&self) -> Vec<VarId> {
        let mut vars = Vec::new();
        for v in self.args.iter().filter_map(Term::variable) {
            if !vars.contains(&v) {
                vars.push(v);
            }
        }
        vars
    }

    pub fn is_ground(&self) -> bool {
        !self.args.iter().any(Term::is_variable)
    }
}

/// A Horn clause. An empty body makes the head unconditionally true.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Rule {
    pub head: Atom,
    pub body: Vec<Atom>,
}

impl Rule {
    pub fn new(head: Atom, body: impl IntoIterator<Item = Atom>) -> Self {
        Self {
            head,
            body: body.into_iter().collect(),
        }
    }
}

/// A mutex element parameter. Symbolic parameters carry the number
/// decoded from their variable name, whether they are counted, and
/// the type predicate they range over.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum MutexPar {
    Constant(ObjectId),
    Variable {
        number: usize,
        counted: bool,
        domain: PredicateId,
    },
}

impl MutexPar {
    pub fn is_counted(&self) -> bool {
        matches!(self, Self::Variable { counted: true, .. })
    }

    /// A symbolic, non-counted parameter.
    pub fn is_enumerated(&self) -> bool {
        matches!(self, Self::Variable { counted: false, .. })
    }
}

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct MutexElement {
    pub predicate: PredicateId,
    pub pars: Vec<MutexPar>,
}

/// Mutually exclusive instantiations. A unique group admits at most
/// one true element; otherwise at most one assignment of the counted
/// variables holds per assignment of the enumerated ones.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct MutexGroup {
    pub elements: Vec<MutexElement>,
    pub unique: bool,
}

/// Violations of the IR's structural invariants.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum TaskError {
    #[error("arity mismatch: `{predicate}` has arity {expected} but is used with {found} arguments")]
    ArityMismatch {
        predicate: String,
        expected: usize,
        found: usize,
    },
    #[error("unresolved predicate `{name}`")]
    UnresolvedPredicate { name: String },
}

/// A grounded Datalog task: the arena plus everything that refers into it.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DatalogTask {
    predicates: IdVec<Predicate>,
    objects: IdVec<Object>,
    variables: IdVec<Variable>,
    predicate_names: BTreeMap<String, PredicateId>,
    object_names: BTreeMap<String, ObjectId>,
    variable_names: BTreeMap<String, VarId>,
    type_predicates: BTreeMap<String, PredicateId>,
    add_shadows: BTreeMap<PredicateId, PredicateId>,
    delete_shadows: BTreeMap<PredicateId, PredicateId>,
    pub init: Vec<Atom>,
    pub rules: Vec<Rule>,
    pub mutex_groups: Vec<MutexGroup>,
}

impl DatalogTask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up or create a predicate. A first-seen shadow predicate also
    /// resolves (possibly creating) the predicate it shadows and records
    /// the link; a type predicate is recorded under its type name.
    pub fn intern_predicate(&mut self, name: &str, arity: usize) -> Result<PredicateId, TaskError> {
        if let Some(&id) = self.predicate_names.get(name) {
            let expected = self.predicates[id].arity;
            if expected != arity {
                return Err(TaskError::ArityMismatch {
                    predicate: name.to_owned(),
                    expected,
                    found: arity,
                });
            }
            return Ok(id);
        }

        let role = Role::classify(name);
        let id = self.predicates.push(Predicate {
            name: name.to_owned(),
            arity,
            role,
        });
        self.predicate_names.insert(name.to_owned(), id);
        if let Some(type_name) = role::type_name(name) {
            self.type_predicates.insert(type_name.to_owned(), id);
        }
        if let Some((polarity, original)) = shadowed_name(name) {
            let original = self.intern_predicate(original, arity)?;
            match polarity {
                Polarity::Add => self.add_shadows.insert(id, original),
                Polarity::Delete => self.delete_shadows.insert(id, original),
            };
        }
        Ok(id)
    }

    pub fn intern_object(&mut self, name: &str) -> ObjectId {
        if let Some(&id) = self.object_names.get(name) {
            return id;
        }
        let id = self.objects.push(Object {
            name: name.to_owned(),
        });
        self.object_names.insert(name.to_owned(), id);
        id
    }

    pub fn intern_variable(&mut self, name: &str) -> VarId {
        if let Some(&id) = self.variable_names.get(name) {
            return id;
        }
        let id = self.variables.push(Variable {
            name: name.to_owned(),
        });
        self.variable_names.insert(name.to_owned(), id);
        id
    }

    /// Intern an argument, deciding variable vs. constant by name.
    pub fn intern_term(&mut self, name: &str) -> Term {
        if is_variable_name(name) {
            Term::Variable(self.intern_variable(name))
        } else {
            Term::Constant(self.intern_object(name))
        }
    }

    pub fn predicate(&self, id: PredicateId) -> &Predicate {
        &self.predicates[id]
    }

    pub fn object(&self, id: ObjectId) -> &Object {
        &self.objects[id]
    }

    pub fn variable(&self, id: VarId) -> &Variable {
        &self.variables[id]
    }

    pub fn predicates(&self) -> impl Iterator<Item = (PredicateId, &Predicate)> {
        self.predicates.iter()
    }

    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &Object)> {
        self.objects.iter()
    }

    pub fn variables(&self) -> impl Iterator<Item = (VarId, &Variable)> {
        self.variables.iter()
    }

    pub fn predicate_count(&self) -> usize {
        self.predicates.len()
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    pub fn role(&self, id: PredicateId) -> Role {
        self.predicates[id].role
    }

    pub fn name(&self, id: PredicateId) -> &str {
        &self.predicates[id].name
    }

    pub fn arity(&self, id: PredicateId) -> usize {
        self.predicates[id].arity
    }

    pub fn lookup_predicate(&self, name: &str) -> Option<PredicateId> {
        self.predicate_names.get(name).copied()
    }

    pub fn require_predicate(&self, name: &str) -> Result<PredicateId, TaskError> {
        self.lookup_predicate(name)
            .ok_or_else(|| TaskError::UnresolvedPredicate {
                name: name.to_owned(),
            })
    }

    pub fn type_predicate(&self, type_name: &str) -> Option<PredicateId> {
        self.type_predicates.get(type_name).copied()
    }

    pub fn type_predicates(&self) -> impl Iterator<Item = (&str, PredicateId)> {
        self.type_predicates.iter().map(|(t, &p)| (t.as_str(), p))
    }

    /// The predicate shadowed by `id`, with the shadow's polarity.
    pub fn shadowed(&self, id: PredicateId) -> Option<(Polarity, PredicateId)> {
        if let Some(&original) = self.add_shadows.get(&id) {
            Some((Polarity::Add, original))
        } else {
            self.delete_shadows
                .get(&id)
                .map(|&original| (Polarity::Delete, original))
        }
    }

    pub fn add_shadows(&self) -> impl Iterator<Item = (PredicateId, PredicateId)> + '_ {
        self.add_shadows.iter().map(|(&s, &o)| (s, o))
    }

    pub fn delete_shadows(&self) -> impl Iterator<Item = (PredicateId, PredicateId)> + '_ {
        self.delete_shadows.iter().map(|(&s, &o)| (s, o))
    }

    /// Change a predicate's arity. Callers must rewrite every atom
    /// over it before the next [`validate`](Self::validate).
    pub fn set_arity(&mut self, id: PredicateId, arity: usize) {
        self.predicates[id].arity = arity;
    }

    /// Variables `0..n` as an argument list. Passes that need canonical
    /// parameters use these; [`ensure_variables`](Self::ensure_variables)
    /// makes sure they exist.
    pub fn canonical_args(&mut self, n: usize) -> Vec<Term> {
        self.ensure_variables(n);
        (0..n).map(|i| Term::Variable(VarId::new(i))).collect()
    }

    /// Fill the variable table with fresh names until it holds `n` entries.
    pub fn ensure_variables(&mut self, n: usize) {
        let mut i = 0;
        while self.variables.len() < n {
            let name = format!("Var_tmp_created_{i}");
            if !self.variable_names.contains_key(&name) {
                self.intern_variable(&name);
            }
            i += 1;
        }
    }

    pub fn max_arity(&self) -> usize {
        self.predicates
            .iter()
            .map(|(_, p)| p.arity)
            .max()
            .unwrap_or(0)
    }

    /// Init facts of a predicate, in order.
    pub fn facts_of(&self, id: PredicateId) -> impl Iterator<Item = &Atom> {
        self.init.iter().filter(move |a| a.predicate == id)
    }

    /// Check the structural invariants: every atom and mutex element
    /// agrees with its predicate's arity, and every reference resolves.
    pub fn validate(&self) -> Result<(), TaskError> {
        for atom in self
            .init
            .iter()
            .chain(self.rules.iter().flat_map(|r| std::iter::once(&r.head).chain(&r.body)))
        {
            self.check_arity(atom.predicate, atom.args.len())?;
            for arg in &atom.args {
                let resolved = match arg {
                    Term::Variable(v) => self.variables.contains(*v),
                    Term::Constant(c) => self.objects.contains(*c),
                };
                if !resolved {
                    return Err(TaskError::UnresolvedPredicate {
                        name: self.name(atom.predicate).to_owned(),
                    });
                }
            }
        }
        for element in self.mutex_groups.iter().flat_map(|g| &g.elements) {
            self.check_arity(element.predicate, element.pars.len())?;
        }
        for (shadow, original) in self.add_shadows().chain(self.delete_shadows()) {
            if !self.predicates.contains(original)
                || (self.add_shadows.contains_key(&shadow)
                    && self.delete_shadows.contains_key(&shadow))
            {
                return Err(TaskError::UnresolvedPredicate {
                    name: self.name(shadow).to_owned(),
                });
            }
        }
        Ok(())
    }

    fn check_arity(&self, id: PredicateId, found: usize) -> Result<(), TaskError> {
        let predicate = self
            .predicates
            .get(id)
            .ok_or_else(|| TaskError::UnresolvedPredicate {
                name: format!("{id:?}"),
            })?;
        if predicate.arity != found {
            return Err(TaskError::ArityMismatch {
                predicate: predicate.name.clone(),
                expected: predicate.arity,
                found,
            });
        }
        Ok(())
    }
}
