//! Mutex filtering: decide which add and delete effects of a rule are
//! guaranteed to change the state, and annotate the rest.
//!
//! An add effect `addpred_p(..)` is guaranteed when some precondition of
//! the same rule matches an element of a shared mutex group that provably
//! differs from the element the effect instantiates: the precondition is
//! true when the rule fires, so the mutex forbids the effect atom from
//! already being true. A delete effect is guaranteed when the deleted atom
//! is literally a precondition, or by the same mutex argument.
//!
//! Guaranteed effects are rewritten to their `__guaranteed` shadows.
//! Every other effect is replaced by a fresh rule-hack atom, and a hack
//! rule `hack :- effect, false, match_g_p, ...` records the effect and the
//! mutex elements it matched, for a later pass to act on.

use std::collections::{BTreeMap, BTreeSet};

use relaxer_ground::{MutexMatch, MutexMatcher};
use relaxer_syntax::role::{match_name, FALSE, GUARANTEED_SUFFIX, RULE_HACK_PREFIX};
use relaxer_syntax::*;
use relaxer_tracer::{trace, Trace};

use crate::{next_index, TransformError};

/// What the init facts say about which arguments can never coincide.
#[derive(Clone, Debug, Default)]
pub struct Distinctness {
    /// Predicates whose facts always have pairwise distinct arguments.
    all_distinct: BTreeSet<PredicateId>,
    /// Position pairs `(i, j)`, `i < j`, that never hold the same
    /// object in any fact of the predicate.
    positions: BTreeSet<(PredicateId, usize, usize)>,
    /// Variable pairs proven distinct by the current rule's preconditions.
    variables: BTreeSet<(VarId, VarId)>,
}

impl Distinctness {
    pub fn new(task: &DatalogTask) -> Self {
        let mut all_distinct = task.predicates().map(|(id, _)| id).collect::<BTreeSet<_>>();
        for fact in &task.init {
            if !pairwise_distinct(&fact.args) {
                all_distinct.remove(&fact.predicate);
            }
        }

        let mut positions = BTreeSet::new();
        for (id, predicate) in task.predicates() {
            if all_distinct.contains(&id) {
                continue;
            }
            for i in 0..predicate.arity {
                for j in i + 1..predicate.arity {
                    if !task.facts_of(id).any(|f| f.args[i] == f.args[j]) {
                        positions.insert((id, i, j));
                    }
                }
            }
        }

        Self {
            all_distinct,
            positions,
            variables: BTreeSet::new(),
        }
    }

    /// Record the variable pairs a rule's preconditions keep apart.
    pub fn with_preconditions<'a>(mut self, preconditions: impl IntoIterator<Item = &'a Atom>) -> Self {
        self.variables.clear();
        for atom in preconditions {
            let all = self.all_distinct.contains(&atom.predicate);
            for (i, s) in atom.args.iter().enumerate() {
                for (j, t) in atom.args.iter().enumerate().skip(i + 1) {
                    let (Term::Variable(u), Term::Variable(v)) = (s, t) else {
                        continue;
                    };
                    if u != v && (all || self.positions.contains(&(atom.predicate, i, j))) {
                        self.variables.insert((*u.min(v), *u.max(v)));
                    }
                }
            }
        }
        self
    }

    pub fn is_distinct_predicate(&self, predicate: PredicateId) -> bool {
        self.all_distinct.contains(&predicate)
    }

    pub fn are_distinct(&self, u: VarId, v: VarId) -> bool {
        self.variables.contains(&(u.min(v), u.max(v)))
    }

    /// Whether two terms at a counted position denote different objects.
    /// Two variables only do when the preconditions prove it; a constant
    /// against a variable counts as different.
    fn differ(&self, s: &Term, t: &Term) -> bool {
        match (s, t) {
            (Term::Variable(u), Term::Variable(v)) => u != v && self.are_distinct(*u, *v),
            _ => s != t,
        }
    }
}

fn pairwise_distinct(args: &[Term]) -> bool {
    args.iter()
        .enumerate()
        .all(|(i, s)| args[i + 1..].iter().all(|t| s != t))
}

/// Whether atoms `a` and `b`, matched to elements `ma` and `mb` of the
/// same group, instantiate provably different elements: either different
/// predicates, or the same enumerated bindings with some counted
/// parameter bound differently.
pub fn different_elements(
    matcher: &MutexMatcher,
    a: &Atom,
    ma: MutexMatch,
    b: &Atom,
    mb: MutexMatch,
    distinctness: &Distinctness,
) -> bool {
    if matcher.element(ma).predicate != matcher.element(mb).predicate {
        return true;
    }

    let enumerated_a = matcher.parameter_bindings(a, ma, true);
    let enumerated_b = matcher.parameter_bindings(b, mb, true);
    let agree = enumerated_a
        .iter()
        .all(|(par, s)| enumerated_b.get(par).map_or(true, |t| s == t));
    if !agree {
        return false;
    }

    let counted_a = matcher.parameter_bindings(a, ma, false);
    let counted_b = matcher.parameter_bindings(b, mb, false);
    counted_a.iter().any(|(par, s)| {
        par.is_counted()
            && counted_b
                .get(par)
                .map_or(false, |t| distinctness.differ(s, t))
    })
}

/// Whether some precondition sharing a mutex group with `atom` proves
/// the two different.
fn mutex_guarantees(
    matcher: &MutexMatcher,
    atom: &Atom,
    matches: &[MutexMatch],
    preconditions: &[(&Atom, Vec<MutexMatch>)],
    distinctness: &Distinctness,
) -> bool {
    matches.iter().any(|&m| {
        preconditions.iter().any(|(pre, pre_matches)| {
            pre_matches
                .iter()
                .filter(|pm| pm.group == m.group)
                .any(|&pm| different_elements(matcher, atom, m, pre, pm, distinctness))
        })
    })
}

/// Rewrite every rule's effects into guaranteed shadows or hack atoms.
/// Hack rules themselves are left alone, so filtering twice changes
/// nothing.
pub fn mutex_filter(task: &mut DatalogTask, trace: Trace) -> Result<(), TransformError> {
    let matcher = MutexMatcher::new(&task.mutex_groups);
    let mut distinctness = Distinctness::new(task);
    let false_pred = task.intern_predicate(FALSE, 0)?;
    let false_atom = Atom::new(false_pred, []);
    let mut next_hack = next_index(task, RULE_HACK_PREFIX);
    let mut hack_rules = Vec::new();
    let mut markers = BTreeSet::new();

    for r in 0..task.rules.len() {
        if task.role(task.rules[r].head.predicate) == Role::RuleHack {
            continue;
        }
        let body = task.rules[r].body.clone();
        let mut effects = BTreeMap::<Polarity, Vec<(Atom, PredicateId)>>::new();
        let mut preconditions = Vec::new();
        for atom in &body {
            match (task.role(atom.predicate), task.shadowed(atom.predicate)) {
                (Role::Shadow(_), Some((polarity, original))) => effects
                    .entry(polarity)
                    .or_default()
                    .push((atom.clone(), original)),
                _ => preconditions.push(atom),
            }
        }
        if effects.is_empty() {
            continue;
        }

        distinctness = distinctness.with_preconditions(preconditions.iter().copied());
        let matched = preconditions
            .iter()
            .map(|&pre| (pre, matcher.matches(pre)))
            .collect::<Vec<_>>();

        let mut new_body = preconditions.iter().map(|&a| a.clone()).collect::<Vec<_>>();
        for polarity in [Polarity::Add, Polarity::Delete] {
            for (atom, original) in effects.remove(&polarity).unwrap_or_default() {
                let translated = Atom::new(original, atom.args.iter().copied());
                let matches = matcher.matches(&translated);
                let literal = polarity == Polarity::Delete
                    && preconditions.iter().any(|pre| **pre == translated);
                let guaranteed = literal
                    || mutex_guarantees(&matcher, &translated, &matches, &matched, &distinctness);

                if guaranteed {
                    let name = format!("{}{GUARANTEED_SUFFIX}", task.name(atom.predicate));
                    let arity = task.arity(atom.predicate);
                    let predicate = task.intern_predicate(&name, arity)?;
                    trace!(trace, Filter, "Rule {}: `{}` is guaranteed", r, task.named(&atom));
                    new_body.push(Atom::new(predicate, atom.args));
                    continue;
                }

                let hack = loop {
                    let name = format!("{RULE_HACK_PREFIX}{next_hack}");
                    next_hack += 1;
                    if task.lookup_predicate(&name).is_none() {
                        break task.intern_predicate(&name, 0)?;
                    }
                };
                trace!(trace, Filter, "Rule {}: `{}` is not guaranteed, annotated by `{}`", r, task.named(&atom), task.name(hack));
                let mut hack_body = vec![atom, false_atom.clone()];
                for m in matches {
                    let marker = task.intern_predicate(&match_name(m.group, m.position), 0)?;
                    markers.insert(marker);
                    hack_body.push(Atom::new(marker, []));
                }
                let hack_atom = Atom::new(hack, []);
                markers.insert(hack);
                hack_rules.push(Rule::new(hack_atom.clone(), hack_body));
                new_body.push(hack_atom);
            }
        }
        task.rules[r].body = new_body;
    }

    task.rules.extend(hack_rules);
    for marker in markers {
        if task.facts_of(marker).next().is_none() {
            task.init.push(Atom::new(marker, []));
        }
    }
    Ok(())
}
