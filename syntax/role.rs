//! Predicate roles. The planning front end encodes the meaning of a
//! predicate in its name; we decode it exactly once, when the predicate
//! is interned, and keep the result next to the name.

pub const ADD_PREFIX: &str = "addpred_";
pub const DELETE_PREFIX: &str = "delpred_";
pub const GUARANTEED_SUFFIX: &str = "__guaranteed";
pub const TYPE_PREFIX: &str = "pddl_type_";
pub const GOAL: &str = "goal__reachable";
pub const OBJECTIVE: &str = "optimization__criterion__fact";
pub const ACTIVATION_PREFIX: &str = "activate_pred_";
pub const ACTION_PREFIX: &str = "action_";
pub const MAX_MUTEX_PREFIX: &str = "max_mutex_pred";
pub const MIN_MUTEX_PREFIX: &str = "min_mutex_pred";
pub const MUTEX_PREFIX: &str = "mutexpred";
pub const UNIQUE_SUFFIX: &str = "_unique";
pub const RULE_HACK_PREFIX: &str = "handle_not_guaranteed_hack";
pub const MATCH_PREFIX: &str = "match_";
pub const FALSE: &str = "weird_false_pred";
pub const EXTENSION_PREFIX: &str = "tmp_ext_";
pub const NONE_PREFIX: &str = "none_of_mutexgroup_";
pub const NONE_TYPE: &str = "object";
pub const VARIABLE_PREFIX: &str = "Var_";
pub const COUNTED_PREFIX: &str = "Var_counted";

/// Which half of an effect a shadow predicate records.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Polarity {
    Add,
    Delete,
}

impl Polarity {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Add => ADD_PREFIX,
            Self::Delete => DELETE_PREFIX,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Add => Self::Delete,
            Self::Delete => Self::Add,
        }
    }
}

/// The semantic role of a predicate, derived from its name.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Role {
    Ordinary,
    Shadow(Polarity),
    Guaranteed(Polarity),
    Type,
    Goal,
    Objective,
    Activation,
    Action,
    MaxMutex,
    MinMutex,
    MutexDefinition { unique: bool },
    RuleHack,
    Match { group: usize, position: usize },
    False,
    Extension,
}

impl Role {
    /// The single place where naming conventions are interpreted.
    pub fn classify(name: &str) -> Self {
        if let Some((polarity, rest)) = shadow_prefix(name) {
            return if rest.ends_with(GUARANTEED_SUFFIX) {
                Self::Guaranteed(polarity)
            } else {
                Self::Shadow(polarity)
            };
        }
        if name.starts_with(TYPE_PREFIX) {
            return Self::Type;
        }
        if name.starts_with(GOAL) {
            return Self::Goal;
        }
        match name {
            OBJECTIVE => return Self::Objective,
            FALSE => return Self::False,
            _ => (),
        }
        if let Some((group, position)) = match_marker(name) {
            return Self::Match { group, position };
        }
        if name.starts_with(ACTIVATION_PREFIX) {
            Self::Activation
        } else if name.starts_with(ACTION_PREFIX) {
            Self::Action
        } else if name.starts_with(MAX_MUTEX_PREFIX) {
            Self::MaxMutex
        } else if name.starts_with(MIN_MUTEX_PREFIX) {
            Self::MinMutex
        } else if name.starts_with(MUTEX_PREFIX) {
            Self::MutexDefinition {
                unique: name.ends_with(UNIQUE_SUFFIX),
            }
        } else if name.starts_with(RULE_HACK_PREFIX) {
            Self::RuleHack
        } else if name.starts_with(EXTENSION_PREFIX) {
            Self::Extension
        } else {
            Self::Ordinary
        }
    }

    /// Add or delete, for plain and guaranteed shadows alike.
    pub fn polarity(self) -> Option<Polarity> {
        match self {
            Self::Shadow(p) | Self::Guaranteed(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_guaranteed(self) -> bool {
        matches!(self, Self::Guaranteed(_))
    }

    /// Plain (not yet guaranteed) add or delete shadow.
    pub fn is_plain_shadow(self) -> bool {
        matches!(self, Self::Shadow(_))
    }
}

fn shadow_prefix(name: &str) -> Option<(Polarity, &str)> {
    if let Some(rest) = name.strip_prefix(ADD_PREFIX) {
        Some((Polarity::Add, rest))
    } else {
        name.strip_prefix(DELETE_PREFIX)
            .map(|rest| (Polarity::Delete, rest))
    }
}

/// The name of the predicate shadowed by `name`, if any.
pub fn shadowed_name(name: &str) -> Option<(Polarity, &str)> {
    let (polarity, rest) = shadow_prefix(name)?;
    let original = rest.strip_suffix(GUARANTEED_SUFFIX).unwrap_or(rest);
    (!original.is_empty()).then_some((polarity, original))
}

/// The type name of a type predicate, e.g. `block` for `pddl_type_block`.
pub fn type_name(name: &str) -> Option<&str> {
    name.strip_prefix(TYPE_PREFIX)
}

fn match_marker(name: &str) -> Option<(usize, usize)> {
    let (group, position) = name.strip_prefix(MATCH_PREFIX)?.split_once('_')?;
    Some((group.parse().ok()?, position.parse().ok()?))
}

pub fn is_variable_name(name: &str) -> bool {
    name.starts_with(VARIABLE_PREFIX)
}

pub fn shadow_name(polarity: Polarity, original: &str) -> String {
    format!("{}{original}", polarity.prefix())
}

pub fn guaranteed_name(polarity: Polarity, original: &str) -> String {
    format!("{}{original}{GUARANTEED_SUFFIX}", polarity.prefix())
}

pub fn match_name(group: usize, position: usize) -> String {
    format!("{MATCH_PREFIX}{group}_{position}")
}

pub fn type_predicate_name(type_name: &str) -> String {
    format!("{TYPE_PREFIX}{type_name}")
}
