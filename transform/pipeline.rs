//! Named passes, the capabilities they need and promise, and the pipeline
//! that runs a checked sequence of them.

use std::fmt;
use std::str::FromStr;

use bitmask_enum::bitmask;

use relaxer_syntax::role::FALSE;
use relaxer_syntax::*;
use relaxer_tracer::{trace, Trace};

use crate::*;

/// Properties of a task that passes depend on.
#[bitmask]
pub enum Capability {
    MutexGroups,
    Annotated,
    Guaranteed,
    MutexBounds,
    Goal,
    Objective,
}

const CAPABILITY_NAMES: [(Capability, &str); 6] = [
    (Capability::MutexGroups, "MutexGroups"),
    (Capability::Annotated, "Annotated"),
    (Capability::Guaranteed, "Guaranteed"),
    (Capability::MutexBounds, "MutexBounds"),
    (Capability::Goal, "Goal"),
    (Capability::Objective, "Objective"),
];

impl Capability {
    /// What the task already has.
    pub fn detect(task: &DatalogTask) -> Self {
        let mut caps = Self::none();
        if !task.mutex_groups.is_empty() {
            caps = caps | Self::MutexGroups;
        }
        if task.lookup_predicate(FALSE).is_some() {
            caps = caps | Self::Annotated;
        }
        for (_, predicate) in task.predicates() {
            match predicate.role {
                Role::Guaranteed(_) => caps = caps | Self::Guaranteed,
                Role::MaxMutex => caps = caps | Self::MutexBounds,
                _ => (),
            }
        }
        for rule in &task.rules {
            match task.role(rule.head.predicate) {
                Role::Goal => caps = caps | Self::Goal,
                Role::Objective => caps = caps | Self::Objective,
                _ => (),
            }
        }
        caps
    }

    /// Comma-separated names of the set capabilities.
    pub fn describe(self) -> String {
        CAPABILITY_NAMES
            .iter()
            .filter(|(cap, _)| self.contains(*cap))
            .map(|(_, name)| *name)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// The capabilities in `self` that `available` lacks.
    pub fn missing_from(self, available: Self) -> Self {
        CAPABILITY_NAMES
            .iter()
            .filter(|(cap, _)| self.contains(*cap) && !available.contains(*cap))
            .fold(Self::none(), |missing, (cap, _)| missing | *cap)
    }
}

/// A named rewrite of the task.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Pass {
    None,
    Reducer,
    MutexFilter,
    MinizincConstraints,
    LinearizeActionTask,
    IntegrateAddDelRules,
    SupersetPars,
    BinarizeRules,
    AddMaxMutex,
    EqualizeGuaranteedAtoms,
    ExtendGoalRule,
    EqualizeAddGuaranteedAtoms,
    ReintegrateMutexRules,
    AddNoneRules,
    PrintGroundedMutexes,
    AddHackyZeroIfNotUnique,
    AddRepairActions,
    ZeroAryRelaxation,
    UnaryRelaxation,
    PrintDomain,
    PrintProblem,
}

impl Pass {
    pub const ALL: [Self; 21] = [
        Self::None,
        Self::Reducer,
        Self::MutexFilter,
        Self::MinizincConstraints,
        Self::LinearizeActionTask,
        Self::IntegrateAddDelRules,
        Self::SupersetPars,
        Self::BinarizeRules,
        Self::AddMaxMutex,
        Self::EqualizeGuaranteedAtoms,
        Self::ExtendGoalRule,
        Self::EqualizeAddGuaranteedAtoms,
        Self::ReintegrateMutexRules,
        Self::AddNoneRules,
        Self::PrintGroundedMutexes,
        Self::AddHackyZeroIfNotUnique,
        Self::AddRepairActions,
        Self::ZeroAryRelaxation,
        Self::UnaryRelaxation,
        Self::PrintDomain,
        Self::PrintProblem,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Reducer => "reducer",
            Self::MutexFilter => "mutex-filter",
            Self::MinizincConstraints => "minizinc-constraints",
            Self::LinearizeActionTask => "linearize-action-task",
            Self::IntegrateAddDelRules => "integrate-add-del-rules",
            Self::SupersetPars => "superset-pars",
            Self::BinarizeRules => "binarize-rules",
            Self::AddMaxMutex => "add-max-mutex",
            Self::EqualizeGuaranteedAtoms => "equalize-guaranteed-atoms",
            Self::ExtendGoalRule => "extend-goal-rule",
            Self::EqualizeAddGuaranteedAtoms => "equalize-add-guaranteed-atoms",
            Self::ReintegrateMutexRules => "reintegrate-mutex-rules",
            Self::AddNoneRules => "add-none-rules",
            Self::PrintGroundedMutexes => "print-grounded-mutexes",
            Self::AddHackyZeroIfNotUnique => "add-hacky-zero-if-not-unique",
            Self::AddRepairActions => "add-repair-actions",
            Self::ZeroAryRelaxation => "zero-ary-relaxation",
            Self::UnaryRelaxation => "unary-relaxation",
            Self::PrintDomain => "print-domain",
            Self::PrintProblem => "print-problem",
        }
    }

    pub fn requires(self) -> Capability {
        use Capability as C;
        match self {
            Self::ReintegrateMutexRules => C::Annotated,
            Self::AddMaxMutex => C::MutexGroups | C::Guaranteed,
            Self::ExtendGoalRule => C::Goal | C::Guaranteed | C::MutexBounds,
            Self::AddNoneRules | Self::AddHackyZeroIfNotUnique | Self::PrintGroundedMutexes => {
                C::MutexBounds
            }
            Self::EqualizeGuaranteedAtoms => C::Guaranteed,
            Self::AddRepairActions => C::Goal,
            Self::MinizincConstraints => C::Goal | C::Objective,
            _ => C::none(),
        }
    }

    pub fn produces(self) -> Capability {
        use Capability as C;
        match self {
            Self::MutexFilter => C::Annotated | C::Guaranteed,
            Self::ReintegrateMutexRules => C::Guaranteed | C::MutexBounds,
            Self::AddMaxMutex => C::MutexBounds,
            Self::ExtendGoalRule => C::Annotated,
            Self::AddNoneRules | Self::EqualizeAddGuaranteedAtoms => C::Guaranteed,
            _ => C::none(),
        }
    }

    /// Passes that select an emitter rather than rewriting the task.
    pub fn is_output(self) -> bool {
        matches!(
            self,
            Self::PrintDomain | Self::PrintProblem | Self::MinizincConstraints
        )
    }

    /// Rewrite the task in place.
    pub fn run(self, task: &mut DatalogTask, trace: Trace) -> Result<(), TransformError> {
        match self {
            Self::None | Self::MinizincConstraints | Self::PrintDomain | Self::PrintProblem => Ok(()),
            Self::Reducer => create_reducer(task, trace),
            Self::MutexFilter => mutex_filter(task, trace),
            Self::LinearizeActionTask => linearize_action_task(task, trace),
            Self::IntegrateAddDelRules => integrate_add_del_rules(task, trace),
            Self::SupersetPars => superset_pars(task, trace),
            Self::BinarizeRules => binarize_rules(task, trace),
            Self::AddMaxMutex => add_max_mutex(task, trace),
            Self::EqualizeGuaranteedAtoms => equalize_guaranteed_atoms(task, trace),
            Self::ExtendGoalRule => extend_goal_rule(task, trace),
            Self::EqualizeAddGuaranteedAtoms => equalize_add_guaranteed_atoms(task, trace),
            Self::ReintegrateMutexRules => reintegrate_mutex_rules(task, trace),
            Self::AddNoneRules => add_none_rules(task, trace),
            Self::PrintGroundedMutexes => print_grounded_mutexes(task, trace),
            Self::AddHackyZeroIfNotUnique => add_hacky_zero_if_not_unique(task, trace),
            Self::AddRepairActions => add_repair_actions(task, trace),
            Self::ZeroAryRelaxation => zero_ary_relaxation(task, trace),
            Self::UnaryRelaxation => unary_relaxation(task, trace),
        }
    }
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Pass {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|pass| pass.name() == s)
            .ok_or_else(|| TransformError::UnknownPass(s.to_owned()))
    }
}

/// A sequence of passes, run in order over one task.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Pipeline {
    passes: Vec<Pass>,
}

impl Pipeline {
    pub fn new(passes: impl IntoIterator<Item = Pass>) -> Self {
        Self {
            passes: passes.into_iter().collect(),
        }
    }

    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    /// Make sure every pass gets what it requires, counting both what the
    /// task already has and what earlier passes promise.
    pub fn check(&self, task: &DatalogTask) -> Result<(), TransformError> {
        let mut available = Capability::detect(task);
        for &pass in &self.passes {
            let missing = pass.requires().missing_from(available);
            if missing != Capability::none() {
                return Err(TransformError::MissingCapability {
                    pass,
                    missing: missing.describe(),
                });
            }
            available = available | pass.produces();
        }
        Ok(())
    }

    /// Normalize the task, check the sequence, run every pass (validating
    /// after each), then make sure there are enough variables for the
    /// widest predicate.
    pub fn run(&self, task: &mut DatalogTask, trace: Trace) -> Result<(), TransformError> {
        generalize_unique_objects(task, trace);
        self.check(task)?;
        for &pass in &self.passes {
            trace!(trace, Rewrite, "Running pass `{}`", pass);
            pass.run(task, trace)?;
            task.validate()?;
        }
        fill_variables(task);
        Ok(())
    }
}
