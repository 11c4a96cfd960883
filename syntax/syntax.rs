//! Syntactic elements of a grounded Datalog task: the shared intermediate
//! representation that every rewrite pass mutates, and the text format it
//! is read from and printed to.
//!
//! A task is a set of init facts, Horn rules, and mutex groups over
//! interned predicates, objects, and variables. Much of the meaning is
//! carried by naming conventions (see [`role`]); those are decoded once
//! per predicate when it is interned.

mod id;
mod lexer;
mod parser;
mod pretty;
pub mod role;
mod task;

pub use id::{Id, IdVec};
pub use lexer::{DatalogLexer, DatalogToken, Lex, Token};
pub use parser::{parse, DatalogParser, ParseError};
pub use pretty::{Named, Program};
pub use role::{Polarity, Role};
pub use task::{
    Atom, DatalogTask, MutexElement, MutexGroup, MutexPar, Object, ObjectId, Predicate,
    PredicateId, Rule, TaskError, Term, VarId, Variable,
};

/// Test helper macros.
///
/// This should be behind `#[cfg(test)]`, but [cargo can't
/// currently export test code across crates](https://github.com/rust-lang/cargo/issues/8379).
#[cfg(feature = "macros")]
mod macros {
    /// Parse a task or die trying.
    #[macro_export]
    macro_rules! task {
        ($($line: literal)*) => {
            $crate::parse(concat!($($line, "\n"),*)).expect("can't parse test task")
        };
    }

    /// Look up a predicate by name or die trying.
    #[macro_export]
    macro_rules! pred {
        ($task: expr, $name: literal) => {
            $task
                .lookup_predicate($name)
                .expect(concat!("no predicate `", $name, "`"))
        };
    }

    /// Print the rule at an index, e.g. `q(Var_X):-p(Var_X)`.
    #[macro_export]
    macro_rules! rule_text {
        ($task: expr, $index: expr) => {
            $task.named(&$task.rules[$index]).to_string()
        };
    }
}
