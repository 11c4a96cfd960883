//! Matching and grounding over a [`DatalogTask`]: one-sided unification of
//! lifted atoms against facts and mutex elements, substitution of bindings,
//! and the lookup structures the rewrite passes share.

mod facts;
mod groundable;
mod guaranteed;
mod matcher;
mod mutex;

use std::collections::BTreeMap;

use relaxer_syntax::*;

// Re-exports.
pub use facts::FactIndex;
pub use groundable::Groundable;
pub use guaranteed::GuaranteedRegistry;
pub use matcher::Matcher;
pub use mutex::{MutexMatch, MutexMatcher};

/// Map variables to the objects they are bound to.
pub type Bindings = BTreeMap<VarId, ObjectId>;
