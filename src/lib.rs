//! Schist - the term core of a staged compiler
//!
//! Terms are hash-consed in a [`Store`]. On top of it sit free-variable
//! analysis, memoized type inference, two reduction modes (full evaluation
//! and staged compilation) and unification of quantified parameter types.

pub mod builtins;
pub mod config;
pub mod context;
pub mod dump;
pub mod errors;
pub mod eval;
pub mod free_vars;
pub mod infer;
pub mod store;
pub mod term;
pub mod test_support;
pub mod unify;

pub use builtins::{BuiltinRegistry, NativeFn, NativeFunction, ResultTypeFn};
pub use config::CoreConfig;
pub use context::{Context, Observed, Restriction};
pub use dump::{Dump, DumpLine};
pub use errors::{find_similar, levenshtein_distance, CoreError, CoreResult};
pub use eval::{compile, evaluate, reduce, Mode};
pub use free_vars::FreeVariables;
pub use infer::{infer_type, resolve_callee, ResolvedCallee};
pub use store::Store;
pub use term::{parse_numeric, Availability, Term, TermId, Usage, VarId};
pub use unify::unify_expected_to_arg;
