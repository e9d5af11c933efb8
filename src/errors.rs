//! Errors raised by the term core, plus "did you mean?" suggestions.
//!
//! Every algorithm returns [`CoreResult`]; failures that older prototypes
//! aborted the process on are ordinary variants here.

use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

/// Failure of inference, reduction, unification or a native call.
///
/// Payloads carry rendered term text so a message can be printed without
/// access to the store. `Clone` lets the type cache memoize failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("unbound variable: {name}")]
    UnboundVariable { name: String },

    #[error("arity mismatch: expected at most {expected}, found {found}")]
    ArityMismatch { expected: usize, found: usize },

    #[error("cannot unify: expected {expected}, found {found}")]
    UnificationFailure { expected: String, found: String },

    #[error("cast from {from} to {to} is not implemented")]
    UncastableTypes { from: String, to: String },

    #[error("not yet implemented: {0}")]
    NotYetImplemented(&'static str),

    #[error("expected a function, found {found}")]
    NotAFunction { found: String },

    #[error("expected a product, found {found}")]
    NotAProduct { found: String },

    #[error("no field `{field}`{}", format_suggestions(.suggestions))]
    MissingField {
        field: String,
        suggestions: Vec<String>,
    },

    #[error("comptime argument {index} is not known at compile time")]
    ComptimeArgumentUnavailable { index: usize },

    #[error("value of `{name}` is not available yet")]
    ValueNotAvailable { name: String },

    #[error("variable `{name}` is already bound in this frame")]
    AlreadyBound { name: String },

    #[error("recursion limit of {limit} exceeded")]
    DepthExceeded { limit: usize },

    #[error("{name}: {message}")]
    Native { name: String, message: String },
}

fn format_suggestions(suggestions: &[String]) -> String {
    match suggestions {
        [] => String::new(),
        [only] => format!(" (did you mean `{}`?)", only),
        many => {
            let quoted: Vec<String> = many.iter().map(|s| format!("`{}`", s)).collect();
            format!(" (did you mean one of {}?)", quoted.join(", "))
        }
    }
}

// ============================================================================
// Suggestions
// ============================================================================

/// Edit distance between two strings, counted in chars
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// Up to three candidates within `max_distance` of `name`, closest first.
/// Exact matches are never suggested.
pub fn find_similar<'a>(
    name: &str,
    candidates: impl IntoIterator<Item = &'a str>,
    max_distance: usize,
) -> Vec<String> {
    let mut scored: Vec<(usize, &str)> = candidates
        .into_iter()
        .map(|c| (levenshtein_distance(name, c), c))
        .filter(|(dist, _)| *dist > 0 && *dist <= max_distance)
        .collect();
    scored.sort();
    scored.dedup();
    scored.into_iter().take(3).map(|(_, c)| c.to_string()).collect()
}
