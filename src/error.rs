//! Caller-facing misuse errors.
//!
//! Execution failures during replay are not errors at this level: they become
//! the `invalid` simulation outcome. Match exhaustion truncates the plan.
//! What remains are contract violations by the caller, reported as
//! `UsageError` and never recovered locally.
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("try_simulation needs to be called before {query}")]
    NotSimulated { query: &'static str },
    #[error("{query} requires a valid plan")]
    InvalidPlan { query: &'static str },
    #[error("no plan was given as input")]
    MissingPlan,
    #[error("the {matcher} matcher requires the planner result in {required} format")]
    UnsupportedEncoding {
        matcher: &'static str,
        required: &'static str,
    },
    #[error("plan line {line} is not an action: {text}")]
    MalformedAction { line: usize, text: String },
}
