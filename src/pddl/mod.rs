//! PDDL execution engine.
//!
//! Parses domain and problem text into owned values and exposes the small
//! capability surface the matchers and the evaluator are written against:
//! initial state, applicable-action enumeration, applicability checks,
//! execution, and formula satisfaction. States are immutable; execution
//! always returns a fresh successor.
//!
//! Supported: STRIPS with typing, constants, negative/disjunctive/quantified
//! preconditions, equality, conditional and universal effects. Numeric
//! fluents, durative actions, and derived predicates are rejected at parse
//! time rather than silently ignored.
mod action;
mod domain;
mod problem;
pub(crate) mod sexpr;
mod state;
mod syntax;
mod world;

pub(crate) use action::is_comment_or_blank;
pub use action::{parse_action_line, parse_plan, Action};
pub use domain::{ActionSchema, Domain};
pub use problem::Problem;
pub use state::{Atom, State};
pub use syntax::{AtomPattern, Effect, Formula, Term, TypedName};
pub use world::World;

use thiserror::Error;

/// Malformed or unsupported PDDL text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PddlError {
    #[error("syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("malformed {context}: {message}")]
    Malformed {
        context: &'static str,
        message: String,
    },
    #[error("unsupported PDDL feature: {0}")]
    Unsupported(String),
}

/// Reason a ground action could not be executed in a state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecError {
    #[error("unknown action {name:?}")]
    UnknownAction { name: String },
    #[error("{action}: expected {expected} arguments, found {found}")]
    ArityMismatch {
        action: String,
        expected: usize,
        found: usize,
    },
    #[error("{action}: unknown object {object:?}")]
    UnknownObject { action: String, object: String },
    #[error("{action}: object {object:?} is not of type {expected}")]
    TypeMismatch {
        action: String,
        object: String,
        expected: String,
    },
    #[error("{action}: precondition not satisfied")]
    PreconditionUnsatisfied { action: String },
    #[error("{action}: unbound variable {variable} in effect")]
    UnboundVariable { action: String, variable: String },
}

pub(crate) fn malformed(context: &'static str, message: impl Into<String>) -> PddlError {
    PddlError::Malformed {
        context,
        message: message.into(),
    }
}
