//! Plan alignment and validation.
//!
//! A language model asked to plan in a PDDL domain tends to produce plans
//! that almost fit: misspelled actions, invented objects, steps in an order
//! the state does not allow. This crate repairs such a plan into the closest
//! executable one (`matcher`) and replays it to classify it as valid,
//! goal-reaching, and safe (`evaluator`).
pub mod config;
pub mod error;
pub mod evaluator;
pub mod matcher;
pub mod pddl;
pub mod planner_result;
pub mod projection;
pub mod similarity;
pub mod summary;
