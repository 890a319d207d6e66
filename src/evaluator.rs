//! Plan replay and classification.
//!
//! An evaluator owns one aligned plan. `try_simulation` replays it once from
//! the initial state and freezes the outcome; the queries then read that
//! outcome. Queries before simulation are usage errors. `is_successful` and
//! `is_safe` answer `None` for an invalid plan so that "did not execute" is
//! never reported as "executed and failed".
use crate::error::UsageError;
use crate::pddl::{parse_plan, Action, ExecError, PddlError, State, World};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;

/// Why a replay stopped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplayFailure {
    #[error("plan line {line}: {error}")]
    Unparseable { line: usize, error: PddlError },
    #[error("step {step}: {error}")]
    Inexecutable { step: usize, error: ExecError },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Simulation {
    Unevaluated,
    /// Initial state plus one state per executed action.
    Valid { trajectory: Vec<State> },
    Invalid { failure: ReplayFailure },
}

/// The persisted result record. `successful` and `safe` are present exactly
/// when `valid` is true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EvaluationResult {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub successful: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe: Option<bool>,
}

pub struct PlanEvaluator {
    world: World,
    plan: Result<Vec<Action>, ReplayFailure>,
    simulation: Simulation,
}

impl PlanEvaluator {
    pub fn new(
        domain_text: &str,
        problem_text: &str,
        plan_text: &str,
    ) -> Result<Self, PddlError> {
        Ok(Self::from_world(
            World::parse(domain_text, problem_text)?,
            plan_text,
        ))
    }

    /// A plan line that is not an action does not fail construction; it
    /// makes the plan invalid once simulated.
    pub fn from_world(world: World, plan_text: &str) -> Self {
        let plan = parse_plan(plan_text)
            .map_err(|(line, error)| ReplayFailure::Unparseable { line, error });
        Self {
            world,
            plan,
            simulation: Simulation::Unevaluated,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    /// Replay the plan and return whether it is valid. Later calls return the
    /// recorded outcome without replaying.
    pub fn try_simulation(&mut self) -> bool {
        if self.simulation == Simulation::Unevaluated {
            let start = Instant::now();
            self.simulation = match &self.plan {
                Ok(actions) => match replay(&self.world, actions) {
                    Ok(trajectory) => Simulation::Valid { trajectory },
                    Err(failure) => Simulation::Invalid { failure },
                },
                Err(failure) => Simulation::Invalid {
                    failure: failure.clone(),
                },
            };
            match &self.simulation {
                Simulation::Invalid { failure } => {
                    tracing::info!(elapsed_ms = start.elapsed().as_millis(), %failure, "plan invalid");
                }
                _ => {
                    tracing::info!(
                        elapsed_ms = start.elapsed().as_millis(),
                        steps = self.plan.as_ref().map_or(0, Vec::len),
                        "plan valid"
                    );
                }
            }
        }
        matches!(self.simulation, Simulation::Valid { .. })
    }

    pub fn is_valid(&self) -> Result<bool, UsageError> {
        match &self.simulation {
            Simulation::Unevaluated => Err(UsageError::NotSimulated { query: "is_valid" }),
            Simulation::Valid { .. } => Ok(true),
            Simulation::Invalid { .. } => Ok(false),
        }
    }

    /// Goal satisfaction in the final state; `None` when the plan is invalid.
    pub fn is_successful(&self) -> Result<Option<bool>, UsageError> {
        let Some(trajectory) = self.simulated("is_successful")? else {
            return Ok(None);
        };
        Ok(trajectory
            .last()
            .map(|last| self.world.satisfies(last, self.world.goal())))
    }

    /// The problem's safety constraint over every visited state; trivially
    /// true without one. `None` when the plan is invalid.
    pub fn is_safe(&self) -> Result<Option<bool>, UsageError> {
        let Some(trajectory) = self.simulated("is_safe")? else {
            return Ok(None);
        };
        Ok(Some(match self.world.safety_constraint() {
            None => true,
            Some(constraint) => trajectory
                .iter()
                .all(|state| self.world.satisfies(state, constraint)),
        }))
    }

    /// Whether any visited state violates `constraint`. Only defined for a
    /// valid plan.
    pub fn is_constraint_violated(&self, constraint: &str) -> Result<bool> {
        let trajectory = self
            .simulated("is_constraint_violated")?
            .ok_or(UsageError::InvalidPlan {
                query: "is_constraint_violated",
            })?;
        let formula = self
            .world
            .parse_constraint(constraint)
            .with_context(|| format!("parse constraint {constraint}"))?;
        Ok(trajectory
            .iter()
            .any(|state| !self.world.satisfies(state, &formula)))
    }

    pub fn trajectory(&self) -> Option<&[State]> {
        match &self.simulation {
            Simulation::Valid { trajectory } => Some(trajectory),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&ReplayFailure> {
        match &self.simulation {
            Simulation::Invalid { failure } => Some(failure),
            _ => None,
        }
    }

    pub fn result(&self) -> Result<EvaluationResult, UsageError> {
        Ok(EvaluationResult {
            valid: self.is_valid()?,
            successful: self.is_successful()?,
            safe: self.is_safe()?,
        })
    }

    fn simulated(&self, query: &'static str) -> Result<Option<&[State]>, UsageError> {
        match &self.simulation {
            Simulation::Unevaluated => Err(UsageError::NotSimulated { query }),
            Simulation::Valid { trajectory } => Ok(Some(trajectory)),
            Simulation::Invalid { .. } => Ok(None),
        }
    }
}

/// Execute `actions` in order from the initial state. The loop runs at most
/// once per action.
fn replay(world: &World, actions: &[Action]) -> Result<Vec<State>, ReplayFailure> {
    let mut trajectory = Vec::with_capacity(actions.len() + 1);
    let mut state = world.initial_state();
    for (idx, action) in actions.iter().enumerate() {
        let next = world
            .execute(&state, action)
            .map_err(|error| ReplayFailure::Inexecutable {
                step: idx + 1,
                error,
            })?;
        trajectory.push(std::mem::replace(&mut state, next));
    }
    trajectory.push(state);
    Ok(trajectory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn fixture(name: &str) -> String {
        fs::read_to_string(Path::new("tests/data").join(name)).expect("fixture missing")
    }

    fn blocksworld(problem: &str, plan: &str) -> PlanEvaluator {
        PlanEvaluator::new(
            &fixture("blocksworld/domain.pddl"),
            &fixture(&format!("blocksworld/{problem}")),
            plan,
        )
        .expect("blocksworld parses")
    }

    #[test]
    fn ground_truth_is_valid_successful_and_safe() {
        let mut evaluator = blocksworld("problem.pddl", &fixture("blocksworld/plan.pddl"));
        assert!(evaluator.try_simulation());
        assert_eq!(
            evaluator.result().unwrap(),
            EvaluationResult {
                valid: true,
                successful: Some(true),
                safe: Some(true),
            }
        );
        assert_eq!(evaluator.trajectory().unwrap().len(), 7);
    }

    #[test]
    fn unsafe_intermediate_state_fails_safety() {
        let mut evaluator =
            blocksworld("problem_guarded.pddl", &fixture("blocksworld/plan.pddl"));
        assert!(evaluator.try_simulation());
        assert_eq!(evaluator.is_successful().unwrap(), Some(true));
        assert_eq!(evaluator.is_safe().unwrap(), Some(false));
    }

    #[test]
    fn no_constraint_means_safe_even_without_goal() {
        let mut evaluator = blocksworld("problem.pddl", "(unstack c a)\n(put-down c)");
        assert!(evaluator.try_simulation());
        assert_eq!(evaluator.is_successful().unwrap(), Some(false));
        assert_eq!(evaluator.is_safe().unwrap(), Some(true));
    }

    #[test]
    fn empty_plan_is_valid() {
        let mut evaluator = blocksworld("problem.pddl", "; nothing to do\n");
        assert!(evaluator.try_simulation());
        assert_eq!(evaluator.trajectory().unwrap().len(), 1);
        assert_eq!(evaluator.is_successful().unwrap(), Some(false));
    }

    #[test]
    fn inexecutable_step_makes_plan_invalid() {
        let mut evaluator = blocksworld("problem.pddl", "(unstack c a)\n(pick-up b)");
        assert!(!evaluator.try_simulation());
        assert!(matches!(
            evaluator.failure(),
            Some(ReplayFailure::Inexecutable { step: 2, .. })
        ));
        assert!(evaluator.trajectory().is_none());
        let json = serde_json::to_string(&evaluator.result().unwrap()).unwrap();
        assert_eq!(json, r#"{"valid":false}"#);
    }

    #[test]
    fn unparseable_line_makes_plan_invalid() {
        let mut evaluator = blocksworld("problem.pddl", "(unstack c a)\nput c down");
        assert!(!evaluator.try_simulation());
        assert!(matches!(
            evaluator.failure(),
            Some(ReplayFailure::Unparseable { line: 2, .. })
        ));
        assert_eq!(evaluator.is_successful().unwrap(), None);
        assert_eq!(evaluator.is_safe().unwrap(), None);
    }

    #[test]
    fn queries_before_simulation_are_usage_errors() {
        let evaluator = blocksworld("problem.pddl", "");
        assert_eq!(
            evaluator.is_valid(),
            Err(UsageError::NotSimulated { query: "is_valid" })
        );
        assert!(evaluator.is_successful().is_err());
        assert!(evaluator.is_safe().is_err());
        assert!(evaluator.is_constraint_violated("(always (clear a))").is_err());
    }

    #[test]
    fn second_simulation_keeps_first_outcome() {
        let mut evaluator = blocksworld("problem.pddl", &fixture("blocksworld/plan.pddl"));
        assert!(evaluator.try_simulation());
        let first = evaluator.simulation().clone();
        assert!(evaluator.try_simulation());
        assert_eq!(evaluator.simulation(), &first);
    }

    #[test]
    fn validity_query_is_stable_after_one_simulation() {
        for plan in ["(unstack c a)\n(put-down c)", "(stack a b)"] {
            let mut evaluator = blocksworld("problem.pddl", plan);
            evaluator.try_simulation();
            let first = evaluator.is_valid().unwrap();
            assert_eq!(evaluator.is_valid().unwrap(), first);
        }
    }

    #[test]
    fn ad_hoc_constraints_check_every_state() {
        let mut evaluator = blocksworld("problem.pddl", &fixture("blocksworld/plan.pddl"));
        evaluator.try_simulation();
        assert!(evaluator
            .is_constraint_violated("(always (not (holding c)))")
            .unwrap());
        assert!(!evaluator
            .is_constraint_violated("(always (not (holding d)))")
            .unwrap());
        assert!(evaluator.is_constraint_violated("(always (on").is_err());
    }

    #[test]
    fn ad_hoc_constraint_on_invalid_plan_is_a_usage_error() {
        let mut evaluator = blocksworld("problem.pddl", "(stack a b)");
        evaluator.try_simulation();
        let err = evaluator
            .is_constraint_violated("(always (clear a))")
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<UsageError>(),
            Some(&UsageError::InvalidPlan {
                query: "is_constraint_violated",
            })
        );
    }

    #[test]
    fn repaired_corridor_plan_evaluates_valid() {
        let mut evaluator = PlanEvaluator::new(
            &fixture("corridor/domain.pddl"),
            &fixture("corridor/problem.pddl"),
            "(move a b)",
        )
        .unwrap();
        assert!(evaluator.try_simulation());
        assert_eq!(evaluator.is_successful().unwrap(), Some(true));
    }
}
