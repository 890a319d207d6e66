use super::{closest, MatchOutcome, MatcherKind, PlanMatcher, Resolution, StepRecord};
use crate::error::UsageError;
use crate::pddl::{is_comment_or_blank, parse_action_line, Action, PddlError, World};
use crate::planner_result::{PlanEncoding, PlannerResult};
use crate::projection::action_text;
use crate::similarity::SimilarityScorer;
use anyhow::{Context, Result};
use std::time::Instant;

/// Snaps each action argument to the most similar problem object.
///
/// Action names, step count, and order are preserved and the state is never
/// consulted, so the output may still be inapplicable.
pub struct IndividualObjectMatcher {
    world: World,
    scorer: SimilarityScorer,
}

impl IndividualObjectMatcher {
    pub fn new(
        domain_text: &str,
        problem_text: &str,
        scorer: SimilarityScorer,
    ) -> Result<Self, PddlError> {
        Ok(Self::from_world(
            World::parse(domain_text, problem_text)?,
            scorer,
        ))
    }

    pub fn from_world(world: World, scorer: SimilarityScorer) -> Self {
        Self { world, scorer }
    }

    /// Best problem object for `token`, or the token itself when no object
    /// scores above the floor.
    fn closest_object(&self, token: &str) -> Result<String> {
        let best = closest(&self.scorer, token, self.world.objects(), |object| {
            object.name.clone()
        })
        .with_context(|| format!("score argument {token}"))?;
        Ok(best.map_or_else(|| token.to_string(), |(object, _)| object.name.clone()))
    }
}

impl PlanMatcher for IndividualObjectMatcher {
    fn kind(&self) -> MatcherKind {
        MatcherKind::IndividualObject
    }

    fn match_plan(&self, result: &PlannerResult) -> Result<MatchOutcome> {
        let start = Instant::now();
        let PlanEncoding::Pddl(plan) = result.encoding()? else {
            return Err(UsageError::UnsupportedEncoding {
                matcher: MatcherKind::IndividualObject.as_str(),
                required: "pddl",
            }
            .into());
        };

        let mut outcome = MatchOutcome::default();
        for (line_idx, line) in plan.lines().enumerate() {
            if is_comment_or_blank(line) {
                continue;
            }
            let action = parse_action_line(line).map_err(|_| UsageError::MalformedAction {
                line: line_idx + 1,
                text: line.trim().to_string(),
            })?;
            let args = action
                .args
                .iter()
                .map(|arg| self.closest_object(arg))
                .collect::<Result<Vec<_>>>()?;
            let repaired = Action::new(action.name.clone(), args);
            let resolution = if repaired == action {
                Resolution::Exact
            } else {
                Resolution::Repaired
            };
            outcome.steps.push(StepRecord {
                index: outcome.steps.len(),
                candidate: action_text(&action),
                action: repaired,
                resolution,
            });
        }

        tracing::info!(
            elapsed_ms = start.elapsed().as_millis(),
            steps = outcome.steps.len(),
            objects = self.world.objects().len(),
            "object match complete"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{fixture, offline_scorer};
    use super::*;

    fn blocksworld() -> IndividualObjectMatcher {
        IndividualObjectMatcher::new(
            &fixture("blocksworld/domain.pddl"),
            &fixture("blocksworld/problem.pddl"),
            SimilarityScorer::lexical(),
        )
        .expect("blocksworld parses")
    }

    #[test]
    fn arguments_snap_to_problem_objects() {
        let outcome = blocksworld()
            .match_plan(&PlannerResult::from_pddl("(unstack block-c a)\n(put-down c)"))
            .unwrap();
        assert_eq!(outcome.plan_text(), "(unstack c a)\n(put-down c)");
        assert_eq!(outcome.steps[0].resolution, Resolution::Repaired);
        assert_eq!(outcome.steps[1].resolution, Resolution::Exact);
    }

    #[test]
    fn names_and_order_are_kept_without_state_checks() {
        let outcome = blocksworld()
            .match_plan(&PlannerResult::from_pddl("; plan\n(stack a b)\n(fly c)"))
            .unwrap();
        assert_eq!(outcome.plan_text(), "(stack a b)\n(fly c)");
        assert_eq!(outcome.steps[1].index, 1);
    }

    #[test]
    fn json_only_result_is_rejected() {
        let err = blocksworld()
            .match_plan(&PlannerResult::from_json(fixture(
                "blocksworld/plan_steps.json",
            )))
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<UsageError>(),
            Some(&UsageError::UnsupportedEncoding {
                matcher: "individual_object",
                required: "pddl",
            })
        );
    }

    #[test]
    fn malformed_line_is_reported_with_its_number() {
        let err = blocksworld()
            .match_plan(&PlannerResult::from_pddl("(pick-up b)\n\npick up a"))
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<UsageError>(),
            Some(&UsageError::MalformedAction {
                line: 3,
                text: "pick up a".into(),
            })
        );
    }

    #[test]
    fn tokens_are_kept_when_there_are_no_objects() {
        let domain = fixture("corridor/domain.pddl");
        let problem = "(define (problem empty) (:domain corridor) (:init) (:goal (and)))";
        let matcher =
            IndividualObjectMatcher::new(&domain, problem, offline_scorer()).unwrap();
        let text = matcher
            .plan_closest_match(&PlannerResult::from_pddl("(move x y)"))
            .unwrap();
        assert_eq!(text, "(move x y)");
    }
}
