use super::{closest, MatchOutcome, MatcherKind, PlanMatcher, Resolution, StepRecord};
use crate::pddl::{PddlError, World};
use crate::planner_result::{plan_lines, step_fragments, PlanEncoding, PlannerResult};
use crate::projection::{action_text, candidate_from_line, Candidate};
use crate::similarity::SimilarityScorer;
use anyhow::{Context, Result};
use std::time::Instant;

/// Aligns a plan step by step against the simulated state.
///
/// A candidate that names an applicable action is kept as is. Anything else
/// is replaced by the applicable action whose text is most similar to it.
/// Matching stops at the first step for which nothing is applicable, so the
/// output is always an executable prefix.
pub struct GreedyActionMatcher {
    world: World,
    scorer: SimilarityScorer,
}

impl GreedyActionMatcher {
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

    fn candidates(result: &PlannerResult) -> Result<Vec<Candidate>> {
        Ok(match result.encoding()? {
            PlanEncoding::Pddl(text) => plan_lines(text).map(candidate_from_line).collect(),
            PlanEncoding::Json(text) => step_fragments(text)?
                .into_iter()
                .map(Candidate::Raw)
                .collect(),
        })
    }
}

impl PlanMatcher for GreedyActionMatcher {
    fn kind(&self) -> MatcherKind {
        MatcherKind::GreedyAction
    }

    fn match_plan(&self, result: &PlannerResult) -> Result<MatchOutcome> {
        let start = Instant::now();
        let candidates = Self::candidates(result)?;
        let mut state = self.world.initial_state();
        let mut outcome = MatchOutcome::default();

        for (index, candidate) in candidates.iter().enumerate() {
            if let Candidate::Action(action) = candidate {
                if self.world.is_available(&state, action) {
                    state = self.world.execute(&state, action)?;
                    outcome.steps.push(StepRecord {
                        index,
                        candidate: action_text(action),
                        action: action.clone(),
                        resolution: Resolution::Exact,
                    });
                    continue;
                }
            }

            let text = candidate.text();
            let available = self.world.available(&state);
            let Some((chosen, score)) = closest(&self.scorer, &text, &available, action_text)
                .with_context(|| format!("score step {} ({text})", index + 1))?
            else {
                tracing::info!(
                    step = index + 1,
                    candidate = %text,
                    "no applicable action left; truncating plan"
                );
                outcome.truncated_at = Some(index);
                break;
            };
            tracing::debug!(
                step = index + 1,
                candidate = %text,
                chosen = %chosen,
                score,
                options = available.len(),
                "substituted step"
            );
            state = self.world.execute(&state, chosen)?;
            outcome.steps.push(StepRecord {
                index,
                candidate: text,
                action: chosen.clone(),
                resolution: Resolution::Substituted { score },
            });
        }

        tracing::info!(
            elapsed_ms = start.elapsed().as_millis(),
            candidates = candidates.len(),
            matched = outcome.steps.len(),
            truncated = outcome.is_truncated(),
            "greedy match complete"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{fixture, offline_scorer};
    use super::*;
    use crate::error::UsageError;
    use crate::pddl::parse_plan;

    fn blocksworld(scorer: SimilarityScorer) -> GreedyActionMatcher {
        GreedyActionMatcher::new(
            &fixture("blocksworld/domain.pddl"),
            &fixture("blocksworld/problem.pddl"),
            scorer,
        )
        .expect("blocksworld parses")
    }

    fn ground_truth_text() -> String {
        parse_plan(&fixture("blocksworld/plan.pddl"))
            .expect("plan parses")
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn ground_truth_passes_through_without_scoring() {
        let matcher = blocksworld(offline_scorer());
        let result = PlannerResult::from_pddl(fixture("blocksworld/plan.pddl"));
        let outcome = matcher.match_plan(&result).expect("no similarity calls");
        assert!(outcome
            .steps
            .iter()
            .all(|step| step.resolution == Resolution::Exact));
        assert_eq!(outcome.plan_text(), ground_truth_text());
        assert!(!outcome.is_truncated());
    }

    #[test]
    fn json_steps_align_to_ground_truth() {
        let matcher = blocksworld(SimilarityScorer::lexical());
        let result = PlannerResult::from_json(fixture("blocksworld/plan_steps.json"));
        assert_eq!(
            matcher.plan_closest_match(&result).unwrap(),
            ground_truth_text()
        );
    }

    #[test]
    fn empty_json_step_is_scored_like_any_other() {
        let matcher = blocksworld(SimilarityScorer::lexical());
        let result = PlannerResult::from_json(r#"{"steps": [{"a": "unstack c a"}, {}]}"#);
        let outcome = matcher.match_plan(&result).unwrap();
        assert_eq!(outcome.steps.len(), 2);
        assert_eq!(outcome.steps[0].action.to_string(), "(unstack c a)");
        assert_eq!(outcome.steps[1].candidate, "");
        assert_eq!(
            outcome.steps[1].resolution,
            Resolution::Substituted { score: 0.0 }
        );
        assert!(!outcome.is_truncated());
    }

    #[test]
    fn unknown_action_is_replaced_by_closest_applicable() {
        let matcher = blocksworld(SimilarityScorer::lexical());
        let outcome = matcher
            .match_plan(&PlannerResult::from_pddl("(teleport c a)"))
            .unwrap();
        assert_eq!(outcome.plan_text(), "(unstack c a)");
        assert!(matches!(
            outcome.steps[0].resolution,
            Resolution::Substituted { .. }
        ));
    }

    #[test]
    fn inapplicable_step_is_replaced_by_applicable_one() {
        let matcher = GreedyActionMatcher::new(
            &fixture("corridor/domain.pddl"),
            &fixture("corridor/problem.pddl"),
            SimilarityScorer::lexical(),
        )
        .unwrap();
        let text = matcher
            .plan_closest_match(&PlannerResult::from_pddl("(move a a)"))
            .unwrap();
        assert_eq!(text, "(move a b)");
    }

    #[test]
    fn nothing_applicable_yields_empty_plan() {
        let matcher = GreedyActionMatcher::new(
            &fixture("corridor/domain.pddl"),
            &fixture("corridor/stuck.pddl"),
            offline_scorer(),
        )
        .unwrap();
        let outcome = matcher
            .match_plan(&PlannerResult::from_pddl("(move a b)\n(move b a)"))
            .unwrap();
        assert_eq!(outcome.plan_text(), "");
        assert_eq!(outcome.truncated_at, Some(0));
    }

    #[test]
    fn truncates_when_actions_run_out_mid_plan() {
        let domain = "(define (domain button)
            (:predicates (armed ?b))
            (:action press :parameters (?b) :precondition (armed ?b) :effect (not (armed ?b))))";
        let problem = "(define (problem once) (:domain button)
            (:objects b1) (:init (armed b1)) (:goal (not (armed b1))))";
        let matcher = GreedyActionMatcher::new(domain, problem, offline_scorer()).unwrap();
        let outcome = matcher
            .match_plan(&PlannerResult::from_pddl("(press b1)\n(press b1)\n(press b1)"))
            .unwrap();
        assert_eq!(outcome.plan_text(), "(press b1)");
        assert_eq!(outcome.truncated_at, Some(1));
    }

    #[test]
    fn output_is_always_an_executable_prefix() {
        let matcher = blocksworld(SimilarityScorer::lexical());
        let noisy = "1. (unstack c a)\nthen drop block c\n(stack a b)\n(fly b)\n- pick up a\n(stack a b)";
        let outcome = matcher.match_plan(&PlannerResult::from_pddl(noisy)).unwrap();
        assert!(!outcome.steps.is_empty());
        let world = World::parse(
            &fixture("blocksworld/domain.pddl"),
            &fixture("blocksworld/problem.pddl"),
        )
        .unwrap();
        let mut state = world.initial_state();
        for action in outcome.actions() {
            state = world.execute(&state, action).expect("aligned step executes");
        }
    }

    #[test]
    fn missing_plan_is_a_usage_error() {
        let matcher = blocksworld(offline_scorer());
        let err = matcher.match_plan(&PlannerResult::default()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<UsageError>(),
            Some(&UsageError::MissingPlan)
        );
    }

    #[test]
    fn scorer_failures_propagate() {
        let matcher = blocksworld(offline_scorer());
        let err = matcher
            .match_plan(&PlannerResult::from_pddl("(teleport c a)"))
            .unwrap_err();
        assert!(format!("{err:#}").contains("embedding backend unavailable"));
    }
}
