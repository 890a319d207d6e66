//! Plan matchers: align a raw planner result with the domain's vocabulary.
//!
//! Every matcher is built once per domain/problem pair and returns canonical
//! action-per-line text. The two strategies form a closed set selected by
//! `MatcherKind`:
//!
//! - `greedy_action` walks the plan against the simulated state, keeping
//!   applicable steps verbatim and substituting the most similar applicable
//!   action otherwise. It stops at the first step it cannot place.
//! - `individual_object` keeps action names and order, and only snaps each
//!   argument to the most similar problem object. It never looks at state.
mod greedy;
mod individual;

pub use greedy::GreedyActionMatcher;
pub use individual::IndividualObjectMatcher;

use crate::pddl::{Action, World};
use crate::planner_result::PlannerResult;
use crate::similarity::SimilarityScorer;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scores at or below this never win a similarity selection.
const NO_MATCH_FLOOR: f32 = -1.0;

/// Matching strategy selected by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum MatcherKind {
    GreedyAction,
    IndividualObject,
}

impl MatcherKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MatcherKind::GreedyAction => "greedy_action",
            MatcherKind::IndividualObject => "individual_object",
        }
    }
}

impl fmt::Display for MatcherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a candidate step ended up in the aligned plan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// Taken verbatim.
    Exact,
    /// Replaced by the most similar applicable action.
    Substituted { score: f32 },
    /// Name kept, one or more arguments snapped to known objects.
    Repaired,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    /// Zero-based position among the candidate steps.
    pub index: usize,
    /// Text projection of the candidate as produced by the planner.
    pub candidate: String,
    pub action: Action,
    pub resolution: Resolution,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchOutcome {
    pub steps: Vec<StepRecord>,
    /// Candidate index at which matching stopped, if it stopped early.
    pub truncated_at: Option<usize>,
}

impl MatchOutcome {
    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.steps.iter().map(|step| &step.action)
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated_at.is_some()
    }

    /// Canonical action-per-line text.
    pub fn plan_text(&self) -> String {
        self.actions()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub trait PlanMatcher {
    fn kind(&self) -> MatcherKind;

    /// Align `result` and report how each step was resolved.
    fn match_plan(&self, result: &PlannerResult) -> Result<MatchOutcome>;

    /// Align `result` and serialize the aligned plan.
    fn plan_closest_match(&self, result: &PlannerResult) -> Result<String> {
        Ok(self.match_plan(result)?.plan_text())
    }
}

/// Parse the domain and ground-truth problem once and build the matcher.
pub fn build_matcher(
    kind: MatcherKind,
    domain_text: &str,
    problem_text: &str,
    scorer: SimilarityScorer,
) -> Result<Box<dyn PlanMatcher>> {
    let world = World::parse(domain_text, problem_text).context("parse domain/problem")?;
    Ok(match kind {
        MatcherKind::GreedyAction => Box::new(GreedyActionMatcher::from_world(world, scorer)),
        MatcherKind::IndividualObject => {
            Box::new(IndividualObjectMatcher::from_world(world, scorer))
        }
    })
}

/// The option with strictly maximal similarity to `text`; the first option
/// reaching the maximum wins ties.
fn closest<'a, T>(
    scorer: &SimilarityScorer,
    text: &str,
    options: &'a [T],
    project: impl Fn(&T) -> String,
) -> Result<Option<(&'a T, f32)>> {
    let mut best = None;
    let mut best_score = NO_MATCH_FLOOR;
    for option in options {
        let score = scorer.similarity(text, &project(option))?;
        if score > best_score {
            best = Some((option, score));
            best_score = score;
        }
    }
    Ok(best)
}


#[cfg(test)]
mod tests {
    use super::test_support::fixture;
    use super::*;

    #[test]
    fn factory_builds_each_kind() {
        let domain = fixture("blocksworld/domain.pddl");
        let problem = fixture("blocksworld/problem.pddl");
        for kind in [MatcherKind::GreedyAction, MatcherKind::IndividualObject] {
            let matcher = build_matcher(kind, &domain, &problem, SimilarityScorer::lexical())
                .expect("build matcher");
            assert_eq!(matcher.kind(), kind);
        }
    }

    #[test]
    fn factory_rejects_malformed_domain() {
        let problem = fixture("blocksworld/problem.pddl");
        let err = build_matcher(
            MatcherKind::GreedyAction,
            "(define (domain broken)",
            &problem,
            SimilarityScorer::lexical(),
        );
        assert!(err.is_err());
    }

    #[test]
    fn closest_prefers_first_on_ties() {
        let scorer = SimilarityScorer::lexical();
        let options = vec!["b x".to_string(), "x b".to_string()];
        let (chosen, _) = closest(&scorer, "b x", &options, Clone::clone)
            .unwrap()
            .unwrap();
        assert_eq!(chosen, "b x");
    }

    #[test]
    fn closest_of_nothing_is_none() {
        let scorer = SimilarityScorer::lexical();
        let options: Vec<String> = Vec::new();
        assert!(closest(&scorer, "x", &options, Clone::clone)
            .unwrap()
            .is_none());
    }

    #[test]
    fn matcher_kind_names_match_config_keys() {
        let kind: MatcherKind = serde_json::from_str("\"individual_object\"").unwrap();
        assert_eq!(kind, MatcherKind::IndividualObject);
        assert_eq!(MatcherKind::GreedyAction.to_string(), "greedy_action");
    }
}
