//! Raw planner output as handed over by a planner adapter.
//!
//! A result carries a plan as action lines (`plan_pddl`) or as a JSON
//! document with a `steps` list (`plan_json`). Step fields keep their
//! document order; the JSON map is order-preserving.
use crate::error::UsageError;
use crate::pddl::is_comment_or_blank;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PlannerResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_pddl: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_json: Option<String>,
    /// Problem text produced by the planner, when it translated one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_pddl: Option<String>,
}

/// The encoding a matcher will read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanEncoding<'a> {
    Pddl(&'a str),
    Json(&'a str),
}

#[derive(Debug, Deserialize)]
struct StepPlan {
    steps: Vec<Map<String, Value>>,
}

impl PlannerResult {
    pub fn from_pddl(plan: impl Into<String>) -> Self {
        Self {
            plan_pddl: Some(plan.into()),
            ..Self::default()
        }
    }

    pub fn from_json(plan: impl Into<String>) -> Self {
        Self {
            plan_json: Some(plan.into()),
            ..Self::default()
        }
    }

    /// Load a plan file: `.json` files are step documents, anything else is
    /// read as action lines.
    pub fn load(path: &Path) -> Result<Self> {
        let text =
            fs::read_to_string(path).with_context(|| format!("read plan {}", path.display()))?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Ok(Self::from_json(text))
        } else {
            Ok(Self::from_pddl(text))
        }
    }

    /// `plan_pddl` wins when both encodings are present.
    pub fn encoding(&self) -> Result<PlanEncoding<'_>, UsageError> {
        match (&self.plan_pddl, &self.plan_json) {
            (Some(pddl), _) => Ok(PlanEncoding::Pddl(pddl)),
            (None, Some(json)) => Ok(PlanEncoding::Json(json)),
            (None, None) => Err(UsageError::MissingPlan),
        }
    }
}

/// Non-comment, non-blank lines of an action-line plan.
pub fn plan_lines(plan: &str) -> impl Iterator<Item = &str> {
    plan.lines()
        .filter(|line| !is_comment_or_blank(line))
        .map(str::trim)
}

/// One text fragment per JSON step: the step's values joined by spaces, in
/// field order. Non-string values use their JSON rendering; a step without
/// fields yields an empty fragment.
pub fn step_fragments(plan_json: &str) -> Result<Vec<String>> {
    let plan: StepPlan = serde_json::from_str(plan_json).context("parse JSON step plan")?;
    Ok(plan
        .steps
        .iter()
        .map(|step| {
            step.values()
                .map(|value| match value {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pddl_takes_precedence_over_json() {
        let result = PlannerResult {
            plan_pddl: Some("(a)".into()),
            plan_json: Some("{\"steps\": []}".into()),
            task_pddl: None,
        };
        assert_eq!(result.encoding().unwrap(), PlanEncoding::Pddl("(a)"));
    }

    #[test]
    fn missing_plan_is_a_usage_error() {
        assert_eq!(
            PlannerResult::default().encoding().unwrap_err(),
            UsageError::MissingPlan
        );
    }

    #[test]
    fn step_fragments_keep_field_order() {
        let json = r#"{"steps": [{"verb": "stack", "what": "b", "onto": "c"}, {"z": "put", "a": "down", "n": 3}]}"#;
        assert_eq!(
            step_fragments(json).unwrap(),
            vec!["stack b c".to_string(), "put down 3".to_string()]
        );
    }

    #[test]
    fn step_plan_requires_steps_list() {
        assert!(step_fragments(r#"{"plan": []}"#).is_err());
    }

    #[test]
    fn empty_step_yields_empty_fragment() {
        assert_eq!(
            step_fragments(r#"{"steps": [{"a": "unstack c a"}, {}]}"#).unwrap(),
            vec!["unstack c a".to_string(), String::new()]
        );
    }

    #[test]
    fn plan_lines_skip_comments() {
        let lines: Vec<&str> = plan_lines("; header\n (a) \n\n(b)\n").collect();
        assert_eq!(lines, vec!["(a)", "(b)"]);
    }

    #[test]
    fn serde_omits_absent_encodings() {
        let json = serde_json::to_string(&PlannerResult::from_pddl("(a)")).unwrap();
        assert_eq!(json, r#"{"plan_pddl":"(a)"}"#);
    }
}
