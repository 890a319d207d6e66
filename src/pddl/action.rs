use super::sexpr::{parse_one, SExpr};
use super::{malformed, PddlError};
use std::fmt;

/// A ground action: schema name plus ordered object arguments.
///
/// `Display` renders the canonical plan-line notation, `(name a b)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Action {
    pub name: String,
    pub args: Vec<String>,
}

impl Action {
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    fn from_sexpr(expr: &SExpr) -> Result<Self, PddlError> {
        let items = expr
            .as_list()
            .ok_or_else(|| malformed("action", format!("expected (name args...), found {expr}")))?;
        let mut atoms = items.iter().map(|item| {
            item.as_atom()
                .map(str::to_string)
                .ok_or_else(|| malformed("action", format!("nested list in {expr}")))
        });
        let name = atoms
            .next()
            .ok_or_else(|| malformed("action", "empty action"))??;
        let args = atoms.collect::<Result<Vec<_>, _>>()?;
        Ok(Self { name, args })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.name)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        write!(f, ")")
    }
}

/// Parse one plan line such as `(move a b)`.
pub fn parse_action_line(line: &str) -> Result<Action, PddlError> {
    Action::from_sexpr(&parse_one(line)?)
}

pub(crate) fn is_comment_or_blank(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with(';')
}

/// Parse action-per-line plan text, skipping blank and `;` comment lines.
///
/// Errors carry the 1-based line number of the first malformed action.
pub fn parse_plan(text: &str) -> Result<Vec<Action>, (usize, PddlError)> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !is_comment_or_blank(line))
        .map(|(idx, line)| parse_action_line(line).map_err(|err| (idx + 1, err)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_text_round_trips() {
        let action = parse_action_line("  (Pick-Up A)  ").unwrap();
        assert_eq!(action, Action::new("pick-up", vec!["a".into()]));
        assert_eq!(action.to_string(), "(pick-up a)");
        assert_eq!(parse_action_line("(noop)").unwrap().to_string(), "(noop)");
    }

    #[test]
    fn rejects_nested_and_empty_actions() {
        assert!(parse_action_line("(move (a) b)").is_err());
        assert!(parse_action_line("()").is_err());
        assert!(parse_action_line("move a b").is_err());
    }

    #[test]
    fn plan_skips_comments_and_reports_bad_line() {
        let text = "; cost = 2\n(move a b)\n\n(move b a)\n";
        let plan = parse_plan(text).unwrap();
        assert_eq!(plan.len(), 2);

        let (line, _) = parse_plan("(move a b)\nmove b a\n").unwrap_err();
        assert_eq!(line, 2);
    }
}
