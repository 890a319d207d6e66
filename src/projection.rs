//! Text projections used for similarity comparison.
//!
//! Formal actions project to `name arg1 arg2`; raw planner fragments project
//! to themselves. Both sides of every comparison go through here so that the
//! scorer sees the same shape of text.
use crate::pddl::{parse_action_line, Action};
use regex::Regex;
use std::sync::OnceLock;

/// A step of the produced plan before alignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    /// Parsed into a name and arguments; eligible for the exact-match path.
    Action(Action),
    /// Free text that only similarity can place.
    Raw(String),
}

impl Candidate {
    pub fn text(&self) -> String {
        match self {
            Candidate::Action(action) => action_text(action),
            Candidate::Raw(text) => text.clone(),
        }
    }
}

/// `name arg1 arg2`, the textual-equality form of an action.
pub fn action_text(action: &Action) -> String {
    let mut parts = Vec::with_capacity(action.args.len() + 1);
    parts.push(action.name.as_str());
    parts.extend(action.args.iter().map(String::as_str));
    parts.join(" ")
}

fn paren_group() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\([^()]*\)").expect("regex for action group"))
}

fn list_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:\d+\s*[.):]|[-*•])\s*").expect("regex for list marker")
    })
}

/// Read one plan line leniently.
///
/// Canonical lines parse directly. Otherwise a flat group that opens the line,
/// after an optional list marker, is tried; this tolerates `1. (move a b)`
/// and `(move a b) ; step one`. Any other line becomes raw text with the list
/// marker removed, so a trailing parenthetical stays part of the prose.
pub fn candidate_from_line(line: &str) -> Candidate {
    if let Ok(action) = parse_action_line(line) {
        return Candidate::Action(action);
    }
    let body = list_marker().replace(line, "");
    let body = body.trim();
    let leading_group = paren_group()
        .find(body)
        .filter(|group| group.start() == 0);
    if let Some(group) = leading_group {
        if let Ok(action) = parse_action_line(group.as_str()) {
            return Candidate::Action(action);
        }
    }
    Candidate::Raw(body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_text_joins_name_and_args() {
        let action = Action::new("stack", vec!["b".into(), "c".into()]);
        assert_eq!(action_text(&action), "stack b c");
        assert_eq!(action_text(&Action::new("noop", vec![])), "noop");
    }

    #[test]
    fn lenient_line_reading() {
        let expected = Candidate::Action(Action::new("move", vec!["a".into(), "b".into()]));
        assert_eq!(candidate_from_line("(move a b)"), expected);
        assert_eq!(candidate_from_line("1. (MOVE a b)"), expected);
        assert_eq!(candidate_from_line("(move a b) ; go right"), expected);
    }

    #[test]
    fn unparseable_lines_become_raw_text() {
        assert_eq!(
            candidate_from_line("2) move the block a onto b"),
            Candidate::Raw("move the block a onto b".into())
        );
        assert_eq!(
            candidate_from_line("(move (a) b)"),
            Candidate::Raw("(move (a) b)".into())
        );
        assert_eq!(candidate_from_line("- walk").text(), "walk");
    }

    #[test]
    fn trailing_parenthetical_stays_in_raw_text() {
        assert_eq!(
            candidate_from_line("put down block c (the red one)"),
            Candidate::Raw("put down block c (the red one)".into())
        );
        assert_eq!(
            candidate_from_line("3. unstack block c from a (step one)"),
            Candidate::Raw("unstack block c from a (step one)".into())
        );
    }
}
