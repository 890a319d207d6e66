//! S-expression reader for PDDL text.
//!
//! Atoms are lower-cased on read since PDDL identifiers are case-insensitive.
//! `;` starts a comment that runs to the end of the line.
use super::PddlError;
use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, multispace1},
    combinator::{all_consuming, map, value},
    multi::many0,
    sequence::{delimited, preceded},
    IResult,
};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SExpr {
    Atom(String),
    List(Vec<SExpr>),
}

impl SExpr {
    pub(crate) fn as_atom(&self) -> Option<&str> {
        match self {
            SExpr::Atom(atom) => Some(atom),
            SExpr::List(_) => None,
        }
    }

    pub(crate) fn as_list(&self) -> Option<&[SExpr]> {
        match self {
            SExpr::List(items) => Some(items),
            SExpr::Atom(_) => None,
        }
    }

    /// Head atom of a non-empty list, e.g. `and` for `(and ...)`.
    pub(crate) fn head(&self) -> Option<&str> {
        self.as_list()
            .and_then(|items| items.first())
            .and_then(SExpr::as_atom)
    }
}

impl fmt::Display for SExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SExpr::Atom(atom) => write!(f, "{atom}"),
            SExpr::List(items) => {
                write!(f, "(")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Parse exactly one expression, ignoring surrounding whitespace and comments.
pub(crate) fn parse_one(text: &str) -> Result<SExpr, PddlError> {
    match all_consuming(delimited(trivia, expr, trivia))(text) {
        Ok((_, expr)) => Ok(expr),
        Err(err) => Err(syntax_error(text, err)),
    }
}

fn is_atom_char(c: char) -> bool {
    !c.is_whitespace() && c != '(' && c != ')' && c != ';'
}

fn comment(input: &str) -> IResult<&str, ()> {
    value((), preceded(char(';'), take_while(|c| c != '\n')))(input)
}

fn trivia(input: &str) -> IResult<&str, ()> {
    value((), many0(alt((value((), multispace1), comment))))(input)
}

fn atom(input: &str) -> IResult<&str, SExpr> {
    map(take_while1(is_atom_char), |raw: &str| {
        SExpr::Atom(raw.to_ascii_lowercase())
    })(input)
}

fn list(input: &str) -> IResult<&str, SExpr> {
    map(
        delimited(
            char('('),
            many0(preceded(trivia, expr)),
            preceded(trivia, char(')')),
        ),
        SExpr::List,
    )(input)
}

fn expr(input: &str) -> IResult<&str, SExpr> {
    alt((list, atom))(input)
}

fn syntax_error(text: &str, err: nom::Err<nom::error::Error<&str>>) -> PddlError {
    match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let offset = text.len() - e.input.len();
            let line = text[..offset].matches('\n').count() + 1;
            let near: String = e.input.chars().take(24).collect();
            let message = if near.is_empty() {
                "unexpected end of input (unbalanced parentheses?)".to_string()
            } else {
                format!("unexpected input near {near:?}")
            };
            PddlError::Syntax { line, message }
        }
        nom::Err::Incomplete(_) => PddlError::Syntax {
            line: text.matches('\n').count() + 1,
            message: "incomplete input".to_string(),
        },
    }
}
