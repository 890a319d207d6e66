//! Problem definitions: objects, initial facts, goal, and safety constraint.
use super::sexpr::{parse_one, SExpr};
use super::syntax::{parse_formula, parse_invariant, parse_typed_list};
use super::{malformed, Atom, Formula, PddlError, TypedName};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub name: String,
    pub domain: String,
    pub objects: Vec<TypedName>,
    pub init: BTreeSet<Atom>,
    pub goal: Formula,
    /// State invariant from `:constraints`; `None` means no safety obligation.
    pub constraints: Option<Formula>,
}

impl Problem {
    pub fn parse(text: &str) -> Result<Self, PddlError> {
        let expr = parse_one(text)?;
        let items = expr
            .as_list()
            .filter(|items| items.first().and_then(SExpr::as_atom) == Some("define"))
            .ok_or_else(|| malformed("problem", "expected (define (problem <name>) ...)"))?;

        let mut name = None;
        let mut domain = String::new();
        let mut objects = Vec::new();
        let mut init = BTreeSet::new();
        let mut goal = None;
        let mut constraints = None;

        for section in &items[1..] {
            let parts = section
                .as_list()
                .ok_or_else(|| malformed("problem", format!("unexpected atom {section}")))?;
            let single = || {
                parts
                    .get(1)
                    .filter(|_| parts.len() == 2)
                    .ok_or_else(|| malformed("problem", format!("expected one value in {section}")))
            };
            match section.head() {
                Some("problem") => {
                    name = single()?.as_atom().map(str::to_string);
                }
                Some(":domain") => {
                    domain = single()?
                        .as_atom()
                        .ok_or_else(|| malformed("problem", "domain name must be a name"))?
                        .to_string();
                }
                Some(":objects") => objects = parse_typed_list(&parts[1..])?,
                Some(":init") => {
                    for fact in &parts[1..] {
                        init.insert(parse_init_fact(fact)?);
                    }
                }
                Some(":goal") => goal = Some(parse_formula(single()?)?),
                Some(":constraints") => constraints = Some(parse_invariant(single()?)?),
                Some(":metric") => {
                    tracing::debug!("ignoring :metric section");
                }
                _ => {
                    return Err(malformed(
                        "problem",
                        format!("unknown section {}", section.head().unwrap_or("()")),
                    ))
                }
            }
        }

        Ok(Problem {
            name: name.ok_or_else(|| malformed("problem", "missing (problem <name>)"))?,
            domain,
            objects,
            init,
            goal: goal.ok_or_else(|| malformed("problem", "missing :goal"))?,
            constraints,
        })
    }
}

fn parse_init_fact(fact: &SExpr) -> Result<Atom, PddlError> {
    let items = fact
        .as_list()
        .ok_or_else(|| malformed("init", format!("expected a fact, found {fact}")))?;
    match fact.head() {
        Some("=") => Err(PddlError::Unsupported(format!("numeric fluent {fact}"))),
        Some("not") => Err(malformed(
            "init",
            format!("negative facts are implicit: {fact}"),
        )),
        Some(predicate) => {
            let args = items[1..]
                .iter()
                .map(|arg| {
                    arg.as_atom()
                        .filter(|atom| !atom.starts_with('?'))
                        .map(str::to_string)
                        .ok_or_else(|| malformed("init", format!("non-ground fact {fact}")))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Atom::new(predicate, args))
        }
        None => Err(malformed("init", format!("expected a fact, found {fact}"))),
    }
}
