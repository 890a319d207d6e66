//! Lifted PDDL syntax: terms, typed lists, formulas, and effects.
use super::sexpr::SExpr;
use super::{malformed, PddlError};

/// Root of every type hierarchy.
pub const OBJECT_TYPE: &str = "object";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    /// `?name`, stored with its leading `?`.
    Var(String),
    Const(String),
}

impl Term {
    fn parse(expr: &SExpr) -> Result<Self, PddlError> {
        let atom = expr
            .as_atom()
            .ok_or_else(|| malformed("term", format!("expected a name, found {expr}")))?;
        if atom.starts_with('?') {
            Ok(Term::Var(atom.to_string()))
        } else {
            Ok(Term::Const(atom.to_string()))
        }
    }
}

/// A declared name with its admissible types (more than one for `either`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedName {
    pub name: String,
    pub types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomPattern {
    pub predicate: String,
    pub terms: Vec<Term>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Formula {
    True,
    Atom(AtomPattern),
    Eq(Term, Term),
    Not(Box<Formula>),
    And(Vec<Formula>),
    Or(Vec<Formula>),
    Imply(Box<Formula>, Box<Formula>),
    Exists(Vec<TypedName>, Box<Formula>),
    Forall(Vec<TypedName>, Box<Formula>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Add(AtomPattern),
    Del(AtomPattern),
    And(Vec<Effect>),
    Forall(Vec<TypedName>, Box<Effect>),
    When(Formula, Box<Effect>),
}

/// Parse `a b - t c - (either u v) d` into names with types. Untyped trailing
/// names default to `object`.
pub(crate) fn parse_typed_list(items: &[SExpr]) -> Result<Vec<TypedName>, PddlError> {
    let mut out = Vec::new();
    let mut pending: Vec<String> = Vec::new();
    let mut iter = items.iter();
    while let Some(item) = iter.next() {
        match item.as_atom() {
            Some("-") => {
                let ty = iter
                    .next()
                    .ok_or_else(|| malformed("typed list", "missing type after '-'"))?;
                let types = parse_type_ref(ty)?;
                if pending.is_empty() {
                    return Err(malformed("typed list", "type given without names"));
                }
                for name in pending.drain(..) {
                    out.push(TypedName {
                        name,
                        types: types.clone(),
                    });
                }
            }
            Some(name) => pending.push(name.to_string()),
            None => {
                return Err(malformed(
                    "typed list",
                    format!("expected a name, found {item}"),
                ))
            }
        }
    }
    for name in pending {
        out.push(TypedName {
            name,
            types: vec![OBJECT_TYPE.to_string()],
        });
    }
    Ok(out)
}

fn parse_type_ref(expr: &SExpr) -> Result<Vec<String>, PddlError> {
    if let Some(atom) = expr.as_atom() {
        return Ok(vec![atom.to_string()]);
    }
    let items = expr.as_list().unwrap_or_default();
    match items.split_first() {
        Some((head, rest)) if head.as_atom() == Some("either") && !rest.is_empty() => rest
            .iter()
            .map(|t| {
                t.as_atom()
                    .map(str::to_string)
                    .ok_or_else(|| malformed("either type", t.to_string()))
            })
            .collect(),
        _ => Err(malformed("type", expr.to_string())),
    }
}

fn parse_atom_pattern(predicate: &str, args: &[SExpr]) -> Result<AtomPattern, PddlError> {
    Ok(AtomPattern {
        predicate: predicate.to_string(),
        terms: args.iter().map(Term::parse).collect::<Result<_, _>>()?,
    })
}

fn parse_quantified_vars(expr: &SExpr) -> Result<Vec<TypedName>, PddlError> {
    let items = expr
        .as_list()
        .ok_or_else(|| malformed("quantifier", format!("expected variables, found {expr}")))?;
    parse_typed_list(items)
}

pub(crate) fn parse_formula(expr: &SExpr) -> Result<Formula, PddlError> {
    let items = expr
        .as_list()
        .ok_or_else(|| malformed("formula", format!("expected a list, found {expr}")))?;
    let Some((head, rest)) = items.split_first() else {
        return Ok(Formula::True);
    };
    let head = head
        .as_atom()
        .ok_or_else(|| malformed("formula", format!("expected an operator in {expr}")))?;
    match head {
        "and" => Ok(Formula::And(
            rest.iter().map(parse_formula).collect::<Result<_, _>>()?,
        )),
        "or" => Ok(Formula::Or(
            rest.iter().map(parse_formula).collect::<Result<_, _>>()?,
        )),
        "not" => {
            let [inner] = rest else {
                return Err(malformed("formula", format!("not takes one operand: {expr}")));
            };
            Ok(Formula::Not(Box::new(parse_formula(inner)?)))
        }
        "imply" => {
            let [lhs, rhs] = rest else {
                return Err(malformed("formula", format!("imply takes two operands: {expr}")));
            };
            Ok(Formula::Imply(
                Box::new(parse_formula(lhs)?),
                Box::new(parse_formula(rhs)?),
            ))
        }
        "exists" | "forall" => {
            let [vars, body] = rest else {
                return Err(malformed("formula", format!("{head} takes variables and a body: {expr}")));
            };
            let vars = parse_quantified_vars(vars)?;
            let body = Box::new(parse_formula(body)?);
            if head == "exists" {
                Ok(Formula::Exists(vars, body))
            } else {
                Ok(Formula::Forall(vars, body))
            }
        }
        "=" => {
            let [lhs, rhs] = rest else {
                return Err(malformed("formula", format!("= takes two terms: {expr}")));
            };
            Ok(Formula::Eq(Term::parse(lhs)?, Term::parse(rhs)?))
        }
        "<" | ">" | "<=" | ">=" => Err(PddlError::Unsupported(format!(
            "numeric comparison {expr}"
        ))),
        predicate => Ok(Formula::Atom(parse_atom_pattern(predicate, rest)?)),
    }
}

const TEMPORAL_MODALITIES: &[&str] = &[
    "sometime",
    "at-most-once",
    "sometime-after",
    "sometime-before",
    "within",
    "always-within",
    "hold-during",
    "hold-after",
];

/// Parse a `:constraints` body as a state invariant.
///
/// `(always φ)` and conjunctions whose members are all `always` unwrap to the
/// invariant; a plain formula is taken as the invariant itself.
pub(crate) fn parse_invariant(expr: &SExpr) -> Result<Formula, PddlError> {
    let items = expr.as_list().unwrap_or_default();
    match expr.head() {
        Some("always") => {
            let [_, inner] = items else {
                return Err(malformed("constraint", format!("always takes one operand: {expr}")));
            };
            parse_formula(inner)
        }
        Some("and") if items.len() > 1 && items[1..].iter().all(|c| c.head() == Some("always")) => {
            Ok(Formula::And(
                items[1..]
                    .iter()
                    .map(parse_invariant)
                    .collect::<Result<_, _>>()?,
            ))
        }
        Some(op) if TEMPORAL_MODALITIES.contains(&op) => Err(PddlError::Unsupported(format!(
            "temporal constraint {op}"
        ))),
        _ => parse_formula(expr),
    }
}

pub(crate) fn parse_effect(expr: &SExpr) -> Result<Effect, PddlError> {
    let items = expr
        .as_list()
        .ok_or_else(|| malformed("effect", format!("expected a list, found {expr}")))?;
    let Some((head, rest)) = items.split_first() else {
        return Ok(Effect::And(Vec::new()));
    };
    let head = head
        .as_atom()
        .ok_or_else(|| malformed("effect", format!("expected an operator in {expr}")))?;
    match head {
        "and" => Ok(Effect::And(
            rest.iter().map(parse_effect).collect::<Result<_, _>>()?,
        )),
        "not" => {
            let [inner] = rest else {
                return Err(malformed("effect", format!("not takes one atom: {expr}")));
            };
            let inner_items = inner.as_list().unwrap_or_default();
            match inner_items.split_first() {
                Some((pred, args)) => {
                    let pred = pred
                        .as_atom()
                        .ok_or_else(|| malformed("effect", inner.to_string()))?;
                    Ok(Effect::Del(parse_atom_pattern(pred, args)?))
                }
                None => Err(malformed("effect", format!("not expects an atom: {expr}"))),
            }
        }
        "forall" => {
            let [vars, body] = rest else {
                return Err(malformed("effect", format!("forall takes variables and a body: {expr}")));
            };
            Ok(Effect::Forall(
                parse_quantified_vars(vars)?,
                Box::new(parse_effect(body)?),
            ))
        }
        "when" => {
            let [cond, body] = rest else {
                return Err(malformed("effect", format!("when takes a condition and a body: {expr}")));
            };
            Ok(Effect::When(
                parse_formula(cond)?,
                Box::new(parse_effect(body)?),
            ))
        }
        "increase" | "decrease" | "assign" | "scale-up" | "scale-down" => Err(
            PddlError::Unsupported(format!("numeric effect {head}")),
        ),
        predicate => Ok(Effect::Add(parse_atom_pattern(predicate, rest)?)),
    }
}
