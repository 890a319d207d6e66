//! Domain definitions: types, constants, predicates, action schemas.
use super::sexpr::{parse_one, SExpr};
use super::syntax::{parse_effect, parse_formula, parse_typed_list, OBJECT_TYPE};
use super::{malformed, Effect, Formula, PddlError, TypedName};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSchema {
    pub name: String,
    pub parameters: Vec<TypedName>,
    pub precondition: Formula,
    pub effect: Effect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain {
    pub name: String,
    pub requirements: Vec<String>,
    /// Declared type -> supertypes.
    pub types: BTreeMap<String, Vec<String>>,
    pub constants: Vec<TypedName>,
    /// Predicate name -> arity.
    pub predicates: BTreeMap<String, usize>,
    pub actions: Vec<ActionSchema>,
}

impl Domain {
    pub fn parse(text: &str) -> Result<Self, PddlError> {
        let expr = parse_one(text)?;
        let items = expr
            .as_list()
            .filter(|items| items.first().and_then(SExpr::as_atom) == Some("define"))
            .ok_or_else(|| malformed("domain", "expected (define (domain <name>) ...)"))?;

        let mut domain = Domain {
            name: String::new(),
            requirements: Vec::new(),
            types: BTreeMap::new(),
            constants: Vec::new(),
            predicates: BTreeMap::new(),
            actions: Vec::new(),
        };

        for section in &items[1..] {
            let parts = section
                .as_list()
                .ok_or_else(|| malformed("domain", format!("unexpected atom {section}")))?;
            match section.head() {
                Some("domain") => {
                    domain.name = parts
                        .get(1)
                        .and_then(SExpr::as_atom)
                        .ok_or_else(|| malformed("domain", "missing domain name"))?
                        .to_string();
                }
                Some(":requirements") => {
                    domain.requirements = parts[1..]
                        .iter()
                        .filter_map(SExpr::as_atom)
                        .map(str::to_string)
                        .collect();
                }
                Some(":types") => {
                    for declared in parse_typed_list(&parts[1..])? {
                        let parents = domain.types.entry(declared.name).or_default();
                        for parent in declared.types {
                            if !parents.contains(&parent) {
                                parents.push(parent);
                            }
                        }
                    }
                }
                Some(":constants") => domain.constants = parse_typed_list(&parts[1..])?,
                Some(":predicates") => {
                    for decl in &parts[1..] {
                        let decl_items = decl.as_list().unwrap_or_default();
                        let name = decl_items
                            .first()
                            .and_then(SExpr::as_atom)
                            .ok_or_else(|| malformed("predicate", decl.to_string()))?;
                        let arity = parse_typed_list(&decl_items[1..])?.len();
                        domain.predicates.insert(name.to_string(), arity);
                    }
                }
                Some(":action") => domain.actions.push(parse_action_schema(parts)?),
                Some(":functions") => {
                    tracing::debug!(domain = %domain.name, "ignoring :functions declaration");
                }
                Some(other @ (":derived" | ":durative-action")) => {
                    return Err(PddlError::Unsupported(other.to_string()));
                }
                _ => {
                    return Err(malformed(
                        "domain",
                        format!("unknown section {}", section.head().unwrap_or("()")),
                    ))
                }
            }
        }

        if domain.name.is_empty() {
            return Err(malformed("domain", "missing (domain <name>)"));
        }
        Ok(domain)
    }

    pub fn schema(&self, name: &str) -> Option<&ActionSchema> {
        self.actions.iter().find(|schema| schema.name == name)
    }

    /// True when `ty` is `ancestor` or inherits from it.
    pub fn is_subtype(&self, ty: &str, ancestor: &str) -> bool {
        if ancestor == OBJECT_TYPE || ty == ancestor {
            return true;
        }
        let mut frontier = vec![ty];
        let mut seen: Vec<&str> = Vec::new();
        while let Some(current) = frontier.pop() {
            if current == ancestor {
                return true;
            }
            if seen.contains(&current) {
                continue;
            }
            seen.push(current);
            if let Some(parents) = self.types.get(current) {
                frontier.extend(parents.iter().map(String::as_str));
            }
        }
        false
    }
}

fn parse_action_schema(parts: &[SExpr]) -> Result<ActionSchema, PddlError> {
    let name = parts
        .get(1)
        .and_then(SExpr::as_atom)
        .ok_or_else(|| malformed("action", "missing action name"))?
        .to_string();
    let mut schema = ActionSchema {
        name,
        parameters: Vec::new(),
        precondition: Formula::True,
        effect: Effect::And(Vec::new()),
    };

    let mut rest = parts[2..].iter();
    while let Some(key) = rest.next() {
        let value = rest.next().ok_or_else(|| {
            malformed("action", format!("{}: missing value for {key}", schema.name))
        })?;
        match key.as_atom() {
            Some(":parameters") => {
                let params = value.as_list().ok_or_else(|| {
                    malformed("action", format!("{}: parameters must be a list", schema.name))
                })?;
                schema.parameters = parse_typed_list(params)?;
                let mut seen = BTreeSet::new();
                if let Some(dup) = schema
                    .parameters
                    .iter()
                    .find(|param| !seen.insert(param.name.as_str()))
                {
                    return Err(malformed(
                        "action",
                        format!("{}: duplicate parameter {}", schema.name, dup.name),
                    ));
                }
            }
            Some(":precondition") => schema.precondition = parse_formula(value)?,
            Some(":effect") => schema.effect = parse_effect(value)?,
            _ => {
                return Err(malformed(
                    "action",
                    format!("{}: unknown key {key}", schema.name),
                ))
            }
        }
    }
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGISTICS: &str = r#"
        (define (domain Logistics)
          (:requirements :strips :typing)
          (:types truck package - object depot shop - location)
          (:constants hq - depot)
          (:predicates (at ?x - object ?l - location) (in ?p - package ?t - truck))
          (:action Drive
            :parameters (?t - truck ?from ?to - location)
            :precondition (and (at ?t ?from) (not (= ?from ?to)))
            :effect (and (at ?t ?to) (not (at ?t ?from)))))
    "#;

    #[test]
    fn parses_domain_sections() {
        let domain = Domain::parse(LOGISTICS).unwrap();
        assert_eq!(domain.name, "logistics");
        assert_eq!(domain.requirements, vec![":strips", ":typing"]);
        assert_eq!(domain.constants[0].name, "hq");
        assert_eq!(domain.predicates.get("at"), Some(&2));
        let drive = domain.schema("drive").expect("drive schema");
        assert_eq!(drive.parameters.len(), 3);
        assert_eq!(drive.parameters[2].types, vec!["location"]);
    }

    #[test]
    fn subtype_walks_declared_hierarchy() {
        let domain = Domain::parse(LOGISTICS).unwrap();
        assert!(domain.is_subtype("depot", "location"));
        assert!(domain.is_subtype("truck", "object"));
        assert!(!domain.is_subtype("truck", "location"));
    }

    #[test]
    fn rejects_derived_predicates() {
        let text = "(define (domain d) (:derived (p ?x) (q ?x)))";
        assert!(matches!(
            Domain::parse(text),
            Err(PddlError::Unsupported(_))
        ));
    }

    #[test]
    fn rejects_repeated_parameter_names() {
        let text = "(define (domain d) (:predicates (p ?x)) \
            (:action a :parameters (?x ?x) :precondition (p ?x) :effect (not (p ?x))))";
        let err = Domain::parse(text).unwrap_err();
        assert!(matches!(err, PddlError::Malformed { context: "action", .. }));
        assert!(err.to_string().contains("duplicate parameter ?x"));
    }

    #[test]
    fn rejects_problem_text() {
        let text = "(define (problem p) (:domain d) (:init) (:goal (and)))";
        assert!(Domain::parse(text).is_err());
    }
}
