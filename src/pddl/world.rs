//! Grounded view of a domain/problem pair.
//!
//! `World` is the execution surface used by matching and simulation. All
//! enumeration is deterministic: schemas in domain order, objects in
//! declaration order (domain constants first, then problem objects), with
//! the last parameter varying fastest.
use super::sexpr::parse_one;
use super::syntax::parse_invariant;
use super::{
    Action, ActionSchema, Atom, AtomPattern, Domain, Effect, ExecError, Formula, PddlError,
    Problem, State, Term, TypedName,
};
use std::collections::BTreeMap;

type Bindings = BTreeMap<String, String>;

#[derive(Debug, Clone)]
pub struct World {
    domain: Domain,
    problem: Problem,
    universe: Vec<TypedName>,
}

impl World {
    pub fn new(domain: Domain, problem: Problem) -> Self {
        if !problem.domain.is_empty() && problem.domain != domain.name {
            tracing::warn!(
                problem_domain = %problem.domain,
                domain = %domain.name,
                "problem declares a different domain"
            );
        }
        let mut universe: Vec<TypedName> = Vec::new();
        for declared in domain.constants.iter().chain(problem.objects.iter()) {
            if !universe.iter().any(|known| known.name == declared.name) {
                universe.push(declared.clone());
            }
        }
        Self {
            domain,
            problem,
            universe,
        }
    }

    pub fn parse(domain_text: &str, problem_text: &str) -> Result<Self, PddlError> {
        Ok(Self::new(
            Domain::parse(domain_text)?,
            Problem::parse(problem_text)?,
        ))
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    pub fn initial_state(&self) -> State {
        State::new(self.problem.init.clone())
    }

    pub fn goal(&self) -> &Formula {
        &self.problem.goal
    }

    pub fn safety_constraint(&self) -> Option<&Formula> {
        self.problem.constraints.as_ref()
    }

    /// Problem objects with their types, in declaration order.
    pub fn objects(&self) -> &[TypedName] {
        &self.problem.objects
    }

    /// Parse a standalone constraint, accepting the same forms as `:constraints`.
    pub fn parse_constraint(&self, text: &str) -> Result<Formula, PddlError> {
        parse_invariant(&parse_one(text)?)
    }

    /// Every ground action whose precondition holds in `state`.
    pub fn available(&self, state: &State) -> Vec<Action> {
        let mut actions = Vec::new();
        for schema in &self.domain.actions {
            let candidates: Vec<Vec<&str>> = schema
                .parameters
                .iter()
                .map(|param| self.objects_of(&param.types))
                .collect();
            let mut binding = Bindings::new();
            self.ground_schema(schema, &candidates, 0, &mut binding, state, &mut actions);
        }
        actions
    }

    pub fn is_available(&self, state: &State, action: &Action) -> bool {
        match self.bind(action) {
            Ok((schema, binding)) => self.holds(state, &schema.precondition, &binding),
            Err(_) => false,
        }
    }

    /// Apply `action` to `state`, returning the successor.
    pub fn execute(&self, state: &State, action: &Action) -> Result<State, ExecError> {
        let (schema, binding) = self.bind(action)?;
        if !self.holds(state, &schema.precondition, &binding) {
            return Err(ExecError::PreconditionUnsatisfied {
                action: action.to_string(),
            });
        }
        let mut adds = Vec::new();
        let mut deletes = Vec::new();
        self.collect_effects(
            action,
            state,
            &schema.effect,
            &binding,
            &mut adds,
            &mut deletes,
        )?;
        Ok(state.successor(&deletes, adds))
    }

    pub fn satisfies(&self, state: &State, formula: &Formula) -> bool {
        self.holds(state, formula, &Bindings::new())
    }

    fn ground_schema(
        &self,
        schema: &ActionSchema,
        candidates: &[Vec<&str>],
        depth: usize,
        binding: &mut Bindings,
        state: &State,
        out: &mut Vec<Action>,
    ) {
        let Some(param) = schema.parameters.get(depth) else {
            if self.holds(state, &schema.precondition, binding) {
                let args = schema
                    .parameters
                    .iter()
                    .map(|param| binding[&param.name].clone())
                    .collect();
                out.push(Action::new(schema.name.clone(), args));
            }
            return;
        };
        for object in &candidates[depth] {
            binding.insert(param.name.clone(), (*object).to_string());
            self.ground_schema(schema, candidates, depth + 1, binding, state, out);
            binding.remove(&param.name);
        }
    }

    fn bind<'a>(&'a self, action: &Action) -> Result<(&'a ActionSchema, Bindings), ExecError> {
        let schema = self
            .domain
            .schema(&action.name)
            .ok_or_else(|| ExecError::UnknownAction {
                name: action.name.clone(),
            })?;
        if schema.parameters.len() != action.args.len() {
            return Err(ExecError::ArityMismatch {
                action: action.to_string(),
                expected: schema.parameters.len(),
                found: action.args.len(),
            });
        }
        let mut binding = Bindings::new();
        for (param, arg) in schema.parameters.iter().zip(&action.args) {
            let object = self
                .universe
                .iter()
                .find(|object| &object.name == arg)
                .ok_or_else(|| ExecError::UnknownObject {
                    action: action.to_string(),
                    object: arg.clone(),
                })?;
            if !self.has_type(object, &param.types) {
                return Err(ExecError::TypeMismatch {
                    action: action.to_string(),
                    object: arg.clone(),
                    expected: param.types.join("|"),
                });
            }
            binding.insert(param.name.clone(), arg.clone());
        }
        Ok((schema, binding))
    }

    fn has_type(&self, object: &TypedName, wanted: &[String]) -> bool {
        object.types.iter().any(|ty| {
            wanted
                .iter()
                .any(|target| self.domain.is_subtype(ty, target))
        })
    }

    fn objects_of(&self, wanted: &[String]) -> Vec<&str> {
        self.universe
            .iter()
            .filter(|object| self.has_type(object, wanted))
            .map(|object| object.name.as_str())
            .collect()
    }

    fn assignments(&self, vars: &[TypedName], binding: &Bindings) -> Vec<Bindings> {
        let mut out = vec![binding.clone()];
        for var in vars {
            let objects = self.objects_of(&var.types);
            out = out
                .into_iter()
                .flat_map(|partial| {
                    objects.iter().map(move |object| {
                        let mut next = partial.clone();
                        next.insert(var.name.clone(), (*object).to_string());
                        next
                    })
                })
                .collect();
        }
        out
    }

    fn resolve<'a>(term: &'a Term, binding: &'a Bindings) -> Option<&'a str> {
        match term {
            Term::Const(name) => Some(name),
            Term::Var(name) => binding.get(name).map(String::as_str),
        }
    }

    fn ground_atom(pattern: &AtomPattern, binding: &Bindings) -> Result<Atom, String> {
        let args = pattern
            .terms
            .iter()
            .map(|term| {
                Self::resolve(term, binding)
                    .map(str::to_string)
                    .ok_or_else(|| match term {
                        Term::Var(name) | Term::Const(name) => name.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Atom::new(pattern.predicate.clone(), args))
    }

    fn holds(&self, state: &State, formula: &Formula, binding: &Bindings) -> bool {
        match formula {
            Formula::True => true,
            Formula::Atom(pattern) => Self::ground_atom(pattern, binding)
                .map(|atom| state.holds(&atom))
                .unwrap_or(false),
            Formula::Eq(lhs, rhs) => {
                match (Self::resolve(lhs, binding), Self::resolve(rhs, binding)) {
                    (Some(lhs), Some(rhs)) => lhs == rhs,
                    _ => false,
                }
            }
            Formula::Not(inner) => !self.holds(state, inner, binding),
            Formula::And(parts) => parts.iter().all(|part| self.holds(state, part, binding)),
            Formula::Or(parts) => parts.iter().any(|part| self.holds(state, part, binding)),
            Formula::Imply(lhs, rhs) => {
                !self.holds(state, lhs, binding) || self.holds(state, rhs, binding)
            }
            Formula::Exists(vars, body) => self
                .assignments(vars, binding)
                .iter()
                .any(|inner| self.holds(state, body, inner)),
            Formula::Forall(vars, body) => self
                .assignments(vars, binding)
                .iter()
                .all(|inner| self.holds(state, body, inner)),
        }
    }

    /// Effects read the pre-state: conditions of `when` see `state`, not the
    /// partially updated successor.
    fn collect_effects(
        &self,
        action: &Action,
        state: &State,
        effect: &Effect,
        binding: &Bindings,
        adds: &mut Vec<Atom>,
        deletes: &mut Vec<Atom>,
    ) -> Result<(), ExecError> {
        let unbound = |variable: String| ExecError::UnboundVariable {
            action: action.to_string(),
            variable,
        };
        match effect {
            Effect::Add(pattern) => adds.push(Self::ground_atom(pattern, binding).map_err(unbound)?),
            Effect::Del(pattern) => {
                deletes.push(Self::ground_atom(pattern, binding).map_err(unbound)?)
            }
            Effect::And(parts) => {
                for part in parts {
                    self.collect_effects(action, state, part, binding, adds, deletes)?;
                }
            }
            Effect::Forall(vars, body) => {
                for inner in self.assignments(vars, binding) {
                    self.collect_effects(action, state, body, &inner, adds, deletes)?;
                }
            }
            Effect::When(condition, body) => {
                if self.holds(state, condition, binding) {
                    self.collect_effects(action, state, body, binding, adds, deletes)?;
                }
            }
        }
        Ok(())
    }
}
