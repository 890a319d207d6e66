use std::collections::BTreeSet;
use std::fmt;

/// A ground fact such as `(on a b)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Atom {
    pub predicate: String,
    pub args: Vec<String>,
}

impl Atom {
    pub fn new(predicate: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            predicate: predicate.into(),
            args,
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.predicate)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        write!(f, ")")
    }
}

/// Closed-world set of true facts. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct State {
    facts: BTreeSet<Atom>,
}

impl State {
    pub fn new(facts: BTreeSet<Atom>) -> Self {
        Self { facts }
    }

    pub fn holds(&self, atom: &Atom) -> bool {
        self.facts.contains(atom)
    }

    pub fn facts(&self) -> impl Iterator<Item = &Atom> {
        self.facts.iter()
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// New state with `deletes` removed, then `adds` inserted.
    pub(crate) fn successor(&self, deletes: &[Atom], adds: Vec<Atom>) -> Self {
        let mut facts = self.facts.clone();
        for atom in deletes {
            facts.remove(atom);
        }
        facts.extend(adds);
        Self { facts }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, atom) in self.facts.iter().enumerate() {
            if idx > 0 {
                write!(f, " ")?;
            }
            write!(f, "{atom}")?;
        }
        Ok(())
    }
}
