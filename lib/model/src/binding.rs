use oxrdf::{Term, Variable};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// An immutable mapping from [Variable]s to RDF [Term]s.
///
/// A [Binding] represents one matched row of a query solution. It is the unit of data
/// that flows through every bindings stream. Bindings are cheap to clone as the
/// underlying map is shared; once constructed, a binding is never mutated. Combining
/// two bindings goes through [Binding::merge], which enforces the join semantics of
/// solution mappings: both sides must agree on every shared variable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Binding {
    terms: Arc<BTreeMap<Variable, Term>>,
}

impl Binding {
    /// Creates the empty binding, which binds no variables.
    ///
    /// The empty binding is compatible with every other binding and acts as the
    /// identity element of [Binding::merge].
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the term bound to `variable`, if any.
    pub fn get(&self, variable: &Variable) -> Option<&Term> {
        self.terms.get(variable)
    }

    /// Returns whether `variable` is bound.
    pub fn contains(&self, variable: &Variable) -> bool {
        self.terms.contains_key(variable)
    }

    /// The number of bound variables.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Returns whether no variable is bound.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Iterates over the bound variables.
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.terms.keys()
    }

    /// Iterates over all `(variable, term)` pairs of this binding.
    pub fn iter(&self) -> impl Iterator<Item = (&Variable, &Term)> {
        self.terms.iter()
    }

    /// Returns whether `self` and `other` agree on every variable bound by both.
    ///
    /// Compatibility is checked by structural equality of the bound terms. Two
    /// bindings with disjoint variable sets are always compatible.
    pub fn is_compatible_with(&self, other: &Self) -> bool {
        self.iter()
            .all(|(variable, term)| other.get(variable).map_or(true, |t| t == term))
    }

    /// Merges `self` and `other` into their disjoint union, if they are compatible.
    ///
    /// Returns `None` when the bindings disagree on a shared variable. The variable
    /// set of the result is the union of both inputs' variable sets.
    pub fn merge(&self, other: &Self) -> Option<Self> {
        let mut terms = (*self.terms).clone();
        for (variable, term) in other.iter() {
            match terms.get(variable) {
                Some(existing) if existing != term => return None,
                Some(_) => {}
                None => {
                    terms.insert(variable.clone(), term.clone());
                }
            }
        }
        Some(Self {
            terms: Arc::new(terms),
        })
    }
}

impl FromIterator<(Variable, Term)> for Binding {
    fn from_iter<I: IntoIterator<Item = (Variable, Term)>>(iter: I) -> Self {
        Self {
            terms: Arc::new(iter.into_iter().collect()),
        }
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (variable, term)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{variable} -> {term}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxrdf::NamedNode;

    fn var(name: &str) -> Variable {
        Variable::new(name).unwrap()
    }

    fn iri(suffix: &str) -> Term {
        NamedNode::new(format!("http://example.com/{suffix}"))
            .unwrap()
            .into()
    }

    #[test]
    fn merge_of_compatible_bindings_is_disjoint_union() {
        let left = Binding::from_iter([(var("x"), iri("1")), (var("y"), iri("2"))]);
        let right = Binding::from_iter([(var("x"), iri("1")), (var("z"), iri("3"))]);

        let merged = left.merge(&right).unwrap();
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.get(&var("x")), Some(&iri("1")));
        assert_eq!(merged.get(&var("y")), Some(&iri("2")));
        assert_eq!(merged.get(&var("z")), Some(&iri("3")));
    }

    #[test]
    fn merge_of_incompatible_bindings_fails() {
        let left = Binding::from_iter([(var("x"), iri("1"))]);
        let right = Binding::from_iter([(var("x"), iri("2"))]);

        assert!(!left.is_compatible_with(&right));
        assert_eq!(left.merge(&right), None);
    }

    #[test]
    fn empty_binding_is_merge_identity() {
        let binding = Binding::from_iter([(var("x"), iri("1"))]);

        assert_eq!(Binding::empty().merge(&binding), Some(binding.clone()));
        assert_eq!(binding.merge(&Binding::empty()), Some(binding));
    }

    #[test]
    fn equality_ignores_insertion_order() {
        let ab = Binding::from_iter([(var("a"), iri("1")), (var("b"), iri("2"))]);
        let ba = Binding::from_iter([(var("b"), iri("2")), (var("a"), iri("1"))]);
        assert_eq!(ab, ba);
    }
}
