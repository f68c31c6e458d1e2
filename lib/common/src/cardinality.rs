use std::fmt;

/// An estimate of how many bindings a stream will produce.
///
/// Cardinalities drive both the cost estimation of physical join strategies and the
/// ordering of multi-way join inputs. An estimate is either `exact` (the source has
/// counted its results) or a guess; strategies that must materialize a side may
/// refuse to run on guesses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cardinality {
    /// The estimated number of bindings.
    pub value: f64,
    /// Whether `value` is an exact count rather than an estimate.
    pub exact: bool,
}

impl Cardinality {
    /// An exact count of bindings.
    pub fn exact(value: f64) -> Self {
        Self { value, exact: true }
    }

    /// An inexact estimate of the number of bindings.
    pub fn estimate(value: f64) -> Self {
        Self {
            value,
            exact: false,
        }
    }

    /// Returns whether this cardinality is an exact, finite count.
    pub fn is_finite_exact(&self) -> bool {
        self.exact && self.value.is_finite()
    }

    /// The cardinality estimate of joining a stream of `self` bindings with a stream
    /// of `other` bindings.
    ///
    /// The product is an upper bound (reached only by a cross product), so the
    /// result is always an estimate.
    pub fn join_estimate(self, other: Self) -> Self {
        Self::estimate(self.value * other.value)
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.exact {
            write!(f, "{}", self.value)
        } else {
            write!(f, "~{}", self.value)
        }
    }
}
