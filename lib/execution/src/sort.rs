//! Ordering of multi-way join inputs by estimated cardinality.

use crate::engine::JoinEntry;

/// Reorders an n-ary join's entries before pairwise join construction.
///
/// Joining the smallest-estimated streams first minimizes intermediate result sizes
/// in the common case. This is a heuristic, not a guarantee: estimates can be wrong,
/// which is why sorters declare an [accuracy](EntriesSorter::accuracy) that lets the
/// engine prefer better-informed sorters when several are registered.
pub trait EntriesSorter: Send + Sync {
    /// The stable name of this sorter, used for registration and logging.
    fn name(&self) -> &str;

    /// The fraction of `entries` whose cardinality this sorter considers reliable
    /// (finite and exact). Higher wins; registration order breaks ties.
    fn accuracy(&self, entries: &[JoinEntry]) -> f64;

    /// Sorts `entries` ascending by estimated cardinality. Must be stable: entries
    /// with equal estimates keep their relative order.
    fn sort(&self, entries: Vec<JoinEntry>) -> Vec<JoinEntry>;
}

/// The default sorter: a stable ascending sort on the raw cardinality values.
#[derive(Debug, Default)]
pub struct CardinalitySorter;

impl EntriesSorter for CardinalitySorter {
    fn name(&self) -> &str {
        "cardinality"
    }

    #[allow(
        clippy::cast_precision_loss,
        reason = "entry counts are far below 2^52"
    )]
    fn accuracy(&self, entries: &[JoinEntry]) -> f64 {
        if entries.is_empty() {
            return 1.0;
        }
        let exact = entries
            .iter()
            .filter(|entry| entry.cardinality.is_finite_exact())
            .count();
        exact as f64 / entries.len() as f64
    }

    fn sort(&self, mut entries: Vec<JoinEntry>) -> Vec<JoinEntry> {
        entries.sort_by(|a, b| a.cardinality.value.total_cmp(&b.cardinality.value));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemoryBindingsStream;
    use rdf_junction_common::Cardinality;
    use rdf_junction_model::Variable;

    fn entry(name: &str, cardinality: Cardinality) -> JoinEntry {
        JoinEntry {
            stream: Box::pin(MemoryBindingsStream::new(Vec::new(), Vec::new())),
            variables: vec![Variable::new(name).unwrap()],
            cardinality,
        }
    }

    fn values(entries: &[JoinEntry]) -> Vec<f64> {
        entries.iter().map(|e| e.cardinality.value).collect()
    }

    #[test]
    fn sorts_ascending_by_cardinality() {
        let entries = vec![
            entry("a", Cardinality::exact(20.0)),
            entry("b", Cardinality::exact(10.0)),
            entry("c", Cardinality::exact(30.0)),
        ];
        let sorted = CardinalitySorter.sort(entries);
        assert_eq!(values(&sorted), vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn sort_is_stable_for_equal_estimates() {
        let entries = vec![
            entry("a", Cardinality::exact(10.0)),
            entry("b", Cardinality::exact(10.0)),
        ];
        let sorted = CardinalitySorter.sort(entries);
        assert_eq!(sorted[0].variables[0].as_str(), "a");
        assert_eq!(sorted[1].variables[0].as_str(), "b");
    }

    #[test]
    fn trivial_inputs_are_left_unchanged() {
        let single = CardinalitySorter.sort(vec![entry("a", Cardinality::exact(10.0))]);
        assert_eq!(values(&single), vec![10.0]);

        let empty = CardinalitySorter.sort(Vec::new());
        assert!(empty.is_empty());
    }

    #[test]
    fn accuracy_is_the_fraction_of_exact_estimates() {
        let entries = vec![
            entry("a", Cardinality::exact(10.0)),
            entry("b", Cardinality::estimate(10.0)),
            entry("c", Cardinality::exact(10.0)),
            entry("d", Cardinality::exact(f64::INFINITY)),
        ];
        assert_eq!(CardinalitySorter.accuracy(&entries), 0.5);
        assert_eq!(CardinalitySorter.accuracy(&[]), 1.0);
    }
}
