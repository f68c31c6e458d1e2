//! The physical join strategies registered with the
//! [JoinEngine](crate::engine::JoinEngine).

mod hash_join;
mod multi_smallest;
mod nested_loop;
mod symmetric_hash_join;
mod trivial;

pub use hash_join::HashJoin;
pub use multi_smallest::MultiSmallestJoin;
pub use nested_loop::NestedLoopJoin;
pub use symmetric_hash_join::SymmetricHashJoin;
pub use trivial::{NoneJoin, SingleJoin};

use crate::engine::{JoinEntry, StrategyRefusal};
use itertools::Itertools;
use rdf_junction_common::JoinEvaluationError;
use rdf_junction_model::Variable;

/// The union of two variable sets, preserving the left-to-right order of first
/// occurrence.
pub(crate) fn union_variables(left: &[Variable], right: &[Variable]) -> Vec<Variable> {
    left.iter().chain(right).unique().cloned().collect()
}

/// The variables bound by both sides, i.e. the join key.
pub(crate) fn shared_variables(left: &[Variable], right: &[Variable]) -> Vec<Variable> {
    left.iter()
        .filter(|&variable| right.contains(variable))
        .cloned()
        .collect()
}

/// Refuses every entry set that does not contain exactly two entries.
pub(crate) fn two_entries(
    entries: &[JoinEntry],
) -> Result<(&JoinEntry, &JoinEntry), StrategyRefusal> {
    match entries {
        [left, right] => Ok((left, right)),
        _ => Err(StrategyRefusal::new(format!(
            "requires exactly two entries, got {}",
            entries.len()
        ))),
    }
}

/// Moves a binary entry set out of its vector.
///
/// Only reachable when [two_entries] accepted the same set during selection, so a
/// mismatch is an engine bug.
pub(crate) fn into_two_entries(
    entries: Vec<JoinEntry>,
) -> Result<(JoinEntry, JoinEntry), JoinEvaluationError> {
    let [left, right]: [JoinEntry; 2] = entries.try_into().map_err(|_| {
        JoinEvaluationError::Internal("a binary join ran with a non-binary entry set".into())
    })?;
    Ok((left, right))
}

/// Splits a binary entry set into the side to materialize (smaller estimate) and the
/// side to stream.
pub(crate) fn split_build_probe(left: JoinEntry, right: JoinEntry) -> (JoinEntry, JoinEntry) {
    if left.cardinality.value <= right.cardinality.value {
        (left, right)
    } else {
        (right, left)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Variable {
        Variable::new(name).unwrap()
    }

    #[test]
    fn union_preserves_first_occurrence_order() {
        let left = [var("a"), var("b")];
        let right = [var("b"), var("c")];
        assert_eq!(
            union_variables(&left, &right),
            vec![var("a"), var("b"), var("c")]
        );
    }

    #[test]
    fn shared_variables_form_the_join_key() {
        let left = [var("a"), var("b")];
        let right = [var("b"), var("c")];
        assert_eq!(shared_variables(&left, &right), vec![var("b")]);
        assert!(shared_variables(&left, &[var("c")]).is_empty());
    }
}
