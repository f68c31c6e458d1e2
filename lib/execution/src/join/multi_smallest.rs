use crate::coefficients::JoinCoefficients;
use crate::engine::{JoinEngine, JoinEntry, JoinStrategy, JoinedResults, StrategyRefusal};
use async_trait::async_trait;
use rdf_junction_common::{JoinEvaluationError, JoinResult};

/// The n-ary join strategy: pairwise folding in ascending cardinality order.
///
/// The entries are ordered by the engine's entries sorter, the two smallest are
/// joined first (through full strategy selection, so the cheapest binary strategy
/// handles them), and the combined result re-enters the engine together with the
/// remaining entries. Folding smallest-first keeps intermediate results small in the
/// common case.
#[derive(Debug, Default)]
pub struct MultiSmallestJoin;

#[async_trait]
impl JoinStrategy for MultiSmallestJoin {
    fn name(&self) -> &str {
        "multi-smallest"
    }

    fn test(&self, entries: &[JoinEntry]) -> Result<JoinCoefficients, StrategyRefusal> {
        if entries.len() < 3 {
            return Err(StrategyRefusal::new("requires at least three entries"));
        }
        Ok(JoinCoefficients {
            iterations: entries.iter().map(|entry| entry.cardinality.value).sum(),
            persisted_items: 0.0,
            blocking_items: 0.0,
            request_time: 0.0,
        })
    }

    async fn run(
        &self,
        entries: Vec<JoinEntry>,
        engine: &JoinEngine,
    ) -> JoinResult<JoinedResults> {
        let mut sorted = engine.sort_entries(entries)?.into_iter();
        let (Some(first), Some(second)) = (sorted.next(), sorted.next()) else {
            return JoinEvaluationError::internal(
                "the multi-smallest join ran with fewer than two entries",
            );
        };
        let smallest = engine.join(vec![first, second]).await?;
        let remaining = std::iter::once(JoinEntry::from(smallest))
            .chain(sorted)
            .collect();
        engine.join(remaining).await
    }
}
