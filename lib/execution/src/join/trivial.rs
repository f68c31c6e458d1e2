use crate::coefficients::JoinCoefficients;
use crate::engine::{JoinEngine, JoinEntry, JoinStrategy, JoinedResults, StrategyRefusal};
use crate::stream::MemoryBindingsStream;
use async_trait::async_trait;
use rdf_junction_common::{Cardinality, JoinEvaluationError, JoinResult};
use rdf_junction_model::Binding;

/// The zero-entries join.
///
/// Joining nothing yields the identity element of the join: a stream with exactly
/// one empty binding and an empty variable set, with cardinality exactly 1.
#[derive(Debug, Default)]
pub struct NoneJoin;

#[async_trait]
impl JoinStrategy for NoneJoin {
    fn name(&self) -> &str {
        "none"
    }

    fn test(&self, entries: &[JoinEntry]) -> Result<JoinCoefficients, StrategyRefusal> {
        if entries.is_empty() {
            Ok(JoinCoefficients::ZERO)
        } else {
            Err(StrategyRefusal::new("requires zero entries"))
        }
    }

    async fn run(
        &self,
        entries: Vec<JoinEntry>,
        _engine: &JoinEngine,
    ) -> JoinResult<JoinedResults> {
        if !entries.is_empty() {
            return JoinEvaluationError::internal("the zero-entries join ran with entries");
        }
        Ok(JoinedResults {
            stream: Box::pin(MemoryBindingsStream::new(
                Vec::new(),
                vec![Binding::empty()],
            )),
            variables: Vec::new(),
            cardinality: Cardinality::exact(1.0),
        })
    }
}

/// The single-entry passthrough join.
///
/// Joining one entry is the entry itself: its stream, variable set and cardinality
/// are handed through without any transformation.
#[derive(Debug, Default)]
pub struct SingleJoin;

#[async_trait]
impl JoinStrategy for SingleJoin {
    fn name(&self) -> &str {
        "single"
    }

    fn test(&self, entries: &[JoinEntry]) -> Result<JoinCoefficients, StrategyRefusal> {
        if entries.len() == 1 {
            Ok(JoinCoefficients::ZERO)
        } else {
            Err(StrategyRefusal::new("requires exactly one entry"))
        }
    }

    async fn run(
        &self,
        entries: Vec<JoinEntry>,
        _engine: &JoinEngine,
    ) -> JoinResult<JoinedResults> {
        let [entry]: [JoinEntry; 1] = entries.try_into().map_err(|_| {
            JoinEvaluationError::Internal("the passthrough join ran without exactly one entry".into())
        })?;
        Ok(JoinedResults {
            stream: entry.stream,
            variables: entry.variables,
            cardinality: entry.cardinality,
        })
    }
}
