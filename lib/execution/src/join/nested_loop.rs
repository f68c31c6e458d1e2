use crate::coefficients::JoinCoefficients;
use crate::engine::{JoinEngine, JoinEntry, JoinStrategy, JoinedResults, StrategyRefusal};
use crate::join::{into_two_entries, split_build_probe, two_entries, union_variables};
use crate::stream::{BindingsStream, SendableBindingsStream};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use rdf_junction_common::JoinResult;
use rdf_junction_model::{Binding, Variable};
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

/// The nested loop join.
///
/// The smaller side is materialized into a plain list and every streamed binding of
/// the other side is checked against all of it. Quadratic in general, but with no
/// hashing overhead, which makes it the cheapest choice for very small inputs. It
/// also works when the entries share no variables at all (a pure cross product), for
/// which the bucket-based joins degenerate to the same behavior anyway.
#[derive(Debug, Default)]
pub struct NestedLoopJoin;

#[async_trait]
impl JoinStrategy for NestedLoopJoin {
    fn name(&self) -> &str {
        "nested-loop"
    }

    fn test(&self, entries: &[JoinEntry]) -> Result<JoinCoefficients, StrategyRefusal> {
        let (left, right) = two_entries(entries)?;
        let inner = left.cardinality.value.min(right.cardinality.value);
        Ok(JoinCoefficients {
            iterations: left.cardinality.value * right.cardinality.value,
            persisted_items: inner,
            blocking_items: inner,
            request_time: 0.0,
        })
    }

    async fn run(
        &self,
        entries: Vec<JoinEntry>,
        _engine: &JoinEngine,
    ) -> JoinResult<JoinedResults> {
        let (left, right) = into_two_entries(entries)?;
        let cardinality = left.cardinality.join_estimate(right.cardinality);
        let (inner, outer) = split_build_probe(left, right);
        let variables = union_variables(&inner.variables, &outer.variables);
        let stream = NestedLoopJoinStream::new(inner.stream, outer.stream, variables.clone());
        Ok(JoinedResults {
            stream: Box::pin(stream),
            variables,
            cardinality,
        })
    }
}

/// The streaming state machine behind [NestedLoopJoin].
struct NestedLoopJoinStream {
    state: NestedLoopState,
    /// The variables bindings of this stream may bind.
    variables: Vec<Variable>,
    /// The materialized inner side.
    buffered: Vec<Binding>,
    /// Matches of the last outer binding not yet handed to the consumer.
    pending: VecDeque<Binding>,
}

enum NestedLoopState {
    /// Materializing the inner side.
    Buffering {
        inner: SendableBindingsStream,
        outer: SendableBindingsStream,
    },
    /// Scanning the outer side against the buffered inner side.
    Scanning { outer: SendableBindingsStream },
    /// All results have been emitted.
    Ended,
    /// A terminal error has been emitted; both inputs are already released.
    Failed,
}

impl NestedLoopJoinStream {
    fn new(
        inner: SendableBindingsStream,
        outer: SendableBindingsStream,
        variables: Vec<Variable>,
    ) -> Self {
        Self {
            state: NestedLoopState::Buffering { inner, outer },
            variables,
            buffered: Vec::new(),
            pending: VecDeque::new(),
        }
    }

    fn poll_inner(&mut self, cx: &mut Context<'_>) -> Poll<Option<JoinResult<Binding>>> {
        loop {
            if let Some(binding) = self.pending.pop_front() {
                return Poll::Ready(Some(Ok(binding)));
            }

            match &mut self.state {
                NestedLoopState::Buffering { inner, .. } => {
                    match ready!(inner.poll_next_unpin(cx)) {
                        Some(Ok(binding)) => self.buffered.push(binding),
                        Some(Err(error)) => {
                            self.state = NestedLoopState::Failed;
                            self.buffered = Vec::new();
                            return Poll::Ready(Some(Err(error)));
                        }
                        None => {
                            let previous =
                                std::mem::replace(&mut self.state, NestedLoopState::Ended);
                            if let NestedLoopState::Buffering { outer, .. } = previous {
                                self.state = NestedLoopState::Scanning { outer };
                            }
                        }
                    }
                }
                NestedLoopState::Scanning { outer } => match ready!(outer.poll_next_unpin(cx)) {
                    Some(Ok(binding)) => {
                        for candidate in &self.buffered {
                            if let Some(merged) = candidate.merge(&binding) {
                                self.pending.push_back(merged);
                            }
                        }
                    }
                    Some(Err(error)) => {
                        self.state = NestedLoopState::Failed;
                        self.buffered = Vec::new();
                        return Poll::Ready(Some(Err(error)));
                    }
                    None => {
                        self.state = NestedLoopState::Ended;
                        self.buffered = Vec::new();
                    }
                },
                NestedLoopState::Ended | NestedLoopState::Failed => return Poll::Ready(None),
            }
        }
    }
}

impl Stream for NestedLoopJoinStream {
    type Item = JoinResult<Binding>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().poll_inner(cx)
    }
}

impl BindingsStream for NestedLoopJoinStream {
    fn variables(&self) -> &[Variable] {
        &self.variables
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemoryBindingsStream;
    use futures::TryStreamExt;
    use rdf_junction_model::{NamedNode, Term};

    fn var(name: &str) -> Variable {
        Variable::new(name).unwrap()
    }

    fn iri(value: u64) -> Term {
        NamedNode::new(format!("http://example.com/{value}"))
            .unwrap()
            .into()
    }

    #[tokio::test]
    async fn emits_every_compatible_combination() {
        let x = var("x");
        let y = var("y");
        let inner = Box::pin(MemoryBindingsStream::new(
            vec![x.clone()],
            vec![
                Binding::from_iter([(x.clone(), iri(1))]),
                Binding::from_iter([(x.clone(), iri(2))]),
            ],
        ));
        let outer = Box::pin(MemoryBindingsStream::new(
            vec![x.clone(), y.clone()],
            vec![
                Binding::from_iter([(x.clone(), iri(1)), (y.clone(), iri(9))]),
                Binding::from_iter([(x.clone(), iri(3)), (y.clone(), iri(7))]),
            ],
        ));

        let join = NestedLoopJoinStream::new(inner, outer, vec![x.clone(), y.clone()]);
        let results: Vec<Binding> = join.try_collect().await.unwrap();
        assert_eq!(
            results,
            vec![Binding::from_iter([(x, iri(1)), (y, iri(9))])]
        );
    }

    #[test]
    fn cost_is_quadratic_in_the_inputs() {
        use rdf_junction_common::Cardinality;

        let entries = vec![
            JoinEntry {
                stream: Box::pin(MemoryBindingsStream::new(Vec::new(), Vec::new())),
                variables: Vec::new(),
                cardinality: Cardinality::estimate(4.0),
            },
            JoinEntry {
                stream: Box::pin(MemoryBindingsStream::new(Vec::new(), Vec::new())),
                variables: Vec::new(),
                cardinality: Cardinality::estimate(3.0),
            },
        ];
        let coefficients = NestedLoopJoin.test(&entries).unwrap();
        assert_eq!(coefficients.iterations, 12.0);
        assert_eq!(coefficients.persisted_items, 3.0);
    }
}
