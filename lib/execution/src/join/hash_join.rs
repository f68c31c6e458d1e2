use crate::coefficients::JoinCoefficients;
use crate::engine::{JoinEngine, JoinEntry, JoinStrategy, JoinedResults, StrategyRefusal};
use crate::hash::hash_bindings;
use crate::join::{
    into_two_entries, shared_variables, split_build_probe, two_entries, union_variables,
};
use crate::stream::{BindingsStream, SendableBindingsStream};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use rdf_junction_common::JoinResult;
use rdf_junction_model::{Binding, Variable};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

/// The build-then-probe hash join.
///
/// The side with the smaller cardinality estimate (the build side) is fully
/// materialized into a bucket map before any output is produced; the other side (the
/// probe side) is then streamed against it with constant additional buffering. This
/// is the cheapest binary join when the build side is known to be small, and
/// inapplicable when it is not: the strategy refuses entry sets whose smaller side
/// only has a guessed cardinality, since materializing an unbounded stream must not
/// happen on a guess.
#[derive(Debug, Default)]
pub struct HashJoin;

#[async_trait]
impl JoinStrategy for HashJoin {
    fn name(&self) -> &str {
        "hash"
    }

    fn test(&self, entries: &[JoinEntry]) -> Result<JoinCoefficients, StrategyRefusal> {
        let (left, right) = two_entries(entries)?;
        let build = if left.cardinality.value <= right.cardinality.value {
            left
        } else {
            right
        };
        if !build.cardinality.is_finite_exact() {
            return Err(StrategyRefusal::new(
                "the build side cardinality is not an exact count",
            ));
        }
        Ok(JoinCoefficients {
            iterations: left.cardinality.value + right.cardinality.value,
            persisted_items: build.cardinality.value,
            blocking_items: build.cardinality.value,
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
        let (build, probe) = split_build_probe(left, right);
        let variables = union_variables(&build.variables, &probe.variables);
        let join_variables = shared_variables(&build.variables, &probe.variables);
        let stream =
            HashJoinStream::new(build.stream, probe.stream, join_variables, variables.clone());
        Ok(JoinedResults {
            stream: Box::pin(stream),
            variables,
            cardinality,
        })
    }
}

/// The streaming state machine behind [HashJoin].
struct HashJoinStream {
    /// The current phase of the join.
    state: HashJoinState,
    /// The variables bindings of this stream may bind.
    variables: Vec<Variable>,
    /// The variables hashed to form bucket keys.
    join_variables: Vec<Variable>,
    /// The materialized build side. Keys can collide; probes re-check compatibility.
    buckets: FxHashMap<u64, Vec<Binding>>,
    /// Matches of the last probed binding not yet handed to the consumer.
    pending: VecDeque<Binding>,
}

enum HashJoinState {
    /// Materializing the build side into the bucket map. No output before the build
    /// side has ended.
    Building {
        build: SendableBindingsStream,
        probe: SendableBindingsStream,
    },
    /// Streaming the probe side against the completed bucket map.
    Probing { probe: SendableBindingsStream },
    /// All results have been emitted.
    Ended,
    /// A terminal error has been emitted; both inputs are already released.
    Failed,
}

impl HashJoinStream {
    fn new(
        build: SendableBindingsStream,
        probe: SendableBindingsStream,
        join_variables: Vec<Variable>,
        variables: Vec<Variable>,
    ) -> Self {
        Self {
            state: HashJoinState::Building { build, probe },
            variables,
            join_variables,
            buckets: FxHashMap::default(),
            pending: VecDeque::new(),
        }
    }

    fn poll_inner(&mut self, cx: &mut Context<'_>) -> Poll<Option<JoinResult<Binding>>> {
        loop {
            if let Some(binding) = self.pending.pop_front() {
                return Poll::Ready(Some(Ok(binding)));
            }

            match &mut self.state {
                HashJoinState::Building { build, .. } => {
                    match ready!(build.poll_next_unpin(cx)) {
                        Some(Ok(binding)) => {
                            let key = hash_bindings(&binding, &self.join_variables);
                            self.buckets.entry(key).or_default().push(binding);
                        }
                        Some(Err(error)) => {
                            // Dropping the state releases both inputs.
                            self.state = HashJoinState::Failed;
                            self.buckets = FxHashMap::default();
                            return Poll::Ready(Some(Err(error)));
                        }
                        None => {
                            let previous =
                                std::mem::replace(&mut self.state, HashJoinState::Ended);
                            if let HashJoinState::Building { probe, .. } = previous {
                                // The build side is complete and can be released;
                                // probing may start.
                                self.state = HashJoinState::Probing { probe };
                            }
                        }
                    }
                }
                HashJoinState::Probing { probe } => match ready!(probe.poll_next_unpin(cx)) {
                    Some(Ok(binding)) => {
                        let key = hash_bindings(&binding, &self.join_variables);
                        if let Some(bucket) = self.buckets.get(&key) {
                            for candidate in bucket {
                                if let Some(merged) = candidate.merge(&binding) {
                                    self.pending.push_back(merged);
                                }
                            }
                        }
                    }
                    Some(Err(error)) => {
                        self.state = HashJoinState::Failed;
                        self.buckets = FxHashMap::default();
                        return Poll::Ready(Some(Err(error)));
                    }
                    None => {
                        self.state = HashJoinState::Ended;
                        self.buckets = FxHashMap::default();
                    }
                },
                HashJoinState::Ended | HashJoinState::Failed => return Poll::Ready(None),
            }
        }
    }
}

impl Stream for HashJoinStream {
    type Item = JoinResult<Binding>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().poll_inner(cx)
    }
}

impl BindingsStream for HashJoinStream {
    fn variables(&self) -> &[Variable] {
        &self.variables
    }
}
