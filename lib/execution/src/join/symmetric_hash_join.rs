use crate::coefficients::JoinCoefficients;
use crate::engine::{JoinEngine, JoinEntry, JoinStrategy, JoinedResults, StrategyRefusal};
use crate::hash::hash_bindings;
use crate::join::{into_two_entries, shared_variables, two_entries, union_variables};
use crate::stream::{BindingsStream, SendableBindingsStream};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use rdf_junction_common::JoinResult;
use rdf_junction_model::{Binding, Variable};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

/// The symmetric hash join.
///
/// Both sides are hash-indexed incrementally and probed against each other's growing
/// index as data arrives, so results flow before either input is exhausted. This is
/// the strategy of choice when neither side can be safely materialized up front,
/// e.g. when both are network-sourced results with guessed cardinalities. The price
/// is memory: both sides are partially buffered until one of them ends.
#[derive(Debug, Default)]
pub struct SymmetricHashJoin;

#[async_trait]
impl JoinStrategy for SymmetricHashJoin {
    fn name(&self) -> &str {
        "symmetric-hash"
    }

    fn test(&self, entries: &[JoinEntry]) -> Result<JoinCoefficients, StrategyRefusal> {
        let (left, right) = two_entries(entries)?;
        let total = left.cardinality.value + right.cardinality.value;
        Ok(JoinCoefficients {
            iterations: total,
            persisted_items: total,
            blocking_items: 0.0,
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
        let variables = union_variables(&left.variables, &right.variables);
        let join_variables = shared_variables(&left.variables, &right.variables);
        let stream = SymmetricHashJoinStream::new(
            left.stream,
            right.stream,
            join_variables,
            variables.clone(),
        );
        Ok(JoinedResults {
            stream: Box::pin(stream),
            variables,
            cardinality,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// One input of the symmetric join together with its bucket map.
struct SideState {
    /// The input stream; `None` once it has ended.
    stream: Option<SendableBindingsStream>,
    /// This side's buffered bindings, probed by arrivals on the opposite side.
    ///
    /// `None` once the opposite side has ended: no new arrival can probe this map
    /// anymore, so it is released and this side's later items are not buffered.
    buckets: Option<FxHashMap<u64, Vec<Binding>>>,
}

impl SideState {
    fn new(stream: SendableBindingsStream) -> Self {
        Self {
            stream: Some(stream),
            buckets: Some(FxHashMap::default()),
        }
    }

    /// Releases the stream and the bucket map, e.g. after a terminal error.
    fn release(&mut self) {
        self.stream = None;
        self.buckets = None;
    }
}

/// The streaming state machine behind [SymmetricHashJoin].
///
/// Termination detection is the subtle part: the join has ended only when *both*
/// inputs have ended *and* the match cursor of the last consumed item has been fully
/// drained. Both conditions are re-checked on every poll; the randomized
/// interleaving tests in `tests/join_engine.rs` exercise the orderings in which the
/// two end signals can arrive.
struct SymmetricHashJoinStream {
    left: SideState,
    right: SideState,
    /// The variables hashed to form bucket keys.
    join_variables: Vec<Variable>,
    /// The variables bindings of this stream may bind.
    variables: Vec<Variable>,
    /// Which side to poll first on the next wakeup. Flipped on every consumed item
    /// so that neither input can starve the other.
    poll_left_first: bool,
    /// Matches of the last consumed binding, handed out one per poll.
    pending: VecDeque<Binding>,
    /// Set when a terminal error has been emitted.
    failed: bool,
}

impl SymmetricHashJoinStream {
    fn new(
        left: SendableBindingsStream,
        right: SendableBindingsStream,
        join_variables: Vec<Variable>,
        variables: Vec<Variable>,
    ) -> Self {
        Self {
            left: SideState::new(left),
            right: SideState::new(right),
            join_variables,
            variables,
            poll_left_first: true,
            pending: VecDeque::new(),
            failed: false,
        }
    }

    fn poll_inner(&mut self, cx: &mut Context<'_>) -> Poll<Option<JoinResult<Binding>>> {
        loop {
            if let Some(binding) = self.pending.pop_front() {
                return Poll::Ready(Some(Ok(binding)));
            }
            if self.failed || (self.left.stream.is_none() && self.right.stream.is_none()) {
                return Poll::Ready(None);
            }

            let order = if self.poll_left_first {
                [Side::Left, Side::Right]
            } else {
                [Side::Right, Side::Left]
            };

            let mut progressed = false;
            for side in order {
                let (own, other) = match side {
                    Side::Left => (&mut self.left, &mut self.right),
                    Side::Right => (&mut self.right, &mut self.left),
                };
                let Some(stream) = own.stream.as_mut() else {
                    continue;
                };
                match stream.poll_next_unpin(cx) {
                    Poll::Ready(Some(Ok(binding))) => {
                        let key = hash_bindings(&binding, &self.join_variables);
                        if let Some(bucket) =
                            other.buckets.as_ref().and_then(|buckets| buckets.get(&key))
                        {
                            for candidate in bucket {
                                if let Some(merged) = candidate.merge(&binding) {
                                    self.pending.push_back(merged);
                                }
                            }
                        }
                        if let Some(buckets) = own.buckets.as_mut() {
                            buckets.entry(key).or_default().push(binding);
                        }
                        self.poll_left_first = side == Side::Right;
                        progressed = true;
                        break;
                    }
                    Poll::Ready(Some(Err(error))) => {
                        self.failed = true;
                        self.left.release();
                        self.right.release();
                        self.pending.clear();
                        return Poll::Ready(Some(Err(error)));
                    }
                    Poll::Ready(None) => {
                        // This side has ended: nothing will probe the opposite
                        // bucket map anymore, so it is released and the live side
                        // stops buffering. Its own map stays until the live side
                        // has matched everything against it.
                        own.stream = None;
                        other.buckets = None;
                        progressed = true;
                        break;
                    }
                    Poll::Pending => {}
                }
            }

            if !progressed {
                return Poll::Pending;
            }
        }
    }
}

impl Stream for SymmetricHashJoinStream {
    type Item = JoinResult<Binding>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().poll_inner(cx)
    }
}

impl BindingsStream for SymmetricHashJoinStream {
    fn variables(&self) -> &[Variable] {
        &self.variables
    }
}
