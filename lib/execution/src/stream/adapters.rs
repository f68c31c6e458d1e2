use crate::stream::BindingsStream;
use futures::{Stream, StreamExt};
use rdf_junction_common::JoinResult;
use rdf_junction_model::{Binding, Variable};
use std::pin::Pin;
use std::task::{Context, Poll};

/// Combines an arbitrary [Stream] of binding results with a variable set.
///
/// This is the glue between source operators (which usually build their streams from
/// iterators or channels) and the join layer, which requires [BindingsStream].
pub struct BindingsStreamAdapter<S> {
    variables: Vec<Variable>,
    inner: S,
}

impl<S> BindingsStreamAdapter<S>
where
    S: Stream<Item = JoinResult<Binding>> + Unpin,
{
    /// Creates a new [BindingsStreamAdapter] declaring `variables` for `inner`.
    pub fn new(variables: Vec<Variable>, inner: S) -> Self {
        Self { variables, inner }
    }
}

impl<S> Stream for BindingsStreamAdapter<S>
where
    S: Stream<Item = JoinResult<Binding>> + Unpin,
{
    type Item = JoinResult<Binding>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().inner.poll_next_unpin(cx)
    }
}

impl<S> BindingsStream for BindingsStreamAdapter<S>
where
    S: Stream<Item = JoinResult<Binding>> + Unpin,
{
    fn variables(&self) -> &[Variable] {
        &self.variables
    }
}

/// A [BindingsStream] over an in-memory list of bindings.
///
/// Every poll immediately yields the next binding; the stream ends when the list is
/// exhausted. Mostly useful for materialized intermediate results and tests.
pub struct MemoryBindingsStream {
    variables: Vec<Variable>,
    bindings: std::vec::IntoIter<Binding>,
}

impl MemoryBindingsStream {
    /// Creates a new [MemoryBindingsStream] yielding `bindings` in order.
    pub fn new(variables: Vec<Variable>, bindings: Vec<Binding>) -> Self {
        Self {
            variables,
            bindings: bindings.into_iter(),
        }
    }
}

impl Stream for MemoryBindingsStream {
    type Item = JoinResult<Binding>;

    fn poll_next(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Poll::Ready(self.get_mut().bindings.next().map(Ok))
    }
}

impl BindingsStream for MemoryBindingsStream {
    fn variables(&self) -> &[Variable] {
        &self.variables
    }
}
