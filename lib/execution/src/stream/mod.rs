//! The pull-based stream contract that every join operator consumes and produces.
//!
//! A bindings stream follows the [futures Stream](futures::Stream) polling protocol:
//!
//! - `poll_next` never blocks. `Poll::Pending` means "no item right now"; the waker
//!   registered in the task context is the readability signal and may fire
//!   spuriously, so consumers retry the poll instead of assuming an item is ready.
//! - `Poll::Ready(None)` is the terminal end signal. Once a stream has ended (or has
//!   yielded its single terminal error), every further poll returns `Ready(None)`.
//! - An error item is yielded at most once and is terminal. Errors travel as stream
//!   items, never as panics.
//! - Cancellation is dropping the stream. A join operator exclusively owns its input
//!   streams, so dropping the operator synchronously releases both inputs together
//!   with any buffered state.
//!
//! Backpressure follows from the pull model: a slow consumer simply polls less
//! often, and producers hold their data until polled.

mod adapters;

pub use adapters::{BindingsStreamAdapter, MemoryBindingsStream};

use futures::Stream;
use rdf_junction_common::JoinResult;
use rdf_junction_model::{Binding, Variable};
use std::pin::Pin;

/// A stream of [Binding]s with a known variable set.
///
/// The variable set declares which variables bindings of this stream *may* bind; an
/// individual binding can leave any of them unbound (e.g. below an `OPTIONAL`).
pub trait BindingsStream: Stream<Item = JoinResult<Binding>> {
    /// The variables that bindings of this stream may bind.
    fn variables(&self) -> &[Variable];
}

/// A pinned, heap-allocated [BindingsStream] that can be moved across operators.
pub type SendableBindingsStream = Pin<Box<dyn BindingsStream + Send>>;
