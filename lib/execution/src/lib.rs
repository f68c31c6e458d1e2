//! Streaming join execution for federated SPARQL query engines.
//!
//! This crate evaluates multi-way joins over pull-based streams of
//! [Binding](rdf_junction_model::Binding)s. The [JoinEngine] decomposes an n-ary join
//! into pairwise joins ordered by estimated cardinality, selects a physical join
//! strategy per pair through a cost model, and produces a single output stream. All
//! operators obey the [stream::BindingsStream] contract: `poll_next` never blocks,
//! backpressure is achieved by simply not polling, and dropping an operator releases
//! its inputs.

pub mod coefficients;
mod engine;
pub mod hash;
pub mod join;
pub mod sort;
pub mod stream;

pub use engine::{JoinEngine, JoinEntry, JoinStrategy, JoinedResults, StrategyRefusal};
