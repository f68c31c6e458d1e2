use crate::coefficients::{CoefficientWeights, JoinCoefficients};
use crate::join::{
    HashJoin, MultiSmallestJoin, NestedLoopJoin, NoneJoin, SingleJoin, SymmetricHashJoin,
};
use crate::sort::{CardinalitySorter, EntriesSorter};
use crate::stream::SendableBindingsStream;
use async_trait::async_trait;
use rdf_junction_common::{Cardinality, JoinEvaluationError, JoinResult};
use rdf_junction_model::Variable;
use std::fmt;
use tracing::debug;

/// One input of a multi-way join: a bindings stream together with its declared
/// variable set and cardinality estimate.
///
/// An entry is consumed (moved) by exactly one physical join invocation, which takes
/// exclusive ownership of the stream.
pub struct JoinEntry {
    /// The stream producing this entry's bindings.
    pub stream: SendableBindingsStream,
    /// The variables that bindings of `stream` may bind.
    pub variables: Vec<Variable>,
    /// The estimated number of bindings `stream` will produce.
    pub cardinality: Cardinality,
}

impl fmt::Debug for JoinEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinEntry")
            .field("variables", &self.variables)
            .field("cardinality", &self.cardinality)
            .finish_non_exhaustive()
    }
}

/// The result of a join invocation: a single entry-shaped output.
pub struct JoinedResults {
    /// The stream of joined bindings.
    pub stream: SendableBindingsStream,
    /// The variables that bindings of `stream` may bind (the union of the inputs'
    /// variable sets).
    pub variables: Vec<Variable>,
    /// The estimated output cardinality.
    pub cardinality: Cardinality,
}

impl fmt::Debug for JoinedResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinedResults")
            .field("variables", &self.variables)
            .field("cardinality", &self.cardinality)
            .finish_non_exhaustive()
    }
}

impl From<JoinedResults> for JoinEntry {
    fn from(results: JoinedResults) -> Self {
        Self {
            stream: results.stream,
            variables: results.variables,
            cardinality: results.cardinality,
        }
    }
}

/// The reason a [JoinStrategy] declines an entry set.
///
/// A refusal is an expected, recoverable condition (wrong entry count, unsupported
/// shape); the selector skips the refusing strategy. It is not an error: only an
/// entry set that *every* registered strategy refuses surfaces as
/// [JoinEvaluationError::NoApplicableStrategy].
#[derive(Debug, Clone)]
pub struct StrategyRefusal {
    reason: String,
}

impl StrategyRefusal {
    /// Creates a new [StrategyRefusal] with a human-readable reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Why the strategy declined.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for StrategyRefusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.reason.fmt(f)
    }
}

/// A physical join strategy, registered with the [JoinEngine] under a stable name.
///
/// Strategies expose the two primitives of the surrounding plugin mechanism:
/// [test](JoinStrategy::test), which must be fast, side-effect-free and never
/// consume the entry streams, and [run](JoinStrategy::run), which is called exactly
/// once per join invocation, on the selected strategy.
#[async_trait]
pub trait JoinStrategy: Send + Sync {
    /// The stable name of this strategy, used for registration and logging.
    fn name(&self) -> &str;

    /// Estimates the cost of joining `entries` with this strategy, or refuses.
    ///
    /// Cost estimation works purely on the entries' metadata (variable sets and
    /// cardinality estimates); the streams themselves are not touched.
    fn test(&self, entries: &[JoinEntry]) -> Result<JoinCoefficients, StrategyRefusal>;

    /// Joins `entries`, consuming them.
    ///
    /// n-ary strategies re-enter `engine` to delegate partial joins back through
    /// strategy selection.
    async fn run(
        &self,
        entries: Vec<JoinEntry>,
        engine: &JoinEngine,
    ) -> JoinResult<JoinedResults>;
}

/// The join selector: a registry of physical [JoinStrategy]s and [EntriesSorter]s
/// that picks, per join invocation, the cheapest applicable strategy.
///
/// Selection invokes [JoinStrategy::test] on every registered strategy, discards
/// refusals, and takes the minimum scalar cost under the configured
/// [CoefficientWeights]. Ties are broken by registration order, which keeps
/// selection deterministic.
pub struct JoinEngine {
    strategies: Vec<Box<dyn JoinStrategy>>,
    sorters: Vec<Box<dyn EntriesSorter>>,
    weights: CoefficientWeights,
}

impl JoinEngine {
    /// Creates an engine with the built-in strategies and the default weights.
    pub fn new() -> Self {
        Self::with_weights(CoefficientWeights::default())
    }

    /// Creates an engine with the built-in strategies and the given `weights`.
    ///
    /// The built-ins are registered in this order (which also decides cost ties):
    /// zero-entries identity, single-entry passthrough, hash join, symmetric hash
    /// join, nested loop join, multi-smallest n-ary join.
    pub fn with_weights(weights: CoefficientWeights) -> Self {
        let mut engine = Self::empty(weights);
        engine.register_strategy(Box::new(NoneJoin));
        engine.register_strategy(Box::new(SingleJoin));
        engine.register_strategy(Box::new(HashJoin));
        engine.register_strategy(Box::new(SymmetricHashJoin));
        engine.register_strategy(Box::new(NestedLoopJoin));
        engine.register_strategy(Box::new(MultiSmallestJoin));
        engine.register_sorter(Box::new(CardinalitySorter));
        engine
    }

    /// Creates an engine without any registered strategies or sorters.
    pub fn empty(weights: CoefficientWeights) -> Self {
        Self {
            strategies: Vec::new(),
            sorters: Vec::new(),
            weights,
        }
    }

    /// Registers `strategy` behind all previously registered strategies.
    pub fn register_strategy(&mut self, strategy: Box<dyn JoinStrategy>) {
        self.strategies.push(strategy);
    }

    /// Registers `sorter` behind all previously registered sorters.
    pub fn register_sorter(&mut self, sorter: Box<dyn EntriesSorter>) {
        self.sorters.push(sorter);
    }

    /// Joins `entries` into a single output stream.
    ///
    /// Selects the cheapest applicable strategy and runs it exactly once. The
    /// zero-entries case produces the join identity (a single empty binding); the
    /// single-entry case passes the entry through unchanged.
    pub async fn join(&self, entries: Vec<JoinEntry>) -> JoinResult<JoinedResults> {
        let strategy = self.select(&entries)?;
        debug!(
            strategy = strategy.name(),
            entries = entries.len(),
            "selected physical join strategy"
        );
        strategy.run(entries, self).await
    }

    /// Selects the strategy that would join `entries`, without running it.
    pub fn select(&self, entries: &[JoinEntry]) -> JoinResult<&dyn JoinStrategy> {
        let mut best: Option<(&dyn JoinStrategy, f64)> = None;
        for strategy in &self.strategies {
            match strategy.test(entries) {
                Ok(coefficients) => {
                    let cost = coefficients.cost(&self.weights);
                    // Strict comparison keeps the first registered strategy on ties.
                    if best.map_or(true, |(_, c)| cost < c) {
                        best = Some((strategy.as_ref(), cost));
                    }
                }
                Err(refusal) => {
                    debug!(
                        strategy = strategy.name(),
                        reason = %refusal,
                        "join strategy refused entries"
                    );
                }
            }
        }
        best.map(|(strategy, _)| strategy)
            .ok_or(JoinEvaluationError::NoApplicableStrategy(entries.len()))
    }

    /// Sorts `entries` ascending by estimated cardinality, using the registered
    /// sorter that declares the highest accuracy for this entry set.
    pub fn sort_entries(&self, entries: Vec<JoinEntry>) -> JoinResult<Vec<JoinEntry>> {
        let mut best: Option<(&dyn EntriesSorter, f64)> = None;
        for sorter in &self.sorters {
            let accuracy = sorter.accuracy(&entries);
            // Strict comparison keeps the first registered sorter on ties.
            if best.map_or(true, |(_, a)| accuracy > a) {
                best = Some((sorter.as_ref(), accuracy));
            }
        }
        let Some((sorter, _)) = best else {
            return JoinEvaluationError::internal("no entries sorter is registered");
        };
        Ok(sorter.sort(entries))
    }
}

impl Default for JoinEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for JoinEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinEngine")
            .field(
                "strategies",
                &self.strategies.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field(
                "sorters",
                &self.sorters.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("weights", &self.weights)
            .finish()
    }
}
