//! The cost vectors that rank physical join strategies against each other.

/// The cost estimate a physical join strategy reports for an entry set.
///
/// All components are estimated from the entries' cardinalities, never by executing
/// the join. Lower is better on every axis; candidates are ranked by the weighted
/// sum of [JoinCoefficients::cost].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JoinCoefficients {
    /// An estimate for the number of iterations over bindings.
    pub iterations: f64,
    /// An estimate for the number of bindings the strategy keeps in memory.
    pub persisted_items: f64,
    /// An estimate for the number of bindings that must arrive before the first
    /// result can be emitted.
    pub blocking_items: f64,
    /// An estimate for the time spent on requests to external sources.
    pub request_time: f64,
}

impl JoinCoefficients {
    /// The all-zero cost of the trivial strategies.
    pub const ZERO: Self = Self {
        iterations: 0.0,
        persisted_items: 0.0,
        blocking_items: 0.0,
        request_time: 0.0,
    };

    /// Combines the components into a single scalar cost under `weights`.
    pub fn cost(&self, weights: &CoefficientWeights) -> f64 {
        self.iterations * weights.iterations
            + self.persisted_items * weights.persisted_items
            + self.blocking_items * weights.blocking_items
            + self.request_time * weights.request_time
    }
}

/// The weights applied to each [JoinCoefficients] component when ranking strategies.
///
/// The defaults weigh every component equally. Callers that care more about memory
/// than latency (or vice versa) configure the engine with different weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoefficientWeights {
    pub iterations: f64,
    pub persisted_items: f64,
    pub blocking_items: f64,
    pub request_time: f64,
}

impl Default for CoefficientWeights {
    fn default() -> Self {
        Self {
            iterations: 1.0,
            persisted_items: 1.0,
            blocking_items: 1.0,
            request_time: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_is_the_weighted_component_sum() {
        let coefficients = JoinCoefficients {
            iterations: 10.0,
            persisted_items: 5.0,
            blocking_items: 2.0,
            request_time: 1.0,
        };

        assert_eq!(coefficients.cost(&CoefficientWeights::default()), 18.0);

        let memory_sensitive = CoefficientWeights {
            persisted_items: 10.0,
            ..CoefficientWeights::default()
        };
        assert_eq!(coefficients.cost(&memory_sensitive), 63.0);
    }

    #[test]
    fn zero_cost_is_free_under_any_weights() {
        assert_eq!(JoinCoefficients::ZERO.cost(&CoefficientWeights::default()), 0.0);
    }
}
