use std::error::Error;

/// An error raised while evaluating a join.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum JoinEvaluationError {
    /// A fault reported by an upstream source feeding one of the join inputs.
    ///
    /// Joins never retry; the fault is forwarded to the consumer exactly once and
    /// the join releases its other input immediately.
    #[error(transparent)]
    Source(Box<dyn Error + Send + Sync + 'static>),
    /// No registered join strategy accepted the given entries.
    ///
    /// This indicates a misconfigured strategy registry (e.g. no zero-entries or
    /// passthrough strategy is registered), not a data error.
    #[error("no registered join strategy accepts {0} entries")]
    NoApplicableStrategy(usize),
    /// An internal error that likely indicates a bug in rdf-junction.
    #[error("internal join engine error: {0}")]
    Internal(String),
}

impl JoinEvaluationError {
    /// Wraps an upstream source fault.
    pub fn source(error: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        Self::Source(error.into())
    }

    pub fn internal<T>(cause: impl Into<String>) -> Result<T, Self> {
        Err(Self::Internal(cause.into()))
    }
}
