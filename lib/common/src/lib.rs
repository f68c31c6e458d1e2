mod cardinality;
pub mod error;

pub use cardinality::Cardinality;
pub use error::JoinEvaluationError;

/// The result type used throughout the join execution layer.
pub type JoinResult<T> = Result<T, JoinEvaluationError>;
