//! Error types for topic-model operations.
//!
//! Provides rich error context for library consumers.

use thiserror::Error;

/// Main error type for LDA operations.
///
/// Variants fall into three groups:
/// - value errors: shape, partition and hyperparameter problems caught
///   before any state is touched
/// - state errors: using a model that has not been fitted
/// - computational errors: numeric breakdown inside inference
///
/// # Examples
///
/// ```
/// use aprender_lda::error::LdaError;
///
/// let err = LdaError::DimensionMismatch {
///     context: "vocabulary size".to_string(),
///     expected: 9,
///     actual: 10,
/// };
/// assert!(err.to_string().contains("dimension mismatch"));
/// assert!(err.is_value_error());
/// ```
#[derive(Debug, Error)]
pub enum LdaError {
    /// Input shape does not agree with the model or another operand.
    #[error("Matrix dimension mismatch ({context}): expected {expected}, got {actual}")]
    DimensionMismatch {
        /// What was being compared
        context: String,
        /// Expected size
        expected: usize,
        /// Actual size found
        actual: usize,
    },

    /// Requested batch sizes do not cover the matrix rows exactly.
    #[error("Partition size mismatch: batch sizes sum to {actual}, matrix has {expected} rows")]
    PartitionMismatch {
        /// Row count of the matrix
        expected: usize,
        /// Sum of requested sizes
        actual: usize,
    },

    /// Operation requires a fitted model.
    #[error("Model not fitted: call fit() or partial_fit() before {operation}()")]
    NotFitted {
        /// Name of the rejected operation
        operation: &'static str,
    },

    /// Invalid hyperparameter value provided.
    #[error("Invalid hyperparameter: {param} = {value}, expected {constraint}")]
    InvalidHyperparameter {
        /// Parameter name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// Malformed or out-of-domain input data.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Input has nothing to work with.
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Numeric failure during inference or update.
    #[error("Computation failed: {0}")]
    Computation(String),

    /// One or more parallel E-step workers failed.
    #[error("{failed} of {total} E-step workers failed: {message}")]
    WorkerFailure {
        /// Number of failed shards
        failed: usize,
        /// Number of dispatched shards
        total: usize,
        /// First failure message
        message: String,
    },
}

impl LdaError {
    /// Create a dimension mismatch error with descriptive context.
    #[must_use]
    pub fn dimension_mismatch(context: &str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            context: context.to_string(),
            expected,
            actual,
        }
    }

    /// Create an invalid hyperparameter error.
    #[must_use]
    pub fn invalid_hyperparameter(param: &str, value: impl ToString, constraint: &str) -> Self {
        Self::InvalidHyperparameter {
            param: param.to_string(),
            value: value.to_string(),
            constraint: constraint.to_string(),
        }
    }

    /// True for argument/value errors (bad shapes, sizes, parameters, data).
    #[must_use]
    pub fn is_value_error(&self) -> bool {
        matches!(
            self,
            Self::DimensionMismatch { .. }
                | Self::PartitionMismatch { .. }
                | Self::InvalidHyperparameter { .. }
                | Self::InvalidInput(_)
                | Self::EmptyInput(_)
        )
    }

    /// True when the model was used in the wrong lifecycle state.
    #[must_use]
    pub fn is_state_error(&self) -> bool {
        matches!(self, Self::NotFitted { .. })
    }
}

/// Convenience type alias for Results.
pub type LdaResult<T> = std::result::Result<T, LdaError>;
