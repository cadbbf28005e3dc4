//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug, PartialEq)]
pub enum DeepqError {
    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),

    /// A batch larger than the current contents of a replay buffer was requested.
    #[error("Cannot sample {requested} transitions from a buffer holding {available}")]
    InsufficientTransitions {
        /// Requested batch size.
        requested: usize,
        /// Number of transitions in the buffer.
        available: usize,
    },

    /// Batch size must be positive.
    #[error("Batch size must be positive")]
    InvalidBatchSize,

    /// Lengths of arrays that must agree differ.
    #[error("Shape mismatch in {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Name of the mismatching quantity.
        what: String,
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// Action index out of range.
    #[error("Action {act} is out of range for {n_actions} actions")]
    InvalidAction {
        /// The action.
        act: usize,
        /// The number of actions.
        n_actions: usize,
    },

    /// Configuration value out of its valid range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
