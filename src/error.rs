//! Error types for the training engine
//!
//! Every fallible operation in the crate returns [`Result`]. Shape and state errors are
//! fatal for the call that raised them; the model validates a whole backward pass before
//! any layer is mutated.

use thiserror::Error;

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// Input, parameter or gradient dimensions disagree
    #[error("shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: String,
        expected: String,
        actual: String,
    },

    /// Operation invoked in a state that forbids it (e.g. backward without a forward)
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Invalid hyperparameter or architecture description
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Malformed dataset
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build a [`Error::ShapeMismatch`] from anything printable.
    pub fn shape(
        context: impl Into<String>,
        expected: impl std::fmt::Display,
        actual: impl std::fmt::Display,
    ) -> Self {
        Error::ShapeMismatch {
            context: context.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Whether this is a shape error.
    pub fn is_shape_mismatch(&self) -> bool {
        matches!(self, Error::ShapeMismatch { .. })
    }

    /// Whether this is a state error.
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Error::InvalidState(_))
    }
}
