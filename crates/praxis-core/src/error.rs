//! Error types for the Praxis planner.

use thiserror::Error;

/// Main error type for Praxis operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PraxisError {
    /// An outcome set failed validation when it was constructed.
    #[error("Malformed outcome set: {message}")]
    MalformedOutcomes { message: String },

    /// An action was executed against a state that does not meet its prerequisites.
    #[error("Prerequisites unsatisfied for {action}")]
    PrereqsUnsatisfied { action: String },

    /// An action or goal definition is invalid.
    #[error("Invalid action: {message}")]
    InvalidAction { message: String },

    /// A configuration value is out of range.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl PraxisError {
    /// Returns true if this error is recoverable.
    ///
    /// Only prerequisite failures are; the agent shell answers them by replanning.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PraxisError::PrereqsUnsatisfied { .. })
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        PraxisError::MalformedOutcomes {
            message: message.into(),
        }
    }
}

/// Convenience Result type for Praxis operations.
pub type Result<T> = std::result::Result<T, PraxisError>;

impl From<serde_json::Error> for PraxisError {
    fn from(err: serde_json::Error) -> Self {
        PraxisError::SerializationError(err.to_string())
    }
}
