//! Error types for duplication metrics processing.

use thiserror::Error;

/// Result type alias for duplication metrics operations
pub type Result<T> = std::result::Result<T, DupMetricsError>;

/// Error type for duplication metrics operations
#[derive(Error, Debug)]
pub enum DupMetricsError {
    /// A field needed for a computation is not in the record
    #[error("Missing field '{field}'")]
    MissingField {
        /// The metric key
        field: String,
    },

    /// A field needed for a computation holds text instead of a number
    #[error("Field '{field}' is not numeric: '{value}'")]
    NonNumericField {
        /// The metric key
        field: String,
        /// The stored text value
        value: String,
    },

    /// Both examined read counts summed to zero
    #[error("Cannot compute {field}: no reads examined")]
    ZeroDenominator {
        /// The metric being computed
        field: String,
    },

    /// Configuration file could not be interpreted
    #[error("Invalid configuration '{path}': {reason}")]
    InvalidConfig {
        /// Path to the configuration file
        path: String,
        /// Explanation of the problem
        reason: String,
    },
}
