//! Error types for the VPIN toxicity system.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the VPIN toxicity system.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A tick reached the engine with values it cannot accumulate.
    #[error("Precondition violation for {instrument}: {reason}")]
    PreconditionViolation {
        /// Instrument the rejected tick belongs to.
        instrument: String,
        /// What was wrong with the tick.
        reason: String,
    },

    /// Wire message decoded but failed field constraints.
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a precondition violation for an instrument.
    pub fn precondition(instrument: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::PreconditionViolation {
            instrument: instrument.into(),
            reason: reason.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Whether the error came from bad input rather than from the system.
    ///
    /// Malformed input is dropped; anything else may be worth retrying.
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::PreconditionViolation { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_display() {
        let err = Error::precondition("SPY", "volume is negative");
        assert_eq!(
            err.to_string(),
            "Precondition violation for SPY: volume is negative"
        );
        assert!(err.is_malformed_input());
    }

    #[test]
    fn test_json_error_not_malformed_input() {
        let err: Error = serde_json::from_str::<u32>("{").unwrap_err().into();
        assert!(matches!(err, Error::Json(_)));
        assert!(!err.is_malformed_input());
    }
}
