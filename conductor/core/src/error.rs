//! Output Core Errors
//!
//! Most conditions in the output core are no-ops rather than errors (a
//! missing target output is simply skipped). These types cover the few
//! places where a caller asked for an explicit reason.

use thiserror::Error;

use crate::ids::OutputId;

/// Errors reported to the immediate caller
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OutputError {
    /// A size string could not be parsed
    #[error("Invalid resolution '{0}': expected WIDTHxHEIGHT with positive integers")]
    InvalidResolution(String),

    /// The output does not exist in the registry
    #[error("Unknown output: {0}")]
    UnknownOutput(OutputId),

    /// The registry must keep at least one output
    #[error("Cannot delete output {0}: it is the last remaining output")]
    LastOutput(OutputId),
}

/// Result alias for output core operations
pub type Result<T> = std::result::Result<T, OutputError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OutputError::LastOutput(OutputId::new("a"));
        assert!(err.to_string().contains("last remaining output"));
        let err = OutputError::InvalidResolution("abc".into());
        assert!(err.to_string().contains("abc"));
    }
}
