//! Unified error type for system data.
//!
//! [`PcmError`] covers everything a [`crate::DataSource`] implementation can
//! report: malformed topology, duplicate names, missing or short time series.
//! The assembly crate wraps it in its own error type at the boundary.

use thiserror::Error;

/// Error type for system data operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PcmError {
    /// Data validation errors (bad limits, dangling bus references)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Two components share a name within the same collection
    #[error("Duplicate component name: {0}")]
    DuplicateName(String),

    /// A referenced component does not exist
    #[error("Unknown component: {0}")]
    UnknownComponent(String),

    /// Time series lookup failed or the series is too short
    #[error("Time series error: {0}")]
    TimeSeries(String),

    /// Network structure errors
    #[error("Network error: {0}")]
    Network(String),
}

/// Convenience type alias for Results using PcmError.
pub type PcmResult<T> = Result<T, PcmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PcmError::TimeSeries("load1/max_active_power missing".into());
        assert!(err.to_string().contains("Time series error"));
        assert!(err.to_string().contains("load1"));
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> PcmResult<()> {
            Err(PcmError::Validation("test".into()))
        }

        fn outer() -> PcmResult<()> {
            inner()?;
            Ok(())
        }

        assert!(outer().is_err());
    }
}
