//! All errors that can occur in the cfepi library.

use std::fmt;

pub type Result<T> = std::result::Result<T, CfepiError>;

#[derive(Clone, Debug, PartialEq)]
pub enum CfepiError {
    ImplementationError(String),
    InitializationError(String),
    ReadError(String),
    RetryLimitExceeded { time: usize, resets: usize },
}

impl fmt::Display for CfepiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CfepiError::ImplementationError(message) => {
                write!(f, "ImplementationError: {}", message)
            }
            CfepiError::InitializationError(message) => {
                write!(f, "InitializationError: {}", message)
            }
            CfepiError::ReadError(message) => {
                write!(f, "ReadError: {}", message)
            }
            CfepiError::RetryLimitExceeded { time, resets } => {
                write!(
                    f,
                    "RetryLimitExceeded: step {} was reset {} times without being accepted",
                    time, resets
                )
            }
        }
    }
}

impl std::error::Error for CfepiError {}
