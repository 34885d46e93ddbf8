//! Crate-wide error type
//!
//! Three failure classes cover the core pipeline: rejected configuration,
//! signals that cannot be normalized, and metrics with no defined value.
//! Sink failures surface as `Io`.

use std::fmt;

/// Simulation error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    /// A configuration field is out of range or inconsistent
    Configuration(String),
    /// A signal is identically zero where a nonzero peak is required
    DegenerateSignal(String),
    /// A requested metric has no defined value for the given inputs
    UndefinedMetric(String),
    /// A sink could not be written or read
    Io(String),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::Configuration(msg) => write!(f, "configuration error: {}", msg),
            SimError::DegenerateSignal(msg) => write!(f, "degenerate signal: {}", msg),
            SimError::UndefinedMetric(msg) => write!(f, "undefined metric: {}", msg),
            SimError::Io(msg) => write!(f, "i/o error: {}", msg),
        }
    }
}

impl std::error::Error for SimError {}

impl From<hound::Error> for SimError {
    fn from(e: hound::Error) -> Self {
        SimError::Io(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
