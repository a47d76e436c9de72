//! Why a source was not tried during a resolution.

use std::fmt;

/// Why a source was skipped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// Circuit breaker is open for this source.
    CircuitBreakerOpen,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CircuitBreakerOpen => write!(f, "circuit breaker open"),
        }
    }
}
