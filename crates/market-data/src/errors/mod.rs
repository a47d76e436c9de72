//! Error types and retry classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The error enum for every price source
//! - [`RetryClass`]: Classification for circuit-breaker bookkeeping

mod retry;

pub use retry::RetryClass;

use thiserror::Error;
use vmf_chain::ChainError;

/// Errors a price source can return.
///
/// None of these ever leave [`PriceResolver`](crate::PriceResolver); they
/// are recorded in the resolution diagnostics and the next source is tried.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The source answered but had no usable price (missing pair, zero
    /// amount, unset oracle).
    #[error("Price source unavailable: {source_id} - {message}")]
    Unavailable {
        /// The source that had no price
        source_id: String,
        /// Why no price was produced
        message: String,
    },

    /// The source returned a payload we could not interpret.
    #[error("Invalid response from {source_id}: {message}")]
    InvalidResponse {
        /// The source that returned the payload
        source_id: String,
        /// What was wrong with it
        message: String,
    },

    /// The source rate limited the request (HTTP 429).
    #[error("Rate limited: {source_id}")]
    RateLimited {
        /// The source that rate limited the request
        source_id: String,
    },

    /// The request to the source timed out.
    #[error("Timeout: {source_id}")]
    Timeout {
        /// The source that timed out
        source_id: String,
    },

    /// The circuit breaker is open for this source.
    #[error("Circuit open: {source_id}")]
    CircuitOpen {
        /// The source with an open circuit
        source_id: String,
    },

    /// A quote was produced but failed validation.
    #[error("Validation failed: {message}")]
    ValidationFailed {
        /// Description of the validation failure
        message: String,
    },

    /// An on-chain read failed (encoding, RPC, decoding).
    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    /// A network error occurred while reaching an HTTP source.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MarketDataError {
    pub fn unavailable(source_id: &str, message: impl Into<String>) -> Self {
        Self::Unavailable {
            source_id: source_id.to_string(),
            message: message.into(),
        }
    }

    pub fn invalid_response(source_id: &str, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            source_id: source_id.to_string(),
            message: message.into(),
        }
    }

    /// Returns the retry classification for this error.
    ///
    /// Inside the waterfall every class moves on to the next source; the
    /// class only decides whether the failure counts against the source's
    /// circuit breaker.
    ///
    /// # Examples
    ///
    /// ```
    /// use vmf_market_data::errors::{MarketDataError, RetryClass};
    ///
    /// let error = MarketDataError::Timeout { source_id: "COINGECKO".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::FailoverWithPenalty);
    ///
    /// let error = MarketDataError::ValidationFailed { message: "price <= 0".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            // The data is bad, not the source
            Self::ValidationFailed { .. } => RetryClass::Never,

            // Transient - count against the source
            Self::RateLimited { .. } | Self::Timeout { .. } | Self::Network(_) => {
                RetryClass::FailoverWithPenalty
            }

            Self::Chain(e) if e.is_transient() => RetryClass::FailoverWithPenalty,

            // The source simply has nothing for us right now
            Self::Unavailable { .. } | Self::InvalidResponse { .. } | Self::Chain(_) => {
                RetryClass::NextProvider
            }

            Self::CircuitOpen { .. } => RetryClass::CircuitOpen,
        }
    }
}
