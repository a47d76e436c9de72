//! Error types for chain-level operations.

use thiserror::Error;

use crate::provider::ProviderRpcError;

/// Errors that can occur while encoding calls, decoding results or talking
/// to a JSON-RPC endpoint.
#[derive(Error, Debug)]
pub enum ChainError {
    /// An address argument was not 20 bytes of hex.
    #[error("Malformed address: {0}")]
    MalformedAddress(String),

    /// A selector was not 4 bytes of hex.
    #[error("Malformed selector: {0}")]
    MalformedSelector(String),

    /// A call result could not be interpreted.
    ///
    /// An empty `0x` result is the RPC convention for a reverted call and
    /// always lands here.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The injected provider rejected the request.
    #[error(transparent)]
    Provider(#[from] ProviderRpcError),

    /// The JSON-RPC endpoint answered with an error object.
    #[error("RPC error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code
        code: i64,
        /// Error message from the endpoint
        message: String,
    },

    /// The endpoint answered, but not with something we understand.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The request did not finish within its deadline.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// A network error occurred while reaching the endpoint.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl ChainError {
    /// True for errors where the call itself is fine but the environment is
    /// not (network trouble, timeouts, provider hiccups).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::InvalidResponse(_) => true,
            Self::Provider(e) => !e.is_user_rejected(),
            Self::Rpc { .. } => true,
            Self::MalformedAddress(_) | Self::MalformedSelector(_) | Self::Decode(_) => false,
        }
    }
}
