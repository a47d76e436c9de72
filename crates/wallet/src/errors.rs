//! Error types for the wallet crate.
//!
//! Connection and network errors are user-actionable: a rejection, a pending
//! request and an unknown chain each need different guidance, so they are
//! distinct variants rather than one generic failure.

use thiserror::Error;
use vmf_chain::{ChainError, ProviderRpcError};

use crate::kinds::WalletKind;

/// Errors surfaced by [`ConnectionSession`](crate::ConnectionSession) and
/// [`BalanceResolver`](crate::BalanceResolver).
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// No provider for the requested wallet is present in the host.
    #[error("{kind} not installed. Install it from {install_url}")]
    ProviderNotFound {
        kind: WalletKind,
        install_url: String,
    },

    /// The user explicitly rejected a wallet prompt.
    #[error("Connection rejected by user")]
    UserRejected,

    /// The wallet already has a prompt of the same kind open.
    #[error("Connection request already pending. Please check your wallet.")]
    RequestPending,

    /// The wallet does not know the chain; it must be added first.
    #[error("Chain {chain_id_hex} is unknown to the wallet")]
    ChainUnknown { chain_id_hex: String },

    /// Every path to an account came back empty.
    #[error("No accounts found")]
    NoAccounts,

    /// Connected, but the wallet could not be moved to the required chain.
    #[error("Wrong network: {reason}")]
    WrongNetwork {
        address: String,
        reason: String,
        instructions: String,
    },

    /// The live wallet reports a different account than the cached session.
    #[error("Wallet account {live} does not match cached account {cached}")]
    AccountMismatch { cached: String, live: String },

    /// A wallet call did not answer within its deadline.
    #[error("Wallet did not answer {method} in time")]
    Timeout { method: String },

    /// `connect` was called while another connect was still running.
    #[error("A connection attempt is already in progress")]
    ConnectInProgress,

    /// The wallet returned something we could not interpret.
    #[error("Invalid wallet response: {0}")]
    InvalidResponse(String),

    /// Neither the wallet nor the public endpoint could read the balance.
    #[error("Balance fetch failed: {0}")]
    BalanceFetchFailed(String),

    /// Any other provider error.
    #[error(transparent)]
    Provider(ProviderRpcError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Store(#[from] SessionStoreError),
}

impl ConnectionError {
    pub fn provider_not_found(kind: WalletKind) -> Self {
        Self::ProviderNotFound {
            kind,
            install_url: kind.install_url().to_string(),
        }
    }

    /// Whether this came from the user saying no. Rejections are never retried.
    pub fn is_user_rejected(&self) -> bool {
        match self {
            Self::UserRejected => true,
            Self::Provider(e) => e.is_user_rejected(),
            _ => false,
        }
    }

    /// Whether a failed chain switch means "add the chain, then switch again".
    pub fn is_chain_unknown(&self) -> bool {
        match self {
            Self::ChainUnknown { .. } => true,
            Self::Provider(e) => e.is_unrecognized_chain(),
            _ => false,
        }
    }
}

impl From<ProviderRpcError> for ConnectionError {
    fn from(error: ProviderRpcError) -> Self {
        if error.is_user_rejected() {
            Self::UserRejected
        } else if error.is_request_pending() {
            Self::RequestPending
        } else if error.code == vmf_chain::provider::UNRECOGNIZED_CHAIN {
            Self::ChainUnknown {
                chain_id_hex: error
                    .data
                    .as_ref()
                    .and_then(|d| d.get("chainId"))
                    .and_then(|c| c.as_str())
                    .unwrap_or_default()
                    .to_string(),
            }
        } else {
            Self::Provider(error)
        }
    }
}

/// Errors reading or writing the session cache.
#[derive(Error, Debug)]
pub enum SessionStoreError {
    #[error("Session store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session entry is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}
