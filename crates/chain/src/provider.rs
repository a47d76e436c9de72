//! Injected wallet provider abstraction.
//!
//! Browser wallets expose an EIP-1193 `request({ method, params })` object and
//! emit account/chain change events. The wallet crate never touches a global
//! for this; it receives `Arc<dyn Eip1193Provider>` handles from a host
//! environment, which lets tests script every response.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;

/// User rejected the request.
pub const USER_REJECTED: i64 = 4001;
/// The requested method and/or account has not been authorized.
pub const UNAUTHORIZED: i64 = 4100;
/// The provider does not support the requested method.
pub const UNSUPPORTED_METHOD: i64 = 4200;
/// The provider is disconnected from all chains.
pub const DISCONNECTED: i64 = 4900;
/// The provider is not connected to the requested chain.
pub const CHAIN_DISCONNECTED: i64 = 4901;
/// The wallet does not know the requested chain; it must be added first.
pub const UNRECOGNIZED_CHAIN: i64 = 4902;
/// A request of the same kind is already pending in the wallet UI.
pub const REQUEST_PENDING: i64 = -32002;
/// Internal JSON-RPC error.
pub const INTERNAL_ERROR: i64 = -32603;

/// Error object returned by an injected provider.
#[derive(Error, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[error("Provider error {code}: {message}")]
pub struct ProviderRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ProviderRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn user_rejected() -> Self {
        Self::new(USER_REJECTED, "User rejected the request.")
    }

    pub fn request_pending() -> Self {
        Self::new(REQUEST_PENDING, "Request already pending.")
    }

    pub fn unrecognized_chain(chain_id_hex: &str) -> Self {
        Self::new(
            UNRECOGNIZED_CHAIN,
            format!("Unrecognized chain ID \"{}\".", chain_id_hex),
        )
    }

    pub fn unsupported_method(method: &str) -> Self {
        Self::new(
            UNSUPPORTED_METHOD,
            format!("The provider does not support {}", method),
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(INTERNAL_ERROR, message)
    }

    pub fn is_user_rejected(&self) -> bool {
        self.code == USER_REJECTED
    }

    pub fn is_request_pending(&self) -> bool {
        self.code == REQUEST_PENDING
    }

    pub fn is_unsupported_method(&self) -> bool {
        self.code == UNSUPPORTED_METHOD
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(self.code, DISCONNECTED | CHAIN_DISCONNECTED)
    }

    /// Whether a failed `wallet_switchEthereumChain` means "add the chain first".
    ///
    /// Some wallets report an unknown chain as a generic internal error.
    pub fn is_unrecognized_chain(&self) -> bool {
        matches!(self.code, UNRECOGNIZED_CHAIN | INTERNAL_ERROR)
    }

    /// Parse an `{ code, message, data? }` error object.
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

/// Vendor markers an injected provider advertises about itself.
///
/// Several wallets claim `isMetaMask` for compatibility; callers combine these
/// flags rather than trusting any single one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderFlags {
    #[serde(rename = "isMetaMask")]
    pub is_metamask: bool,
    pub is_coinbase_wallet: bool,
    pub is_rainbow: bool,
    pub is_phantom: bool,
    pub is_brave_wallet: bool,
}

impl ProviderFlags {
    /// Number of vendor markers set. A provider setting exactly one is the
    /// most specific candidate for that vendor.
    pub fn marker_count(&self) -> usize {
        [
            self.is_metamask,
            self.is_coinbase_wallet,
            self.is_rainbow,
            self.is_phantom,
            self.is_brave_wallet,
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }
}

/// Events emitted by an injected provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderEvent {
    /// `accountsChanged`; an empty list means the user disconnected the site.
    AccountsChanged(Vec<String>),
    /// `chainChanged` with the new chain id.
    ChainChanged(u64),
    /// `disconnect`
    Disconnect,
}

/// An EIP-1193 style injected provider.
#[async_trait]
pub trait Eip1193Provider: Send + Sync {
    /// Vendor markers (`isMetaMask`, `isCoinbaseWallet`, ...).
    fn flags(&self) -> ProviderFlags;

    /// Issue a JSON-RPC request through the wallet.
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError>;

    /// Whether the provider implements `method` at all. Used to skip optional
    /// calls such as `wallet_revokePermissions` on wallets that lack them.
    fn supports(&self, _method: &str) -> bool {
        true
    }

    /// Subscribe to provider events, if the provider emits any.
    fn events(&self) -> Option<broadcast::Receiver<ProviderEvent>> {
        None
    }

    /// Provider-level disconnect. No-op for wallets without one.
    async fn disconnect(&self) -> Result<(), ProviderRpcError> {
        Ok(())
    }
}

/// A Solana wallet provider (Phantom).
#[async_trait]
pub trait SolanaProvider: Send + Sync {
    fn is_phantom(&self) -> bool;

    /// Connect and return the base58 public key. With `only_if_trusted` the
    /// wallet must not prompt; it fails instead when the site is not trusted.
    async fn connect(&self, only_if_trusted: bool) -> Result<String, ProviderRpcError>;

    async fn disconnect(&self) -> Result<(), ProviderRpcError>;
}
