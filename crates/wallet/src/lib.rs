//! VMF Wallet Crate
//!
//! Wallet discovery, connection and network enforcement for the VMF dapp.
//!
//! # Flow
//!
//! ```text
//! ProviderRegistry --> ConnectionSession --> NetworkEnforcer
//!  (which wallet)      (accounts, cache)     (switch / add chain)
//!                             |
//!                             v
//!                       SessionStore  (24h cached connection)
//! ```
//!
//! [`BalanceResolver`] reads token balances through the connected wallet and
//! falls back to a public RPC endpoint when the wallet read fails.
//!
//! # Core Types
//!
//! - [`ConnectionSession`] - Connect, disconnect, restore and provider events
//! - [`ProviderRegistry`] - Finds the provider object for a [`WalletKind`]
//! - [`NetworkEnforcer`] - Moves the wallet onto the target chain
//! - [`SessionStore`] - Persistence for the cached connection
//! - [`ConnectionError`] - User-actionable connection failures

pub mod balance;
pub mod config;
pub mod enforcer;
pub mod errors;
pub mod kinds;
pub mod recovery;
pub mod registry;
pub mod session;
pub mod store;

mod request;

#[cfg(test)]
mod testing;

pub use balance::{native_balance, BalanceResolver, BalanceSource, TokenBalance, DEFAULT_TOKEN_DECIMALS};
pub use config::{SessionConfig, SESSION_KEY, SESSION_TTL};
pub use enforcer::{EnforcementFailure, EnforcementOutcome, NetworkEnforcer, NetworkState};
pub use errors::{ConnectionError, SessionStoreError};
pub use kinds::{Capabilities, ChainFamily, ProviderDescriptor, WalletKind};
pub use recovery::{
    default_recovery_strategies, CachedAccountConsent, ChainCycle, ExplicitPermissions, RecoveryContext,
    RecoveryStep, RecoveryStrategy,
};
pub use registry::{HostEnvironment, ProviderHandle, ProviderRegistry, StaticHost};
pub use session::{ConnectionRecord, ConnectionSession, SessionState};
pub use store::{FileSessionStore, MemorySessionStore, SessionCacheEntry, SessionStore};
