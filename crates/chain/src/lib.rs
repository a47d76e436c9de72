//! VMF Chain Crate
//!
//! Low-level building blocks shared by the wallet and price crates.
//!
//! # Overview
//!
//! - [`ChainTarget`] - the immutable description of the chain VMF requires
//!   (Base mainnet by default) plus a small catalog of known networks
//! - [`encoder`] - minimal, ABI-less call encoding and result decoding for the
//!   handful of read-only functions VMF calls
//! - [`provider`] - the EIP-1193 style injected-provider abstraction and the
//!   Solana provider abstraction, plus the typed provider error
//! - [`rpc`] - a public JSON-RPC client and the [`CallTransport`] seam used by
//!   on-chain readers
//! - [`fallback`] - the ordered "first success wins" driver shared by the price
//!   waterfall and the wallet recovery sequence
//!
//! # Architecture
//!
//! ```text
//! +-------------+     +-------------+     +----------------+
//! |  encoder    | --> |  RawCall    | --> | CallTransport  |  (public RPC or injected provider)
//! +-------------+     +-------------+     +----------------+
//!                                                 |
//!                                                 v
//!                                         +----------------+
//!                                         | decode_uint    |
//!                                         +----------------+
//! ```

pub mod encoder;
pub mod errors;
pub mod fallback;
pub mod network;
pub mod provider;
pub mod rpc;

pub use alloy_primitives::U256;

pub use encoder::{
    decode_address, decode_uint, decode_words, encode_call, format_address, format_units,
    selector, u256_to_f64, CallArg, RawCall,
};
pub use errors::ChainError;
pub use fallback::{run_ordered, Attempt, AttemptLog, AttemptOutcome, Labeled, Step};
pub use network::{network_name, parse_chain_id, ChainTarget, NativeCurrency, SupportedNetwork};
pub use provider::{
    Eip1193Provider, ProviderEvent, ProviderFlags, ProviderRpcError, SolanaProvider,
};
pub use rpc::{CallTransport, JsonRpcClient, ProviderTransport};
