//! VMF Market Data Crate
//!
//! Resolves a USD price for the VMF token by walking an ordered list of
//! price sources until one yields a valid quote.
//!
//! # Architecture
//!
//! ```text
//!                    +------------------+
//!                    |  PriceResolver   |  (ordered waterfall)
//!                    +------------------+
//!                             |
//!          +------------------+------------------+
//!          v                                     v
//! +------------------+                  +------------------+
//! |   Aggregators    |                  |    On-chain      |
//! | DexScreener pool |                  | Uniswap quoter   |
//! | DexScreener token|                  | Pool slot0       |
//! | CoinGecko        |                  | Fixed oracle     |
//! +------------------+                  | Static multiple  |
//!          |                            +------------------+
//!          |                                     |
//!          +------------------+------------------+
//!                             v
//!                    +------------------+
//!                    |  QuoteValidator  |
//!                    +------------------+
//!                             |
//!                             v
//!                    +------------------+
//!                    | PriceResolution  |  (quote + diagnostics)
//!                    +------------------+
//! ```
//!
//! When every source fails the resolver answers the hard default of
//! 1 USD per token. Resolution never returns an error.
//!
//! # Core Types
//!
//! - [`PriceResolver`] - Runs the waterfall
//! - [`PriceSource`] - One strategy in the waterfall
//! - [`PriceQuote`] - A price with its source label and optional market stats
//! - [`PriceResolution`] - The chosen quote plus the attempt log
//! - [`PriceConfig`] - Addresses, endpoints and limits

pub mod config;
pub mod errors;
pub mod models;
pub mod provider;
pub mod registry;

pub use config::PriceConfig;

pub use errors::{MarketDataError, RetryClass};

pub use models::{PriceQuote, PriceResolution, DEFAULT_SOURCE, FALLBACK_SOURCE};

pub use provider::{
    CoinGeckoSource, DefaultPriceSource, DexScreenerPoolSource, DexScreenerTokenSource,
    FixedPriceOracleSource, PoolSlot0Source, PriceSource, QuoterSource, SourceKind,
    StaticMultipleSource,
};

pub use registry::{
    CircuitBreaker, CircuitBreakerConfig, CircuitSnapshot, CircuitState, PriceResolver,
    QuoteValidator, SkipReason, ValidationSeverity, ValidatorConfig,
};
