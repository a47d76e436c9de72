//! Price sources.
//!
//! This module contains:
//! - The [`PriceSource`] trait every waterfall strategy implements
//! - The aggregator sources (DexScreener pool and token lookups, CoinGecko)
//! - The on-chain sources (quoter, pool `slot0`, fixed-price oracle, static multiple)
//! - The hard default
//!
//! Sources know nothing about ordering; [`PriceResolver`](crate::PriceResolver)
//! owns the sequence.

mod capabilities;
pub(crate) mod http;
mod traits;

pub mod coingecko;
pub mod default;
pub mod dexscreener;
pub mod onchain;

pub use capabilities::SourceKind;
pub use traits::PriceSource;

pub use coingecko::CoinGeckoSource;
pub use default::DefaultPriceSource;
pub use dexscreener::{DexScreenerPoolSource, DexScreenerTokenSource};
pub use onchain::{FixedPriceOracleSource, PoolSlot0Source, QuoterSource, StaticMultipleSource};
