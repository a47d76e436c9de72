//! Price discovery configuration.

use std::time::Duration;

/// VMF token on Base.
pub const VMF_TOKEN_ADDRESS: &str = "0x2213414893259b0C48066Acd1763e7fbA97859E5";
/// VMF/USDC SushiSwap pool on Base.
pub const VMF_POOL_ADDRESS: &str = "0x9c83a203133b65982f35d1b00e8283c9fb518cb1";
/// USDC on Base.
pub const USDC_ADDRESS: &str = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913";
/// Uniswap quoter on Base.
pub const UNISWAP_QUOTER_ADDRESS: &str = "0x3d4e44Eb1374240CE5F1B871ab261CD16335B76a";
/// Deployed fixed-price oracle.
pub const FIXED_PRICE_ORACLE_ADDRESS: &str = "0x9444b5Cf6f89ab72C6173bF0dd13c7F7bec809D2";

pub const DEXSCREENER_BASE_URL: &str = "https://api.dexscreener.com";
pub const COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Default HTTP and RPC request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything the default waterfall needs to know about the token.
#[derive(Clone, Debug)]
pub struct PriceConfig {
    /// Token being priced
    pub token_address: String,
    /// Token decimals
    pub token_decimals: u8,
    /// Liquidity pool looked up first on the aggregator (and read for `slot0`)
    pub pool_address: String,
    /// Aggregator chain slug (`base`)
    pub chain_slug: String,
    /// Display name of the chain, used in on-chain source labels
    pub chain_label: String,
    pub dexscreener_base_url: String,
    pub coingecko_base_url: String,
    /// AMM quoter contract
    pub quoter_address: String,
    /// Display name of the quoter, used in its source label
    pub quoter_label: String,
    /// Pool fee tier passed to the quoter (3000 = 0.3%)
    pub fee_tier: u32,
    /// Stable reference asset quoted against (USDC)
    pub reference_asset_address: String,
    pub reference_asset_decimals: u8,
    /// On-chain prices at or above this are rejected
    pub sanity_ceiling: f64,
    /// When set, the oracle source reads this oracle directly instead of
    /// asking the token for its `priceOracle()`
    pub fixed_price_oracle: Option<String>,
    pub request_timeout: Duration,
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            token_address: VMF_TOKEN_ADDRESS.to_string(),
            token_decimals: 18,
            pool_address: VMF_POOL_ADDRESS.to_string(),
            chain_slug: "base".to_string(),
            chain_label: "Base".to_string(),
            dexscreener_base_url: DEXSCREENER_BASE_URL.to_string(),
            coingecko_base_url: COINGECKO_BASE_URL.to_string(),
            quoter_address: UNISWAP_QUOTER_ADDRESS.to_string(),
            quoter_label: "Uniswap V3".to_string(),
            fee_tier: 3000,
            reference_asset_address: USDC_ADDRESS.to_string(),
            reference_asset_decimals: 6,
            sanity_ceiling: 1_000_000.0,
            fixed_price_oracle: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}
