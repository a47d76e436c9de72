use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use vmf_chain::encoder::{normalize_address, SLOT0_SELECTOR, TOKEN0_SELECTOR};
use vmf_chain::{decode_address, decode_uint, u256_to_f64, CallTransport, U256};

use crate::config::PriceConfig;
use crate::errors::MarketDataError;
use crate::models::PriceQuote;
use crate::provider::{PriceSource, SourceKind};

const SOURCE_ID: &str = "POOL_SLOT0";

/// 2^96
const Q96: f64 = 79_228_162_514_264_337_593_543_950_336.0;

/// Price of token0 in token1, adjusted for decimals:
/// `(sqrtPriceX96 / 2^96)^2 * 10^(decimals0 - decimals1)`.
pub fn sqrt_price_x96_to_price(sqrt_price_x96: U256, decimals0: u8, decimals1: u8) -> f64 {
    let sqrt_price = u256_to_f64(sqrt_price_x96) / Q96;
    let raw = sqrt_price * sqrt_price;
    raw * 10f64.powi(i32::from(decimals0) - i32::from(decimals1))
}

/// Reads the pool's current `sqrtPriceX96` and converts it into USD per token.
///
/// The pool must pair the token with the reference asset.
pub struct PoolSlot0Source {
    transport: Arc<dyn CallTransport>,
    pool_address: String,
    token_address: String,
    token_decimals: u8,
    reference_decimals: u8,
    sanity_ceiling: f64,
    label: String,
}

impl PoolSlot0Source {
    pub fn new(transport: Arc<dyn CallTransport>, config: &PriceConfig) -> Self {
        Self {
            transport,
            pool_address: config.pool_address.clone(),
            token_address: config.token_address.clone(),
            token_decimals: config.token_decimals,
            reference_decimals: config.reference_asset_decimals,
            sanity_ceiling: config.sanity_ceiling,
            label: format!("Pool slot0 ({})", config.chain_label),
        }
    }
}

#[async_trait]
impl PriceSource for PoolSlot0Source {
    fn id(&self) -> &'static str {
        SOURCE_ID
    }

    fn kind(&self) -> SourceKind {
        SourceKind::OnChain
    }

    async fn fetch_price(&self) -> Result<PriceQuote, MarketDataError> {
        let transport = self.transport.as_ref();

        let token0 =
            decode_address(&super::read(transport, &self.pool_address, TOKEN0_SELECTOR, &[]).await?)?;
        let token_is_token0 = token0 == normalize_address(&self.token_address)?;

        let sqrt_price_x96 =
            decode_uint(&super::read(transport, &self.pool_address, SLOT0_SELECTOR, &[]).await?)?;
        if sqrt_price_x96.is_zero() {
            return Err(MarketDataError::unavailable(SOURCE_ID, "pool not initialized"));
        }

        let price = if token_is_token0 {
            sqrt_price_x96_to_price(sqrt_price_x96, self.token_decimals, self.reference_decimals)
        } else {
            1.0 / sqrt_price_x96_to_price(sqrt_price_x96, self.reference_decimals, self.token_decimals)
        };
        debug!(
            "slot0: sqrtPriceX96={} token0={} -> {}",
            sqrt_price_x96, token_is_token0, price
        );

        if !price.is_finite() || price <= 0.0 || price >= self.sanity_ceiling {
            return Err(MarketDataError::ValidationFailed {
                message: format!("slot0 price {} outside (0, {})", price, self.sanity_ceiling),
            });
        }

        Ok(PriceQuote::new(price, self.label.clone()))
    }
}
