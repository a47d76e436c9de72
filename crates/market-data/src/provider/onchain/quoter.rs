use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use vmf_chain::encoder::QUOTE_EXACT_INPUT_SINGLE_SELECTOR;
use vmf_chain::{decode_uint, format_units, CallArg, CallTransport, U256};

use crate::config::PriceConfig;
use crate::errors::MarketDataError;
use crate::models::PriceQuote;
use crate::provider::{PriceSource, SourceKind};

const SOURCE_ID: &str = "UNISWAP_QUOTER";

/// Quotes one unit of the reference asset (1 USDC) into the token and
/// inverts the output amount.
pub struct QuoterSource {
    transport: Arc<dyn CallTransport>,
    quoter_address: String,
    reference_asset: String,
    reference_decimals: u8,
    token_address: String,
    token_decimals: u8,
    fee_tier: u32,
    sanity_ceiling: f64,
    label: String,
}

impl QuoterSource {
    pub fn new(transport: Arc<dyn CallTransport>, config: &PriceConfig) -> Self {
        Self {
            transport,
            quoter_address: config.quoter_address.clone(),
            reference_asset: config.reference_asset_address.clone(),
            reference_decimals: config.reference_asset_decimals,
            token_address: config.token_address.clone(),
            token_decimals: config.token_decimals,
            fee_tier: config.fee_tier,
            sanity_ceiling: config.sanity_ceiling,
            label: format!("{} ({})", config.quoter_label, config.chain_label),
        }
    }

    /// `quoteExactInputSingle(reference, token, fee, 10^decimals, 0)`
    fn quote_args(&self) -> Vec<CallArg> {
        let one_unit = U256::from(10u64).pow(U256::from(self.reference_decimals));
        vec![
            CallArg::address(self.reference_asset.clone()),
            CallArg::address(self.token_address.clone()),
            CallArg::from(u64::from(self.fee_tier)),
            CallArg::Uint(one_unit),
            // sqrtPriceLimitX96 = 0, no limit
            CallArg::from(0u64),
        ]
    }
}

#[async_trait]
impl PriceSource for QuoterSource {
    fn id(&self) -> &'static str {
        SOURCE_ID
    }

    fn kind(&self) -> SourceKind {
        SourceKind::OnChain
    }

    async fn fetch_price(&self) -> Result<PriceQuote, MarketDataError> {
        let result = super::read(
            self.transport.as_ref(),
            &self.quoter_address,
            QUOTE_EXACT_INPUT_SINGLE_SELECTOR,
            &self.quote_args(),
        )
        .await?;

        // amountOut is the first return value
        let amount_out = decode_uint(&result)?;
        if amount_out.is_zero() {
            return Err(MarketDataError::unavailable(SOURCE_ID, "quoter returned zero"));
        }

        let tokens_per_unit = format_units(amount_out, self.token_decimals);
        let price = 1.0 / tokens_per_unit;
        debug!("Quoter: {} tokens per reference unit -> {}", tokens_per_unit, price);

        if !price.is_finite() || price <= 0.0 || price >= self.sanity_ceiling {
            return Err(MarketDataError::ValidationFailed {
                message: format!("quoter price {} outside (0, {})", price, self.sanity_ceiling),
            });
        }

        Ok(PriceQuote::new(price, self.label.clone()))
    }
}
