use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use vmf_chain::encoder::{is_zero_address, PRICE_ORACLE_SIGNATURE, SPOT_PRICE_SIGNATURE};
use vmf_chain::{decode_address, decode_uint, format_units, selector, CallTransport};

use crate::config::PriceConfig;
use crate::errors::MarketDataError;
use crate::models::PriceQuote;
use crate::provider::{PriceSource, SourceKind};

const SOURCE_ID: &str = "FIXED_PRICE_ORACLE";
const SOURCE_LABEL: &str = "Fixed Price Oracle";

/// Oracle prices are 1e18 scaled.
const ORACLE_DECIMALS: u8 = 18;

/// Asks the token for its `priceOracle()` and, when one is set, reads
/// `spotPriceUSDCPerVMF()` from it.
pub struct FixedPriceOracleSource {
    transport: Arc<dyn CallTransport>,
    token_address: String,
    oracle_override: Option<String>,
}

impl FixedPriceOracleSource {
    pub fn new(transport: Arc<dyn CallTransport>, config: &PriceConfig) -> Self {
        Self {
            transport,
            token_address: config.token_address.clone(),
            oracle_override: config.fixed_price_oracle.clone(),
        }
    }

    async fn oracle_address(&self) -> Result<String, MarketDataError> {
        if let Some(address) = &self.oracle_override {
            return Ok(address.clone());
        }

        let result = super::read(
            self.transport.as_ref(),
            &self.token_address,
            &selector(PRICE_ORACLE_SIGNATURE),
            &[],
        )
        .await?;
        let address = decode_address(&result)?;

        if is_zero_address(&address) {
            return Err(MarketDataError::unavailable(SOURCE_ID, "no price oracle set"));
        }
        Ok(address)
    }
}

#[async_trait]
impl PriceSource for FixedPriceOracleSource {
    fn id(&self) -> &'static str {
        SOURCE_ID
    }

    fn kind(&self) -> SourceKind {
        SourceKind::OnChain
    }

    async fn fetch_price(&self) -> Result<PriceQuote, MarketDataError> {
        let oracle = self.oracle_address().await?;
        debug!("Reading spot price from oracle {}", oracle);

        let result = super::read(
            self.transport.as_ref(),
            &oracle,
            &selector(SPOT_PRICE_SIGNATURE),
            &[],
        )
        .await?;
        let price = format_units(decode_uint(&result)?, ORACLE_DECIMALS);

        if price <= 0.0 {
            return Err(MarketDataError::unavailable(SOURCE_ID, "oracle price is zero"));
        }
        Ok(PriceQuote::new(price, SOURCE_LABEL))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FIXED_PRICE_ORACLE_ADDRESS, VMF_TOKEN_ADDRESS};
    use crate::provider::onchain::testing::{word, ScriptedTransport};

    #[tokio::test]
    async fn test_reads_spot_price_from_token_oracle() {
        // 0.02e18
        let transport = ScriptedTransport::default()
            .reply(
                VMF_TOKEN_ADDRESS,
                &selector(PRICE_ORACLE_SIGNATURE),
                &word(&FIXED_PRICE_ORACLE_ADDRESS[2..]),
            )
            .reply(
                FIXED_PRICE_ORACLE_ADDRESS,
                &selector(SPOT_PRICE_SIGNATURE),
                &word(&format!("{:x}", 20_000_000_000_000_000u64)),
            );

        let source = FixedPriceOracleSource::new(Arc::new(transport), &PriceConfig::default());
        let quote = source.fetch_price().await.unwrap();
        assert!((quote.price_usd_per_token - 0.02).abs() < 1e-12);
        assert_eq!(quote.source, "Fixed Price Oracle");
    }

    #[tokio::test]
    async fn test_zero_oracle_is_unavailable() {
        let transport = Arc::new(ScriptedTransport::default().reply(
            VMF_TOKEN_ADDRESS,
            &selector(PRICE_ORACLE_SIGNATURE),
            &word("0"),
        ));

        let source = FixedPriceOracleSource::new(transport.clone(), &PriceConfig::default());
        assert!(matches!(
            source.fetch_price().await,
            Err(MarketDataError::Unavailable { .. })
        ));
        // never asked a zero address for a price
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_override_skips_lookup() {
        let transport = Arc::new(ScriptedTransport::default().reply(
            FIXED_PRICE_ORACLE_ADDRESS,
            &selector(SPOT_PRICE_SIGNATURE),
            &word(&format!("{:x}", 1_000_000_000_000_000_000u64)),
        ));
        let config = PriceConfig {
            fixed_price_oracle: Some(FIXED_PRICE_ORACLE_ADDRESS.to_string()),
            ..Default::default()
        };

        let source = FixedPriceOracleSource::new(transport.clone(), &config);
        let quote = source.fetch_price().await.unwrap();
        assert_eq!(quote.price_usd_per_token, 1.0);
        assert_eq!(transport.call_count(), 1);
    }
}
