use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use vmf_chain::encoder::DONATION_MULTIPLE_BPS_SELECTOR;
use vmf_chain::{decode_uint, u256_to_f64, CallTransport};

use crate::config::PriceConfig;
use crate::errors::MarketDataError;
use crate::models::PriceQuote;
use crate::provider::{PriceSource, SourceKind};

const SOURCE_ID: &str = "STATIC_MULTIPLE";
const SOURCE_LABEL: &str = "VMF Static Multiple";
const BPS_DENOMINATOR: f64 = 10_000.0;

/// Reads `donationMultipleBps()` from the token; price = bps / 10 000.
pub struct StaticMultipleSource {
    transport: Arc<dyn CallTransport>,
    token_address: String,
}

impl StaticMultipleSource {
    pub fn new(transport: Arc<dyn CallTransport>, config: &PriceConfig) -> Self {
        Self {
            transport,
            token_address: config.token_address.clone(),
        }
    }
}

#[async_trait]
impl PriceSource for StaticMultipleSource {
    fn id(&self) -> &'static str {
        SOURCE_ID
    }

    fn kind(&self) -> SourceKind {
        SourceKind::OnChain
    }

    async fn fetch_price(&self) -> Result<PriceQuote, MarketDataError> {
        let result = super::read(
            self.transport.as_ref(),
            &self.token_address,
            DONATION_MULTIPLE_BPS_SELECTOR,
            &[],
        )
        .await?;

        let bps = decode_uint(&result)?;
        let price = u256_to_f64(bps) / BPS_DENOMINATOR;
        debug!("donationMultipleBps = {} -> {}", bps, price);

        if price <= 0.0 {
            return Err(MarketDataError::unavailable(SOURCE_ID, "multiple is zero"));
        }
        Ok(PriceQuote::new(price, SOURCE_LABEL))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VMF_TOKEN_ADDRESS;
    use crate::provider::onchain::testing::{word, ScriptedTransport};

    #[tokio::test]
    async fn test_bps_to_price() {
        // 10 000 bps = 1:1
        let transport = ScriptedTransport::default().reply(
            VMF_TOKEN_ADDRESS,
            DONATION_MULTIPLE_BPS_SELECTOR,
            &word("2710"),
        );
        let source = StaticMultipleSource::new(Arc::new(transport), &PriceConfig::default());

        let quote = source.fetch_price().await.unwrap();
        assert_eq!(quote.price_usd_per_token, 1.0);
        assert_eq!(quote.source, "VMF Static Multiple");
    }

    #[tokio::test]
    async fn test_zero_multiple_is_unavailable() {
        let transport = ScriptedTransport::default().reply(
            VMF_TOKEN_ADDRESS,
            DONATION_MULTIPLE_BPS_SELECTOR,
            &word("0"),
        );
        let source = StaticMultipleSource::new(Arc::new(transport), &PriceConfig::default());
        assert!(matches!(
            source.fetch_price().await,
            Err(MarketDataError::Unavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_revert_is_chain_error() {
        let source =
            StaticMultipleSource::new(Arc::new(ScriptedTransport::default()), &PriceConfig::default());
        assert!(matches!(
            source.fetch_price().await,
            Err(MarketDataError::Chain(_))
        ));
    }
}
