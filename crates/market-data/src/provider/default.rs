//! The hard default: always 1 USD per token.

use async_trait::async_trait;

use crate::errors::MarketDataError;
use crate::models::PriceQuote;
use crate::provider::{PriceSource, SourceKind};

const SOURCE_ID: &str = "DEFAULT";

/// Last strategy in every waterfall. Never fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultPriceSource;

#[async_trait]
impl PriceSource for DefaultPriceSource {
    fn id(&self) -> &'static str {
        SOURCE_ID
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Static
    }

    async fn fetch_price(&self) -> Result<PriceQuote, MarketDataError> {
        Ok(PriceQuote::default_price())
    }
}
