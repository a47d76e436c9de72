//! CoinGecko simple token price source.
//!
//! `GET /simple/token_price/{chain}?contract_addresses={token}&vs_currencies=usd`
//! answers with a map keyed by the lower-cased contract address.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::config::PriceConfig;
use crate::errors::MarketDataError;
use crate::models::PriceQuote;
use crate::provider::http::get_json;
use crate::provider::{PriceSource, SourceKind};

const SOURCE_ID: &str = "COINGECKO";
const SOURCE_LABEL: &str = "CoinGecko";

/// Interpret a simple-price response for `token_address`.
pub fn parse_simple_price(body: &Value, token_address: &str) -> Result<PriceQuote, MarketDataError> {
    let key = token_address.to_ascii_lowercase();

    let entry = body
        .get(&key)
        .ok_or_else(|| MarketDataError::unavailable(SOURCE_ID, format!("no entry for {}", key)))?;

    let price = entry
        .get("usd")
        .and_then(Value::as_f64)
        .ok_or_else(|| MarketDataError::invalid_response(SOURCE_ID, "entry has no numeric usd"))?;

    if price.is_nan() || price <= 0.0 {
        return Err(MarketDataError::unavailable(
            SOURCE_ID,
            format!("non-positive price {}", price),
        ));
    }

    debug!("CoinGecko price for {}: {}", key, price);
    Ok(PriceQuote::new(price, SOURCE_LABEL))
}

/// Secondary aggregator keyed by token contract address.
pub struct CoinGeckoSource {
    client: Client,
    url: String,
    token_address: String,
}

impl CoinGeckoSource {
    pub fn new(client: Client, config: &PriceConfig) -> Self {
        let url = format!(
            "{}/simple/token_price/{}?contract_addresses={}&vs_currencies=usd",
            config.coingecko_base_url.trim_end_matches('/'),
            config.chain_slug,
            config.token_address
        );
        Self {
            client,
            url,
            token_address: config.token_address.clone(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl PriceSource for CoinGeckoSource {
    fn id(&self) -> &'static str {
        SOURCE_ID
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Aggregator
    }

    async fn fetch_price(&self) -> Result<PriceQuote, MarketDataError> {
        let body = get_json(&self.client, &self.url, SOURCE_ID).await?;
        parse_simple_price(&body, &self.token_address)
    }
}
