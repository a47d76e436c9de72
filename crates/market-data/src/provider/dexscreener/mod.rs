//! DexScreener aggregator sources.
//!
//! Two lookups against the same API:
//! - by pool address (`/latest/dex/pairs/{chain}/{pool}`), the most direct
//! - by token address (`/latest/dex/tokens/{token}`), picking the most liquid
//!   pair on the target chain

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::PriceConfig;
use crate::errors::MarketDataError;
use crate::models::PriceQuote;
use crate::provider::http::{get_json, lenient_f64};
use crate::provider::{PriceSource, SourceKind};

const POOL_SOURCE_ID: &str = "DEXSCREENER_POOL";
const TOKEN_SOURCE_ID: &str = "DEXSCREENER_TOKEN";

#[derive(Debug, Default, Deserialize)]
struct PairsResponse {
    #[serde(default)]
    pair: Option<DexPair>,
    #[serde(default)]
    pairs: Option<Vec<DexPair>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DexPair {
    #[serde(default)]
    chain_id: Option<String>,
    #[serde(default)]
    dex_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    price_usd: Option<f64>,
    #[serde(default)]
    liquidity: Option<Liquidity>,
    #[serde(default)]
    volume: Option<Volume>,
}

#[derive(Debug, Deserialize)]
struct Liquidity {
    #[serde(default, deserialize_with = "lenient_f64")]
    usd: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Volume {
    #[serde(default, deserialize_with = "lenient_f64")]
    h24: Option<f64>,
}

impl DexPair {
    fn liquidity_usd(&self) -> Option<f64> {
        self.liquidity.as_ref().and_then(|l| l.usd)
    }

    fn volume_24h_usd(&self) -> Option<f64> {
        self.volume.as_ref().and_then(|v| v.h24)
    }

    fn into_quote(self, source_id: &str) -> Result<PriceQuote, MarketDataError> {
        let price = self
            .price_usd
            .ok_or_else(|| MarketDataError::unavailable(source_id, "pair has no priceUsd"))?;

        if price.is_nan() || price <= 0.0 {
            return Err(MarketDataError::unavailable(
                source_id,
                format!("non-positive price {}", price),
            ));
        }

        let label = format!("{} (Live)", self.dex_id.as_deref().unwrap_or("dexscreener"));
        Ok(PriceQuote::new(price, label)
            .with_market_stats(self.liquidity_usd(), self.volume_24h_usd()))
    }
}

fn parse_body(body: Value, source_id: &str) -> Result<PairsResponse, MarketDataError> {
    serde_json::from_value(body).map_err(|e| MarketDataError::invalid_response(source_id, e.to_string()))
}

/// Interpret a pool lookup response.
pub fn parse_pool_response(body: Value) -> Result<PriceQuote, MarketDataError> {
    let response = parse_body(body, POOL_SOURCE_ID)?;
    let pair = response
        .pair
        .ok_or_else(|| MarketDataError::unavailable(POOL_SOURCE_ID, "pool not found"))?;

    debug!(
        "DexScreener pool: price={:?} liquidity={:?} volume24h={:?} dex={:?}",
        pair.price_usd,
        pair.liquidity_usd(),
        pair.volume_24h_usd(),
        pair.dex_id
    );

    pair.into_quote(POOL_SOURCE_ID)
}

/// Interpret a token lookup response: the most liquid priced pair on `chain_slug` wins.
pub fn parse_token_response(body: Value, chain_slug: &str) -> Result<PriceQuote, MarketDataError> {
    let response = parse_body(body, TOKEN_SOURCE_ID)?;
    let pairs = response.pairs.unwrap_or_default();
    let total = pairs.len();

    let best = pairs
        .into_iter()
        .filter(|p| p.chain_id.as_deref() == Some(chain_slug) && p.price_usd.is_some())
        .max_by(|a, b| {
            let a = a.liquidity_usd().unwrap_or(0.0);
            let b = b.liquidity_usd().unwrap_or(0.0);
            a.total_cmp(&b)
        })
        .ok_or_else(|| {
            MarketDataError::unavailable(
                TOKEN_SOURCE_ID,
                format!("no priced pairs on {} among {} returned", chain_slug, total),
            )
        })?;

    debug!(
        "DexScreener token: {} pairs, best on {} is {:?} with liquidity {:?}",
        total,
        chain_slug,
        best.dex_id,
        best.liquidity_usd()
    );

    best.into_quote(TOKEN_SOURCE_ID)
}

/// Pool-address lookup.
pub struct DexScreenerPoolSource {
    client: Client,
    url: String,
}

impl DexScreenerPoolSource {
    pub fn new(client: Client, config: &PriceConfig) -> Self {
        let url = format!(
            "{}/latest/dex/pairs/{}/{}",
            config.dexscreener_base_url.trim_end_matches('/'),
            config.chain_slug,
            config.pool_address
        );
        Self { client, url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl PriceSource for DexScreenerPoolSource {
    fn id(&self) -> &'static str {
        POOL_SOURCE_ID
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Aggregator
    }

    async fn fetch_price(&self) -> Result<PriceQuote, MarketDataError> {
        let body = get_json(&self.client, &self.url, POOL_SOURCE_ID).await?;
        parse_pool_response(body).inspect_err(|e| warn!("DexScreener pool lookup: {}", e))
    }
}

/// Token-address lookup.
pub struct DexScreenerTokenSource {
    client: Client,
    url: String,
    chain_slug: String,
}

impl DexScreenerTokenSource {
    pub fn new(client: Client, config: &PriceConfig) -> Self {
        let url = format!(
            "{}/latest/dex/tokens/{}",
            config.dexscreener_base_url.trim_end_matches('/'),
            config.token_address
        );
        Self {
            client,
            url,
            chain_slug: config.chain_slug.clone(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl PriceSource for DexScreenerTokenSource {
    fn id(&self) -> &'static str {
        TOKEN_SOURCE_ID
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Aggregator
    }

    async fn fetch_price(&self) -> Result<PriceQuote, MarketDataError> {
        let body = get_json(&self.client, &self.url, TOKEN_SOURCE_ID).await?;
        parse_token_response(body, &self.chain_slug)
            .inspect_err(|e| warn!("DexScreener token lookup: {}", e))
    }
}
