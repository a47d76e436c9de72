use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vmf_chain::AttemptLog;

/// Source label of the intentional last-resort price.
pub const DEFAULT_SOURCE: &str = "default";

/// Source label used when the resolver itself failed.
pub const FALLBACK_SOURCE: &str = "fallback";

/// A USD price for one token, as reported by one source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    /// USD per token; positive once validated
    pub price_usd_per_token: f64,

    /// Human-readable origin (`sushiswap (Live)`, `CoinGecko`, `Uniswap V3 (Base)`, ...)
    pub source: String,

    /// Pool liquidity in USD, when the source reports it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liquidity_usd: Option<f64>,

    /// 24h trading volume in USD, when the source reports it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_24h_usd: Option<f64>,
}

impl PriceQuote {
    pub fn new(price_usd_per_token: f64, source: impl Into<String>) -> Self {
        Self {
            price_usd_per_token,
            source: source.into(),
            liquidity_usd: None,
            volume_24h_usd: None,
        }
    }

    pub fn with_market_stats(mut self, liquidity_usd: Option<f64>, volume_24h_usd: Option<f64>) -> Self {
        self.liquidity_usd = liquidity_usd;
        self.volume_24h_usd = volume_24h_usd;
        self
    }

    /// The hard default: 1 USD per token.
    pub fn default_price() -> Self {
        Self::new(1.0, DEFAULT_SOURCE)
    }
}

/// Outcome of one pass through the waterfall.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceResolution {
    pub quote: PriceQuote,

    /// `false` only when the resolver's own control flow failed and the
    /// quote is the fallback sentinel. Reaching the hard default is a success.
    pub success: bool,

    /// Every source considered, in order.
    pub diagnostics: AttemptLog,

    pub resolved_at: DateTime<Utc>,
}

impl PriceResolution {
    pub fn resolved(quote: PriceQuote, diagnostics: AttemptLog) -> Self {
        Self {
            quote,
            success: true,
            diagnostics,
            resolved_at: Utc::now(),
        }
    }

    /// Sentinel returned when resolution itself blew up.
    pub fn fallback(diagnostics: AttemptLog) -> Self {
        Self {
            quote: PriceQuote::new(1.0, FALLBACK_SOURCE),
            success: false,
            diagnostics,
            resolved_at: Utc::now(),
        }
    }

    pub fn price(&self) -> f64 {
        self.quote.price_usd_per_token
    }

    pub fn source(&self) -> &str {
        &self.quote.source
    }

    /// True when no real source produced the price.
    pub fn is_default(&self) -> bool {
        self.quote.source == DEFAULT_SOURCE || self.quote.source == FALLBACK_SOURCE
    }
}
