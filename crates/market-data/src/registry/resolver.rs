//! Price resolver: the ordered waterfall of price sources.
//!
//! For each source, in order:
//! 1. Skip it if its circuit is open
//! 2. Fetch a quote
//! 3. Validate the quote
//! 4. On success stop; on any failure record it and move on
//!
//! Per-source failures never escape. If the waterfall's own control flow
//! panics, the resolution degrades to the fallback sentinel with
//! `success = false`.

use std::convert::Infallible;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use log::{debug, error, info, warn};
use vmf_chain::{run_ordered, AttemptLog, CallTransport, Step};

use super::{CircuitBreaker, QuoteValidator, SkipReason};
use crate::config::PriceConfig;
use crate::errors::RetryClass;
use crate::models::{PriceQuote, PriceResolution};
use crate::provider::http::build_client;
use crate::provider::{
    CoinGeckoSource, DefaultPriceSource, DexScreenerPoolSource, DexScreenerTokenSource,
    FixedPriceOracleSource, PoolSlot0Source, PriceSource, QuoterSource, StaticMultipleSource,
};

/// Resolves a USD price for one token from an ordered list of sources.
pub struct PriceResolver {
    sources: Vec<Arc<dyn PriceSource>>,
    circuit_breaker: CircuitBreaker,
    validator: QuoteValidator,
}

impl PriceResolver {
    /// Resolver over `sources`, tried in the given order.
    pub fn new(sources: Vec<Arc<dyn PriceSource>>) -> Self {
        Self::with_config(sources, CircuitBreaker::new(), QuoteValidator::new())
    }

    pub fn with_config(
        sources: Vec<Arc<dyn PriceSource>>,
        circuit_breaker: CircuitBreaker,
        validator: QuoteValidator,
    ) -> Self {
        Self {
            sources,
            circuit_breaker,
            validator,
        }
    }

    /// The production waterfall: pool lookup, token lookup, CoinGecko,
    /// quoter, pool `slot0`, fixed-price oracle, static multiple, default.
    pub fn with_defaults(config: &PriceConfig, transport: Arc<dyn CallTransport>) -> Self {
        let client = build_client(config.request_timeout);

        let sources: Vec<Arc<dyn PriceSource>> = vec![
            Arc::new(DexScreenerPoolSource::new(client.clone(), config)),
            Arc::new(DexScreenerTokenSource::new(client.clone(), config)),
            Arc::new(CoinGeckoSource::new(client, config)),
            Arc::new(QuoterSource::new(transport.clone(), config)),
            Arc::new(PoolSlot0Source::new(transport.clone(), config)),
            Arc::new(FixedPriceOracleSource::new(transport.clone(), config)),
            Arc::new(StaticMultipleSource::new(transport, config)),
            Arc::new(DefaultPriceSource),
        ];

        Self::new(sources)
    }

    pub fn sources(&self) -> &[Arc<dyn PriceSource>] {
        &self.sources
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    /// Run the waterfall once. Never fails.
    pub async fn resolve(&self) -> PriceResolution {
        match AssertUnwindSafe(self.run_waterfall()).catch_unwind().await {
            Ok(resolution) => resolution,
            Err(_) => {
                error!("Price resolution panicked, returning fallback price");
                PriceResolution::fallback(AttemptLog::new())
            }
        }
    }

    async fn run_waterfall(&self) -> PriceResolution {
        let mut log = AttemptLog::new();

        let found = run_ordered(&self.sources, &mut log, |source| self.attempt(source)).await;

        let quote = match found {
            Ok(Some(quote)) => quote,
            Ok(None) => {
                warn!("Every price source failed, using default price");
                PriceQuote::default_price()
            }
            Err(never) => match never {},
        };

        info!(
            "Resolved price {} from '{}' [{}]",
            quote.price_usd_per_token,
            quote.source,
            log.summary()
        );

        PriceResolution::resolved(quote, log)
    }

    async fn attempt(&self, source: &Arc<dyn PriceSource>) -> Step<PriceQuote, Infallible> {
        let id = source.id();

        if !self.circuit_breaker.is_allowed(id) {
            debug!("Circuit breaker open for source '{}', skipping", id);
            return Step::Skip(SkipReason::CircuitBreakerOpen.to_string());
        }

        let error = match source.fetch_price().await {
            Ok(quote) => match self.validator.validate(&quote) {
                Ok(()) => {
                    self.circuit_breaker.record_success(id);
                    return Step::Found(quote);
                }
                Err(e) => e,
            },
            Err(e) => e,
        };

        match error.retry_class() {
            RetryClass::FailoverWithPenalty => {
                self.circuit_breaker.record_failure(id);
                warn!("Source '{}' failed with {}, recorded circuit breaker failure", id, error);
            }
            RetryClass::Never | RetryClass::NextProvider | RetryClass::CircuitOpen => {
                debug!("Source '{}' failed with {}, trying next source", id, error);
            }
        }

        Step::Next(error.to_string())
    }
}
