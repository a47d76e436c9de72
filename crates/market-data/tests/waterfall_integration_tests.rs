//! Waterfall behavior across repeated resolutions.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use vmf_chain::AttemptOutcome;
use vmf_market_data::{
    CircuitBreaker, CircuitBreakerConfig, DefaultPriceSource, MarketDataError, PriceQuote, PriceResolver,
    PriceSource, QuoteValidator, SourceKind,
};

/// An aggregator that always times out.
#[derive(Default)]
struct HungAggregator {
    calls: AtomicUsize,
}

#[async_trait]
impl PriceSource for HungAggregator {
    fn id(&self) -> &'static str {
        "HUNG"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Aggregator
    }

    async fn fetch_price(&self) -> Result<PriceQuote, MarketDataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(MarketDataError::Timeout {
            source_id: self.id().to_string(),
        })
    }
}

struct Oracle;

#[async_trait]
impl PriceSource for Oracle {
    fn id(&self) -> &'static str {
        "ORACLE"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::OnChain
    }

    async fn fetch_price(&self) -> Result<PriceQuote, MarketDataError> {
        Ok(PriceQuote::new(0.042, "Fixed Price Oracle"))
    }
}

#[tokio::test]
async fn failing_source_is_skipped_once_its_circuit_opens() {
    let hung = Arc::new(HungAggregator::default());
    let sources: Vec<Arc<dyn PriceSource>> = vec![hung.clone(), Arc::new(Oracle), Arc::new(DefaultPriceSource)];
    let breaker = CircuitBreaker::with_config(CircuitBreakerConfig {
        failure_threshold: 2,
        recovery_timeout: Duration::from_secs(300),
        ..CircuitBreakerConfig::default()
    });
    let resolver = PriceResolver::with_config(sources, breaker, QuoteValidator::new());

    for _ in 0..2 {
        let resolution = resolver.resolve().await;
        assert_eq!(resolution.quote.source, "Fixed Price Oracle");
        assert!(matches!(
            resolution.diagnostics.attempts()[0].outcome,
            AttemptOutcome::Failed(_)
        ));
    }

    let resolution = resolver.resolve().await;

    assert_eq!(hung.calls.load(Ordering::SeqCst), 2);
    assert_eq!(resolution.quote.price_usd_per_token, 0.042);
    assert!(resolution.success);
    assert!(matches!(
        resolution.diagnostics.attempts()[0].outcome,
        AttemptOutcome::Skipped(_)
    ));
    assert_eq!(resolution.diagnostics.attempted(), vec!["ORACLE"]);
}

#[tokio::test]
async fn default_is_reached_when_everything_else_fails() {
    let sources: Vec<Arc<dyn PriceSource>> = vec![
        Arc::new(HungAggregator::default()),
        Arc::new(DefaultPriceSource),
    ];
    let resolver = PriceResolver::new(sources);

    let resolution = resolver.resolve().await;

    assert_eq!(resolution.quote, PriceQuote::default_price());
    assert!(resolution.success);
    assert!(resolution.diagnostics.summary().starts_with("HUNG: ERROR"));
}
