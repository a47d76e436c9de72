//! Price source trait definition.

use async_trait::async_trait;
use vmf_chain::Labeled;

use crate::errors::MarketDataError;
use crate::models::PriceQuote;

use super::capabilities::SourceKind;

/// One strategy in the price waterfall.
///
/// Implementations catch nothing: they return a [`MarketDataError`] for
/// every way they can fail, and the resolver turns that into "try next".
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use vmf_market_data::provider::{PriceSource, SourceKind};
///
/// struct FixedSource;
///
/// #[async_trait]
/// impl PriceSource for FixedSource {
///     fn id(&self) -> &'static str {
///         "FIXED"
///     }
///
///     fn kind(&self) -> SourceKind {
///         SourceKind::Static
///     }
///
///     async fn fetch_price(&self) -> Result<PriceQuote, MarketDataError> {
///         Ok(PriceQuote::new(0.5, "Fixed"))
///     }
/// }
/// ```
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Unique identifier, e.g. "DEXSCREENER_POOL". Used for logging,
    /// circuit breaker tracking and diagnostics.
    fn id(&self) -> &'static str;

    /// Where the price comes from.
    fn kind(&self) -> SourceKind;

    /// Fetch one quote.
    async fn fetch_price(&self) -> Result<PriceQuote, MarketDataError>;
}

impl Labeled for dyn PriceSource {
    fn label(&self) -> &str {
        self.id()
    }
}
