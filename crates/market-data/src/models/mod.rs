//! Price quote models.

mod quote;

pub use quote::{PriceQuote, PriceResolution, DEFAULT_SOURCE, FALLBACK_SOURCE};
