//! Price waterfall orchestration.
//!
//! This module provides:
//! - [`PriceResolver`], the ordered first-valid-quote-wins loop
//! - Circuit breaking per source
//! - Quote validation

mod circuit_breaker;
mod resolver;
mod skip_reason;
mod validator;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitSnapshot, CircuitState};
pub use resolver::PriceResolver;
pub use skip_reason::SkipReason;
pub use validator::{QuoteValidator, ValidationSeverity, ValidatorConfig};
