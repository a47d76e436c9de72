//! Quote validation.
//!
//! Every quote a source returns passes through here before the waterfall
//! accepts it:
//! - price must be finite and strictly positive (hard)
//! - price must stay under a sanity ceiling (hard)
//! - reported liquidity below a floor is accepted with a warning (soft)

use log::warn;

use crate::errors::MarketDataError;
use crate::models::PriceQuote;

/// Validation severity levels.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValidationSeverity {
    /// Reject the quote; try the next source.
    Hard,
    /// Accept the quote but log a warning.
    Soft,
}

#[derive(Clone, Debug)]
struct ValidationIssue {
    severity: ValidationSeverity,
    message: String,
}

/// Quote validator configuration.
#[derive(Clone, Debug)]
pub struct ValidatorConfig {
    /// Quotes at or above this are rejected.
    pub max_price: Option<f64>,
    /// Warn when a source reports less liquidity than this (USD).
    pub min_liquidity_usd: Option<f64>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_price: Some(1_000_000.0),
            min_liquidity_usd: Some(1_000.0),
        }
    }
}

/// Quote validator.
pub struct QuoteValidator {
    config: ValidatorConfig,
}

impl QuoteValidator {
    pub fn new() -> Self {
        Self::with_config(ValidatorConfig::default())
    }

    pub fn with_config(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// Returns `Err(ValidationFailed)` on any hard issue; soft issues are logged.
    pub fn validate(&self, quote: &PriceQuote) -> Result<(), MarketDataError> {
        let mut issues = Vec::new();
        self.check_price(quote, &mut issues);
        self.check_liquidity(quote, &mut issues);

        let hard: Vec<&str> = issues
            .iter()
            .filter(|i| i.severity == ValidationSeverity::Hard)
            .map(|i| i.message.as_str())
            .collect();

        if !hard.is_empty() {
            return Err(MarketDataError::ValidationFailed {
                message: hard.join("; "),
            });
        }

        for issue in issues.iter().filter(|i| i.severity == ValidationSeverity::Soft) {
            warn!("Quote from '{}': {}", quote.source, issue.message);
        }

        Ok(())
    }

    fn check_price(&self, quote: &PriceQuote, issues: &mut Vec<ValidationIssue>) {
        let price = quote.price_usd_per_token;

        if !price.is_finite() || price <= 0.0 {
            issues.push(ValidationIssue {
                severity: ValidationSeverity::Hard,
                message: format!("Non-positive price: {}", price),
            });
            return;
        }

        if let Some(max) = self.config.max_price {
            if price >= max {
                issues.push(ValidationIssue {
                    severity: ValidationSeverity::Hard,
                    message: format!("Price {} exceeds sanity ceiling {}", price, max),
                });
            }
        }
    }

    fn check_liquidity(&self, quote: &PriceQuote, issues: &mut Vec<ValidationIssue>) {
        if let (Some(floor), Some(liquidity)) = (self.config.min_liquidity_usd, quote.liquidity_usd) {
            if liquidity < floor {
                issues.push(ValidationIssue {
                    severity: ValidationSeverity::Soft,
                    message: format!("Thin liquidity: ${:.0}", liquidity),
                });
            }
        }
    }
}

impl Default for QuoteValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_quote() {
        let validator = QuoteValidator::new();
        assert!(validator.validate(&PriceQuote::new(0.081, "sushiswap (Live)")).is_ok());
    }

    #[test]
    fn test_non_positive_and_nan_rejected() {
        let validator = QuoteValidator::new();
        for price in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let result = validator.validate(&PriceQuote::new(price, "test"));
            assert!(
                matches!(result, Err(MarketDataError::ValidationFailed { .. })),
                "price {} should be rejected",
                price
            );
        }
    }

    #[test]
    fn test_ceiling() {
        let validator = QuoteValidator::new();
        assert!(validator.validate(&PriceQuote::new(1_000_000.0, "test")).is_err());
        assert!(validator.validate(&PriceQuote::new(999_999.0, "test")).is_ok());

        let unbounded = QuoteValidator::with_config(ValidatorConfig {
            max_price: None,
            ..Default::default()
        });
        assert!(unbounded.validate(&PriceQuote::new(1e12, "test")).is_ok());
    }

    #[test]
    fn test_thin_liquidity_is_only_a_warning() {
        let validator = QuoteValidator::new();
        let quote = PriceQuote::new(0.08, "test").with_market_stats(Some(10.0), None);
        assert!(validator.validate(&quote).is_ok());
    }
}
