//! Shared HTTP plumbing for aggregator sources.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use crate::errors::MarketDataError;

/// Build the client aggregator sources share.
pub(crate) fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// GET `url` and parse the body as JSON.
pub(crate) async fn get_json(
    client: &Client,
    url: &str,
    source_id: &str,
) -> Result<Value, MarketDataError> {
    debug!("{} GET {}", source_id, url);

    let response = client
        .get(url)
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|e| map_request_error(source_id, e))?;

    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(MarketDataError::RateLimited {
            source_id: source_id.to_string(),
        });
    }
    if !status.is_success() {
        return Err(MarketDataError::unavailable(
            source_id,
            format!("HTTP {}", status),
        ));
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| map_request_error(source_id, e))
}

fn map_request_error(source_id: &str, error: reqwest::Error) -> MarketDataError {
    if error.is_timeout() {
        MarketDataError::Timeout {
            source_id: source_id.to_string(),
        }
    } else if error.is_decode() {
        MarketDataError::invalid_response(source_id, error.to_string())
    } else {
        MarketDataError::Network(error)
    }
}

/// Aggregators send numbers either as JSON numbers or as strings.
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}
