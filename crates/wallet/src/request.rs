//! Deadline-bounded wallet requests.

use std::time::Duration;

use log::debug;
use serde_json::Value;
use vmf_chain::Eip1193Provider;

use crate::errors::ConnectionError;

/// Issue `method` through the wallet, failing with `Timeout` after `timeout`.
pub(crate) async fn request(
    provider: &dyn Eip1193Provider,
    method: &str,
    params: Value,
    timeout: Duration,
) -> Result<Value, ConnectionError> {
    debug!("wallet request {}", method);
    match tokio::time::timeout(timeout, provider.request(method, params)).await {
        Ok(result) => result.map_err(ConnectionError::from),
        Err(_) => Err(ConnectionError::Timeout {
            method: method.to_string(),
        }),
    }
}

/// Interpret an `eth_accounts` / `eth_requestAccounts` result.
pub(crate) fn parse_accounts(value: Value) -> Result<Vec<String>, ConnectionError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(address) => Ok(address),
                other => Err(ConnectionError::InvalidResponse(format!(
                    "account is not a string: {}",
                    other
                ))),
            })
            .collect(),
        other => Err(ConnectionError::InvalidResponse(format!(
            "accounts is not an array: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_accounts() {
        assert_eq!(
            parse_accounts(json!(["0xabc", "0xdef"])).unwrap(),
            vec!["0xabc", "0xdef"]
        );
        assert!(parse_accounts(json!([])).unwrap().is_empty());
        assert!(parse_accounts(Value::Null).unwrap().is_empty());
        assert!(parse_accounts(json!("0xabc")).is_err());
        assert!(parse_accounts(json!([1])).is_err());
    }
}
