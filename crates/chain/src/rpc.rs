//! Read-only call transports.
//!
//! [`CallTransport`] is the seam on-chain readers use to submit a [`RawCall`].
//! Two implementations exist: [`JsonRpcClient`] talks to a public JSON-RPC
//! endpoint over HTTP, [`ProviderTransport`] routes the same call through an
//! injected wallet.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::U256;
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::encoder::RawCall;
use crate::errors::ChainError;
use crate::network::{parse_chain_id, ChainTarget};
use crate::provider::Eip1193Provider;

/// Default HTTP request timeout
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(10);

/// Something that can execute an `eth_call` against the latest block.
#[async_trait]
pub trait CallTransport: Send + Sync {
    /// Short name for logs and diagnostics (`"rpc"`, `"provider"`).
    fn name(&self) -> &str;

    /// Execute the call and return the raw hex result (`0x` on revert).
    async fn eth_call(&self, call: &RawCall) -> Result<String, ChainError>;
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    #[serde(default)]
    message: String,
}

/// Minimal JSON-RPC 2.0 client for a public endpoint.
pub struct JsonRpcClient {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Client for the target's first RPC URL.
    pub fn for_target(target: &ChainTarget, timeout: Duration) -> Result<Self, ChainError> {
        let url = target.primary_rpc_url().ok_or_else(|| {
            ChainError::InvalidResponse(format!("{} has no RPC URL", target.chain_name))
        })?;
        Ok(Self::new(url, timeout))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send one request and return its `result`.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id,
        };

        debug!("JSON-RPC {} (id {}) -> {}", method, id, self.url);

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_reqwest_error(method, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChainError::Rpc {
                code: i64::from(status.as_u16()),
                message: format!("HTTP {} from {}", status, self.url),
            });
        }

        let envelope: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| map_reqwest_error(method, e))?;

        unwrap_envelope(envelope)
    }

    /// `eth_getBalance` of `address` at the latest block, in wei.
    pub async fn get_balance(&self, address: &str) -> Result<U256, ChainError> {
        let result = self
            .request("eth_getBalance", json!([address, "latest"]))
            .await?;
        let hex = result
            .as_str()
            .ok_or_else(|| ChainError::InvalidResponse(format!("balance: {}", result)))?;
        crate::encoder::decode_uint(hex)
    }

    /// `eth_chainId` of the endpoint.
    pub async fn chain_id(&self) -> Result<u64, ChainError> {
        let result = self.request("eth_chainId", json!([])).await?;
        parse_chain_id(&result)
    }
}

fn map_reqwest_error(method: &str, error: reqwest::Error) -> ChainError {
    if error.is_timeout() {
        ChainError::Timeout(method.to_string())
    } else {
        ChainError::Network(error)
    }
}

fn unwrap_envelope(envelope: JsonRpcResponse) -> Result<Value, ChainError> {
    if let Some(error) = envelope.error {
        return Err(ChainError::Rpc {
            code: error.code,
            message: error.message,
        });
    }
    envelope
        .result
        .ok_or_else(|| ChainError::InvalidResponse("response has neither result nor error".into()))
}

fn call_params(call: &RawCall) -> Value {
    json!([{ "to": call.to, "data": call.data }, "latest"])
}

fn result_as_hex(result: Value) -> Result<String, ChainError> {
    match result {
        Value::String(hex) => Ok(hex),
        Value::Null => Ok("0x".to_string()),
        other => Err(ChainError::InvalidResponse(format!(
            "eth_call returned {}",
            other
        ))),
    }
}

#[async_trait]
impl CallTransport for JsonRpcClient {
    fn name(&self) -> &str {
        "rpc"
    }

    async fn eth_call(&self, call: &RawCall) -> Result<String, ChainError> {
        let result = self.request("eth_call", call_params(call)).await?;
        result_as_hex(result)
    }
}

/// Routes `eth_call` through an injected wallet provider.
pub struct ProviderTransport {
    provider: Arc<dyn Eip1193Provider>,
    timeout: Duration,
}

impl ProviderTransport {
    pub fn new(provider: Arc<dyn Eip1193Provider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }
}

#[async_trait]
impl CallTransport for ProviderTransport {
    fn name(&self) -> &str {
        "provider"
    }

    async fn eth_call(&self, call: &RawCall) -> Result<String, ChainError> {
        let request = self.provider.request("eth_call", call_params(call));
        let result = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| ChainError::Timeout("eth_call".to_string()))??;
        result_as_hex(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ProviderFlags, ProviderRpcError};
    use std::sync::Mutex;

    struct EchoProvider {
        calls: Mutex<Vec<(String, Value)>>,
        reply: Result<Value, ProviderRpcError>,
    }

    #[async_trait]
    impl Eip1193Provider for EchoProvider {
        fn flags(&self) -> ProviderFlags {
            ProviderFlags::default()
        }

        async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError> {
            self.calls
                .lock()
                .unwrap()
                .push((method.to_string(), params));
            self.reply.clone()
        }
    }

    struct HangingProvider;

    #[async_trait]
    impl Eip1193Provider for HangingProvider {
        fn flags(&self) -> ProviderFlags {
            ProviderFlags::default()
        }

        async fn request(&self, _method: &str, _params: Value) -> Result<Value, ProviderRpcError> {
            std::future::pending().await
        }
    }

    fn sample_call() -> RawCall {
        RawCall {
            to: "0x2213414893259b0c48066acd1763e7fba97859e5".to_string(),
            data: "0x313ce567".to_string(),
        }
    }

    #[test]
    fn test_unwrap_envelope() {
        let ok: JsonRpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0", "id": 1, "result": "0x12"
        }))
        .unwrap();
        assert_eq!(unwrap_envelope(ok).unwrap(), json!("0x12"));

        let err: JsonRpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0", "id": 1, "error": { "code": -32000, "message": "execution reverted" }
        }))
        .unwrap();
        assert!(matches!(
            unwrap_envelope(err),
            Err(ChainError::Rpc { code: -32000, .. })
        ));

        let empty: JsonRpcResponse = serde_json::from_value(json!({ "id": 1 })).unwrap();
        assert!(matches!(
            unwrap_envelope(empty),
            Err(ChainError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_call_params_shape() {
        let params = call_params(&sample_call());
        assert_eq!(params[0]["to"], "0x2213414893259b0c48066acd1763e7fba97859e5");
        assert_eq!(params[0]["data"], "0x313ce567");
        assert_eq!(params[1], "latest");
    }

    #[tokio::test]
    async fn test_provider_transport_forwards_eth_call() {
        let provider = Arc::new(EchoProvider {
            calls: Mutex::new(Vec::new()),
            reply: Ok(json!("0x12")),
        });
        let transport = ProviderTransport::new(provider.clone(), Duration::from_secs(1));

        let result = transport.eth_call(&sample_call()).await.unwrap();
        assert_eq!(result, "0x12");

        let calls = provider.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "eth_call");
    }

    #[tokio::test]
    async fn test_provider_transport_maps_provider_error() {
        let provider = Arc::new(EchoProvider {
            calls: Mutex::new(Vec::new()),
            reply: Err(ProviderRpcError::internal("read failed")),
        });
        let transport = ProviderTransport::new(provider, Duration::from_secs(1));

        let err = transport.eth_call(&sample_call()).await.unwrap_err();
        assert!(matches!(err, ChainError::Provider(_)));
    }

    #[tokio::test]
    async fn test_provider_transport_times_out() {
        let transport = ProviderTransport::new(Arc::new(HangingProvider), Duration::from_millis(20));
        let err = transport.eth_call(&sample_call()).await.unwrap_err();
        assert!(matches!(err, ChainError::Timeout(_)));
    }

    #[test]
    fn test_for_target_uses_first_rpc_url() {
        let client = JsonRpcClient::for_target(&ChainTarget::base(), DEFAULT_RPC_TIMEOUT).unwrap();
        assert_eq!(client.url(), "https://mainnet.base.org");

        let mut target = ChainTarget::base();
        target.rpc_urls.clear();
        assert!(JsonRpcClient::for_target(&target, DEFAULT_RPC_TIMEOUT).is_err());
    }
}
