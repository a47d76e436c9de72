//! Token and native balance reads.
//!
//! `balanceOf` goes through the connected wallet first. Some injected
//! providers intermittently fail read calls while the chain is healthy, so a
//! failed wallet read is repeated verbatim against a public RPC endpoint.
//! A wallet that is not on the target chain is never read from.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use serde::{Serialize, Serializer};
use vmf_chain::encoder::{BALANCE_OF_SELECTOR, DECIMALS_SELECTOR};
use vmf_chain::{
    decode_uint, format_units, CallArg, CallTransport, ChainError, ChainTarget, Eip1193Provider,
    ProviderTransport, RawCall, U256,
};

use crate::config::DEFAULT_WALLET_REQUEST_TIMEOUT;
use crate::enforcer::NetworkEnforcer;
use crate::errors::ConnectionError;
use crate::request::request;

/// Decimals assumed when the token does not answer `decimals()`.
pub const DEFAULT_TOKEN_DECIMALS: u8 = 18;

/// Which path produced a balance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BalanceSource {
    Wallet,
    DirectRpc,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub amount: f64,
    #[serde(serialize_with = "serialize_decimal")]
    pub raw: U256,
    pub decimals: u8,
    pub source: BalanceSource,
}

fn serialize_decimal<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

pub struct BalanceResolver {
    direct: Arc<dyn CallTransport>,
    enforcer: NetworkEnforcer,
    wallet_timeout: Duration,
}

impl BalanceResolver {
    /// `direct` is the public endpoint used when the wallet read fails.
    pub fn new(direct: Arc<dyn CallTransport>) -> Self {
        Self::with_timeout(direct, DEFAULT_WALLET_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(direct: Arc<dyn CallTransport>, wallet_timeout: Duration) -> Self {
        Self::for_target(direct, ChainTarget::base(), wallet_timeout)
    }

    /// Resolver whose wallet reads are only trusted on `target`.
    pub fn for_target(direct: Arc<dyn CallTransport>, target: ChainTarget, wallet_timeout: Duration) -> Self {
        Self {
            direct,
            enforcer: NetworkEnforcer::with_timing(target, Duration::ZERO, wallet_timeout),
            wallet_timeout,
        }
    }

    /// Balance of `token` held by `address`, scaled by the token's decimals.
    pub async fn get_token_balance(
        &self,
        address: &str,
        token: &str,
        provider: Option<Arc<dyn Eip1193Provider>>,
    ) -> Result<TokenBalance, ConnectionError> {
        let call = RawCall::new(token, BALANCE_OF_SELECTOR, &[CallArg::address(address)])?;

        if let Some(provider) = provider {
            match self.enforcer.verify_chain(provider.as_ref()).await {
                Ok(true) => {
                    let wallet = ProviderTransport::new(provider, self.wallet_timeout);
                    match read_balance(&wallet, &call).await {
                        Ok(raw) => {
                            let decimals = read_decimals(&wallet, token).await;
                            return Ok(balance(raw, decimals, BalanceSource::Wallet));
                        }
                        Err(e) => warn!("Wallet balance read failed, using direct RPC: {}", e),
                    }
                }
                Ok(false) => warn!(
                    "Wallet is not on chain {}, using direct RPC",
                    self.enforcer.target().chain_id
                ),
                Err(e) => warn!("Could not read wallet chain, using direct RPC: {}", e),
            }
        }

        let raw = read_balance(self.direct.as_ref(), &call)
            .await
            .map_err(|e| ConnectionError::BalanceFetchFailed(e.to_string()))?;
        let decimals = read_decimals(self.direct.as_ref(), token).await;
        Ok(balance(raw, decimals, BalanceSource::DirectRpc))
    }
}

async fn read_balance(transport: &dyn CallTransport, call: &RawCall) -> Result<U256, ChainError> {
    let result = transport.eth_call(call).await?;
    decode_uint(&result)
}

async fn read_decimals(transport: &dyn CallTransport, token: &str) -> u8 {
    let decimals = match RawCall::new(token, DECIMALS_SELECTOR, &[]) {
        Ok(call) => read_balance(transport, &call).await,
        Err(e) => Err(e),
    };
    match decimals.map(u8::try_from) {
        Ok(Ok(decimals)) => decimals,
        Ok(Err(_)) | Err(_) => {
            debug!(
                "decimals() unavailable on {} via {}, assuming {}",
                token,
                transport.name(),
                DEFAULT_TOKEN_DECIMALS
            );
            DEFAULT_TOKEN_DECIMALS
        }
    }
}

fn balance(raw: U256, decimals: u8, source: BalanceSource) -> TokenBalance {
    TokenBalance {
        amount: format_units(raw, decimals),
        raw,
        decimals,
        source,
    }
}

/// Native balance of `address` in ether, rendered with 4 decimals.
pub async fn native_balance(
    provider: &dyn Eip1193Provider,
    address: &str,
    timeout: Duration,
) -> Result<String, ConnectionError> {
    let value = request(
        provider,
        "eth_getBalance",
        serde_json::json!([address, "latest"]),
        timeout,
    )
    .await?;
    let hex = value
        .as_str()
        .ok_or_else(|| ConnectionError::InvalidResponse(format!("balance: {}", value)))?;
    let wei = decode_uint(hex)?;
    Ok(format!("{:.4}", format_units(wei, 18)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedWallet, ALICE};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vmf_chain::network::BASE_CHAIN_ID;
    use vmf_chain::ProviderRpcError;

    const TOKEN: &str = "0x2213414893259b0c48066acd1763e7fba97859e5";

    fn word(value: u128) -> String {
        format!("0x{:064x}", value)
    }

    /// Public endpoint double answering by selector.
    #[derive(Default)]
    struct FakeRpc {
        replies: HashMap<&'static str, String>,
        calls: AtomicUsize,
    }

    impl FakeRpc {
        fn reply(mut self, selector: &'static str, result: String) -> Self {
            self.replies.insert(selector, result);
            self
        }
    }

    #[async_trait]
    impl CallTransport for FakeRpc {
        fn name(&self) -> &str {
            "fake-rpc"
        }

        async fn eth_call(&self, call: &RawCall) -> Result<String, ChainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies
                .get(call.selector())
                .cloned()
                .ok_or_else(|| ChainError::Timeout("no reply".to_string()))
        }
    }

    #[tokio::test]
    async fn test_wallet_path_with_decimals() {
        let wallet = ScriptedWallet::new(BASE_CHAIN_ID)
            .script("eth_call", Ok(json!(word(2_500_000))))
            .script("eth_call", Ok(json!(word(6))));
        let wallet: Arc<dyn Eip1193Provider> = Arc::new(wallet);
        let direct = Arc::new(FakeRpc::default());
        let resolver = BalanceResolver::new(direct.clone());

        let balance = resolver
            .get_token_balance(ALICE, TOKEN, Some(wallet))
            .await
            .unwrap();

        assert_eq!(balance.amount, 2.5);
        assert_eq!(balance.raw, U256::from(2_500_000u64));
        assert_eq!(balance.decimals, 6);
        assert_eq!(balance.source, BalanceSource::Wallet);
        assert_eq!(direct.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_decimals_default_to_18() {
        let wallet = ScriptedWallet::new(BASE_CHAIN_ID)
            .script("eth_call", Ok(json!(word(3_000_000_000_000_000_000))));
        let resolver = BalanceResolver::new(Arc::new(FakeRpc::default()));

        let balance = resolver
            .get_token_balance(ALICE, TOKEN, Some(Arc::new(wallet) as Arc<dyn Eip1193Provider>))
            .await
            .unwrap();

        assert_eq!(balance.decimals, 18);
        assert_eq!(balance.amount, 3.0);
    }

    #[tokio::test]
    async fn test_failed_wallet_read_falls_back_to_direct_rpc() {
        let wallet = ScriptedWallet::new(BASE_CHAIN_ID)
            .script("eth_call", Err(ProviderRpcError::internal("header not found")));
        let direct = Arc::new(
            FakeRpc::default()
                .reply(BALANCE_OF_SELECTOR, word(42_000_000_000_000_000_000))
                .reply(DECIMALS_SELECTOR, word(18)),
        );
        let resolver = BalanceResolver::new(direct.clone());

        let balance = resolver
            .get_token_balance(ALICE, TOKEN, Some(Arc::new(wallet) as Arc<dyn Eip1193Provider>))
            .await
            .unwrap();

        assert_eq!(balance.amount, 42.0);
        assert_eq!(balance.source, BalanceSource::DirectRpc);
        assert_eq!(direct.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_wallet_on_other_chain_is_not_trusted() {
        let wallet = ScriptedWallet::new(1)
            .script("eth_call", Ok(json!(word(999_000_000_000_000_000_000))))
            .script("eth_call", Ok(json!(word(18))));
        let direct = Arc::new(
            FakeRpc::default()
                .reply(BALANCE_OF_SELECTOR, word(7_000_000_000_000_000_000))
                .reply(DECIMALS_SELECTOR, word(18)),
        );
        let wallet = Arc::new(wallet);
        let resolver = BalanceResolver::new(direct.clone());

        let balance = resolver
            .get_token_balance(ALICE, TOKEN, Some(wallet.clone() as Arc<dyn Eip1193Provider>))
            .await
            .unwrap();

        assert_eq!(balance.amount, 7.0);
        assert_eq!(balance.source, BalanceSource::DirectRpc);
        assert_eq!(wallet.count("eth_call"), 0);
        assert_eq!(wallet.count("wallet_switchEthereumChain"), 0);
    }

    #[tokio::test]
    async fn test_both_paths_failing() {
        let resolver = BalanceResolver::new(Arc::new(FakeRpc::default()));
        let err = resolver.get_token_balance(ALICE, TOKEN, None).await.unwrap_err();
        assert!(matches!(err, ConnectionError::BalanceFetchFailed(_)));
    }

    #[tokio::test]
    async fn test_malformed_address_rejected_before_any_call() {
        let direct = Arc::new(FakeRpc::default());
        let resolver = BalanceResolver::new(direct.clone());
        let err = resolver.get_token_balance("0x1234", TOKEN, None).await.unwrap_err();
        assert!(matches!(err, ConnectionError::Chain(ChainError::MalformedAddress(_))));
        assert_eq!(direct.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_native_balance_four_decimals() {
        let wallet = ScriptedWallet::new(BASE_CHAIN_ID);
        let text = native_balance(&wallet, ALICE, Duration::from_secs(1)).await.unwrap();
        assert_eq!(text, "1.5000");
    }

    #[test]
    fn test_raw_serializes_as_decimal_string() {
        let json = serde_json::to_value(balance(U256::from(1234u64), 2, BalanceSource::Wallet)).unwrap();
        assert_eq!(json["raw"], "1234");
        assert_eq!(json["amount"], 12.34);
        assert_eq!(json["source"], "wallet");
    }
}
