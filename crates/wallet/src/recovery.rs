//! Account recovery for wallets that cache site approvals.
//!
//! Some wallets keep returning a stale session (or nothing at all) for a site
//! they have seen before. When the plain account request comes back empty,
//! these strategies run in order until one yields accounts:
//!
//! 1. [`CachedAccountConsent`]: read the cached account without a prompt and
//!    make the user sign a nonce, so consent is visible every session.
//! 2. [`ChainCycle`]: bounce the wallet through other chains and back, which
//!    drops its internal session, then ask for accounts again.
//! 3. [`ExplicitPermissions`]: `wallet_requestPermissions` as a last resort.
//!
//! A user rejection or a request already pending in the wallet stops the
//! sequence.

use async_trait::async_trait;
use log::{debug, info};
use serde_json::json;
use uuid::Uuid;
use vmf_chain::{ChainTarget, Eip1193Provider, Labeled, Step};

use crate::config::SessionConfig;
use crate::errors::ConnectionError;
use crate::request::{parse_accounts, request};

/// Everything a strategy may touch.
pub struct RecoveryContext<'a> {
    pub provider: &'a dyn Eip1193Provider,
    pub target: &'a ChainTarget,
    pub config: &'a SessionConfig,
}

impl RecoveryContext<'_> {
    async fn call(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value, ConnectionError> {
        request(self.provider, method, params, self.config.request_timeout).await
    }

    async fn accounts(&self, method: &str) -> Result<Vec<String>, ConnectionError> {
        parse_accounts(self.call(method, json!([])).await?)
    }
}

pub type RecoveryStep = Step<Vec<String>, ConnectionError>;

#[async_trait]
pub trait RecoveryStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn attempt(&self, ctx: &RecoveryContext<'_>) -> RecoveryStep;
}

impl Labeled for dyn RecoveryStrategy {
    fn label(&self) -> &str {
        self.name()
    }
}

/// Rejections and pending prompts stop the sequence; everything else moves on.
fn give_up_or_next(error: ConnectionError) -> RecoveryStep {
    if error.is_user_rejected() {
        Step::Stop(ConnectionError::UserRejected)
    } else if matches!(error, ConnectionError::RequestPending) {
        Step::Stop(ConnectionError::RequestPending)
    } else {
        Step::Next(error.to_string())
    }
}

fn found_or_next(accounts: Vec<String>, empty_reason: &str) -> RecoveryStep {
    if accounts.is_empty() {
        Step::Next(empty_reason.to_string())
    } else {
        Step::Found(accounts)
    }
}

/// The default order for caching wallets.
pub fn default_recovery_strategies() -> Vec<Box<dyn RecoveryStrategy>> {
    vec![
        Box::new(CachedAccountConsent),
        Box::new(ChainCycle),
        Box::new(ExplicitPermissions),
    ]
}

pub struct CachedAccountConsent;

#[async_trait]
impl RecoveryStrategy for CachedAccountConsent {
    fn name(&self) -> &'static str {
        "cached account consent"
    }

    async fn attempt(&self, ctx: &RecoveryContext<'_>) -> RecoveryStep {
        let cached = match ctx.accounts("eth_accounts").await {
            Ok(accounts) => accounts,
            Err(e) => return give_up_or_next(e),
        };
        let Some(address) = cached.first() else {
            return Step::Next("no cached account".to_string());
        };

        let nonce = Uuid::new_v4().simple().to_string();
        let message = ctx.config.consent_message_for(address, &nonce);
        let params = json!([format!("0x{}", hex::encode(message.as_bytes())), address]);

        match ctx.call("personal_sign", params).await {
            Ok(_) => {
                info!("Consent signature received for cached account");
                Step::Found(vec![address.clone()])
            }
            Err(e) => give_up_or_next(e),
        }
    }
}

pub struct ChainCycle;

#[async_trait]
impl RecoveryStrategy for ChainCycle {
    fn name(&self) -> &'static str {
        "chain cycle"
    }

    async fn attempt(&self, ctx: &RecoveryContext<'_>) -> RecoveryStep {
        let detours: Vec<u64> = ctx
            .config
            .cycle_chain_ids
            .iter()
            .copied()
            .filter(|id| *id != ctx.target.chain_id)
            .collect();
        if detours.is_empty() {
            return Step::Skip("no other chains configured".to_string());
        }

        for chain_id in detours {
            let params = json!([{ "chainId": format!("{:#x}", chain_id) }]);
            match ctx.call("wallet_switchEthereumChain", params).await {
                Ok(_) => debug!("Cycled wallet through chain {}", chain_id),
                Err(e) if e.is_user_rejected() || matches!(e, ConnectionError::RequestPending) => {
                    return give_up_or_next(e)
                }
                Err(e) => debug!("Could not cycle through chain {}: {}", chain_id, e),
            }
        }

        if let Err(e) = ctx
            .call("wallet_switchEthereumChain", ctx.target.switch_chain_params())
            .await
        {
            return give_up_or_next(e);
        }

        match ctx.accounts("eth_requestAccounts").await {
            Ok(accounts) => found_or_next(accounts, "still no accounts after chain cycle"),
            Err(e) => give_up_or_next(e),
        }
    }
}

pub struct ExplicitPermissions;

#[async_trait]
impl RecoveryStrategy for ExplicitPermissions {
    fn name(&self) -> &'static str {
        "explicit permissions"
    }

    async fn attempt(&self, ctx: &RecoveryContext<'_>) -> RecoveryStep {
        if let Err(e) = ctx
            .call("wallet_requestPermissions", json!([{ "eth_accounts": {} }]))
            .await
        {
            return give_up_or_next(e);
        }

        match ctx.accounts("eth_accounts").await {
            Ok(accounts) => found_or_next(accounts, "permissions granted without accounts"),
            Err(e) => give_up_or_next(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedWallet, ALICE};
    use vmf_chain::network::BASE_CHAIN_ID;
    use vmf_chain::{run_ordered, AttemptLog, ProviderRpcError};

    async fn run(wallet: &ScriptedWallet) -> (Result<Option<Vec<String>>, ConnectionError>, AttemptLog) {
        let target = ChainTarget::base();
        let config = SessionConfig::default().without_settle_delay();
        let ctx = RecoveryContext {
            provider: wallet,
            target: &target,
            config: &config,
        };
        let strategies = default_recovery_strategies();
        let mut log = AttemptLog::new();
        let result = run_ordered(&strategies, &mut log, |s| s.attempt(&ctx)).await;
        (result, log)
    }

    #[tokio::test]
    async fn test_cached_account_requires_signature() {
        let wallet = ScriptedWallet::coinbase(BASE_CHAIN_ID).with_authorized(&[ALICE]);

        let (result, log) = run(&wallet).await;

        assert_eq!(result.unwrap(), Some(vec![ALICE.to_string()]));
        assert_eq!(wallet.calls(), vec!["eth_accounts", "personal_sign"]);
        assert_eq!(log.attempted(), vec!["cached account consent"]);
    }

    #[tokio::test]
    async fn test_rejected_signature_stops_everything() {
        let wallet = ScriptedWallet::coinbase(BASE_CHAIN_ID)
            .with_authorized(&[ALICE])
            .script("personal_sign", Err(ProviderRpcError::user_rejected()));

        let (result, _) = run(&wallet).await;

        assert!(matches!(result, Err(ConnectionError::UserRejected)));
        assert_eq!(wallet.count("wallet_switchEthereumChain"), 0);
        assert_eq!(wallet.count("wallet_requestPermissions"), 0);
    }

    #[tokio::test]
    async fn test_pending_prompt_stops_everything() {
        let wallet = ScriptedWallet::coinbase(BASE_CHAIN_ID)
            .with_authorized(&[ALICE])
            .script("personal_sign", Err(ProviderRpcError::request_pending()));

        let (result, log) = run(&wallet).await;

        assert!(matches!(result, Err(ConnectionError::RequestPending)));
        assert_eq!(wallet.count("wallet_switchEthereumChain"), 0);
        assert_eq!(wallet.count("wallet_requestPermissions"), 0);
        assert_eq!(log.len(), 1);
    }

    #[tokio::test]
    async fn test_chain_cycle_after_empty_cache() {
        let wallet = ScriptedWallet::coinbase(BASE_CHAIN_ID);

        let (result, log) = run(&wallet).await;

        assert_eq!(result.unwrap(), Some(vec![ALICE.to_string()]));
        assert_eq!(
            wallet.calls(),
            vec![
                "eth_accounts",
                "wallet_switchEthereumChain",
                "wallet_switchEthereumChain",
                "eth_requestAccounts",
            ]
        );
        assert_eq!(wallet.current_chain(), BASE_CHAIN_ID);
        assert_eq!(log.attempted(), vec!["cached account consent", "chain cycle"]);
    }

    #[tokio::test]
    async fn test_permissions_as_last_resort() {
        let wallet = ScriptedWallet::coinbase(BASE_CHAIN_ID)
            .script("eth_requestAccounts", Ok(json!([])));

        let (result, log) = run(&wallet).await;

        assert_eq!(result.unwrap(), Some(vec![ALICE.to_string()]));
        assert_eq!(wallet.count("wallet_requestPermissions"), 1);
        assert_eq!(
            log.attempted(),
            vec!["cached account consent", "chain cycle", "explicit permissions"]
        );
    }

    #[tokio::test]
    async fn test_all_paths_empty() {
        let wallet = ScriptedWallet::coinbase(BASE_CHAIN_ID).with_accounts(&[]);

        let (result, log) = run(&wallet).await;

        assert_eq!(result.unwrap(), None);
        assert!(!log.has_success());
        assert_eq!(log.len(), 3);
    }
}
